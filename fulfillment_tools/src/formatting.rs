use std::fmt::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use fulfillment_engine::{
    assignment_objects::RepairReport,
    db_types::{DeliverySlot, PayoutRequest},
    order_objects::TimeoutReport,
    wallet_objects::WalletSnapshot,
    SlotRules,
};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_repair_report(report: &RepairReport) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Assignment repair for {}", report.date)?;
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Roster entries checked: {:>6}", report.assignments_checked)?;
    writeln!(f, "Orders checked:         {:>6}", report.orders_checked)?;
    writeln!(f, "Orders linked:          {:>6}", report.orders_linked)?;
    writeln!(f, "Assignments created:    {:>6}", report.assignments_created)?;
    writeln!(f, "Pickups created:        {:>6}", report.pickups_created)?;
    if report.errors.is_empty() {
        writeln!(f, "No errors")?;
    } else {
        let mut table = Table::new();
        table.set_titles(row!["Order", "Error"]);
        report.errors.iter().for_each(|e| {
            table.add_row(row![e.order_id, e.message]);
        });
        markdown_style(&mut table);
        writeln!(f, "{table}")?;
    }
    Ok(f)
}

pub fn format_timeout_report(report: &TimeoutReport) -> Result<String> {
    let ids = |ids: &[i64]| ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let mut f = String::new();
    writeln!(f, "Pending items checked: {}", report.checked)?;
    writeln!(f, "Still waiting:         {}", report.waiting)?;
    writeln!(f, "Auto-confirmed:        {} [{}]", report.auto_confirmed.len(), ids(&report.auto_confirmed))?;
    writeln!(f, "Escalated:             {} [{}]", report.escalated.len(), ids(&report.escalated))?;
    writeln!(f, "Changed during sweep:  {} [{}]", report.skipped.len(), ids(&report.skipped))?;
    for (item_id, e) in &report.errors {
        writeln!(f, "Item {item_id} failed: {e}")?;
    }
    Ok(f)
}

pub fn format_wallet(wallet: &WalletSnapshot) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "Vendor:          {}", wallet.vendor_id)?;
    writeln!(f, "Available:       {}", wallet.available_balance)?;
    writeln!(f, "Pending:         {}", wallet.pending_balance)?;
    writeln!(f, "Total earned:    {}", wallet.total_earned)?;
    writeln!(f, "Total paid out:  {}", wallet.total_paid_out)?;
    writeln!(f, "Minimum payout:  {}", wallet.minimum_payout_amount)?;
    let method = wallet.payout_method.map(|m| m.to_string()).unwrap_or_else(|| "Not set".into());
    let destination = wallet.payout_destination.as_deref().unwrap_or("");
    writeln!(f, "Payout method:   {method} {destination}")?;
    if !wallet.is_balanced() {
        writeln!(f, "WARNING: the balances do not add up to the total earned")?;
    }
    Ok(f)
}

pub fn format_slots(slots: &[DeliverySlot], rules: &SlotRules, now: NaiveDateTime) -> String {
    if slots.is_empty() {
        return "No slots".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Window", "Cutoff", "Booked", "Capacity", "Status"]);
    slots.iter().for_each(|s| {
        let status = if !rules.is_open(s, now) {
            "Closed"
        } else if s.is_full() {
            "Full"
        } else {
            "Open"
        };
        table.add_row(row![
            s.id,
            format!("{}-{}", s.start_time.format("%H:%M"), s.end_time.format("%H:%M")),
            s.cutoff_time.format("%H:%M"),
            r->s.max_orders - s.available_orders,
            r->s.max_orders,
            status
        ]);
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_payouts(payouts: &[PayoutRequest]) -> String {
    if payouts.is_empty() {
        return "No payout requests".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Vendor", "Amount", "Method", "Status", "Requested", "Notes"]);
    payouts.iter().for_each(|p| {
        table.add_row(row![
            p.id,
            p.vendor_id,
            r->p.amount,
            p.payout_method,
            p.payout_status,
            p.requested_at.format("%Y-%m-%d %H:%M"),
            p.notes.as_deref().unwrap_or_default()
        ]);
    });
    markdown_style(&mut table);
    table.to_string()
}
