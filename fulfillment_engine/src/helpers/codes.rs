use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rand::{distributions::Alphanumeric, Rng};

pub const OTP_LENGTH: usize = 6;

/// A random six digit code. Leading zeros are kept.
pub fn generate_otp() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

/// One pickup code per vendor. Codes are distinct within the order so that a code identifies exactly one vendor's
/// items.
pub fn generate_pickup_otps(vendor_ids: impl IntoIterator<Item = i64>) -> BTreeMap<i64, String> {
    let mut used = HashSet::new();
    let mut result = BTreeMap::new();
    for vendor_id in vendor_ids {
        if result.contains_key(&vendor_id) {
            continue;
        }
        let otp = loop {
            let candidate = generate_otp();
            if used.insert(candidate.clone()) {
                break candidate;
            }
        };
        result.insert(vendor_id, otp);
    }
    result
}

pub fn is_well_formed_otp(otp: &str) -> bool {
    otp.len() == OTP_LENGTH && otp.chars().all(|c| c.is_ascii_digit())
}

/// `ORD-YYYYMMDD-XXXXXX`, where the suffix is six random upper case alphanumerics.
pub fn generate_order_number(date: NaiveDate) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{suffix}", date.format("%Y%m%d"))
}
