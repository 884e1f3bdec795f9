use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db_types::{DeliveryPartnerOrder, OrderPickup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    pub assignment: DeliveryPartnerOrder,
    pub pickups: Vec<OrderPickup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairError {
    pub order_id: i64,
    pub message: String,
}

/// What a single `repair_day` pass found and fixed. Running the pass again straight away reports zero created
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub date: NaiveDate,
    /// Active roster entries scanned.
    pub assignments_checked: usize,
    pub orders_checked: usize,
    pub assignments_created: usize,
    pub pickups_created: usize,
    /// Orders that had no delivery partner recorded on them before the pass.
    pub orders_linked: usize,
    pub errors: Vec<RepairError>,
}

impl RepairReport {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            assignments_checked: 0,
            orders_checked: 0,
            assignments_created: 0,
            pickups_created: 0,
            orders_linked: 0,
            errors: Vec::new(),
        }
    }

    pub fn records_created(&self) -> usize {
        self.assignments_created + self.pickups_created
    }

    pub fn is_clean(&self) -> bool {
        self.records_created() == 0 && self.errors.is_empty()
    }
}
