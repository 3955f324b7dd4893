//! Monthly capacity entry domain model

use serde::{Deserialize, Serialize};

use super::YearMonth;

/// Planned units (hours, sessions, ...) for a single month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCapacityEntry {
    pub month: YearMonth,
    pub capacity: u32,
    /// Signed delta applied on top of the planned capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<i32>,
}

impl MonthlyCapacityEntry {
    pub fn new(month: YearMonth, capacity: u32) -> Self {
        Self {
            month,
            capacity,
            adjustment: None,
        }
    }

    pub fn with_adjustment(month: YearMonth, capacity: u32, adjustment: Option<i32>) -> Self {
        Self {
            month,
            capacity,
            adjustment,
        }
    }

    /// Capacity plus adjustment; may be negative when the adjustment
    /// exceeds the capacity
    pub fn effective_units(&self) -> i64 {
        i64::from(self.capacity) + i64::from(self.adjustment.unwrap_or(0))
    }
}
