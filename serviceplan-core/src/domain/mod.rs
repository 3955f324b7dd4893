//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod capacity;
mod cost_item;
mod money;
mod month;
mod rate;
pub mod result;

pub use capacity::MonthlyCapacityEntry;
pub use cost_item::{CostItem, CostItemUpdate};
pub use money::{CurrencyCode, Money};
pub use month::YearMonth;
pub use rate::{BillingUnit, Rate, ServiceKind};
pub use result::Error;
