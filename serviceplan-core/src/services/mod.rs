//! Service layer - the algorithmic components a [`Service`](crate::Service)
//! is composed of
//!
//! Each component can be used on its own; the service entity wires them
//! together and keeps the finance cache in step with the plan.

mod capacity;
mod finance;

pub use capacity::{CapacityPlanner, RecomputeMode};
pub use finance::{
    margin, Deductions, FinanceAggregator, FinanceInputs, FinanceSnapshot, MonthlyFinance,
};
