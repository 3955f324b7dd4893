//! Serviceplan Core - Business logic for billable service planning
//!
//! This crate models a billable service and the figures derived from it:
//!
//! - **domain**: Core value types (Money, YearMonth, CostItem, Rate, etc.)
//! - **services**: The capacity planner and the cached finance aggregator
//! - **service**: The `Service` entity that composes them, plus its
//!   serialization boundary
//! - **config**: Planning defaults loaded from `settings.json`

pub mod config;
pub mod domain;
pub mod service;
pub mod services;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{
    BillingUnit, CostItem, CostItemUpdate, CurrencyCode, Money, MonthlyCapacityEntry, Rate,
    ServiceKind, YearMonth,
};
pub use service::{Service, ServiceSnapshot};
pub use services::{Deductions, FinanceSnapshot, MonthlyFinance, RecomputeMode};
