//! Billing rate domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::{CurrencyCode, Money};

/// What one unit of capacity is billed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingUnit {
    Hour,
    Day,
    Week,
    Month,
    Session,
    Project,
    Unit,
}

impl BillingUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingUnit::Hour => "hour",
            BillingUnit::Day => "day",
            BillingUnit::Week => "week",
            BillingUnit::Month => "month",
            BillingUnit::Session => "session",
            BillingUnit::Project => "project",
            BillingUnit::Unit => "unit",
        }
    }
}

impl fmt::Display for BillingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hour" | "hourly" => Ok(BillingUnit::Hour),
            "day" | "daily" => Ok(BillingUnit::Day),
            "week" | "weekly" => Ok(BillingUnit::Week),
            "month" | "monthly" => Ok(BillingUnit::Month),
            "session" => Ok(BillingUnit::Session),
            "project" => Ok(BillingUnit::Project),
            "unit" => Ok(BillingUnit::Unit),
            other => Err(Error::invalid(format!("unknown billing unit: {:?}", other))),
        }
    }
}

/// How a service is sold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    TimeBased,
    ProjectBased,
    UsageBased,
}

impl ServiceKind {
    /// The billing unit a new service of this kind starts with
    pub fn default_unit(&self) -> BillingUnit {
        match self {
            ServiceKind::TimeBased => BillingUnit::Hour,
            ServiceKind::ProjectBased => BillingUnit::Project,
            ServiceKind::UsageBased => BillingUnit::Unit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::TimeBased => "time-based",
            ServiceKind::ProjectBased => "project-based",
            ServiceKind::UsageBased => "usage-based",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "time" | "time-based" => Ok(ServiceKind::TimeBased),
            "project" | "project-based" => Ok(ServiceKind::ProjectBased),
            "usage" | "usage-based" => Ok(ServiceKind::UsageBased),
            other => Err(Error::invalid(format!("unknown service kind: {:?}", other))),
        }
    }
}

/// Price of one unit of capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub amount: Money,
    pub unit: BillingUnit,
}

impl Rate {
    pub fn new(amount: Money, unit: BillingUnit) -> Self {
        Self { amount, unit }
    }

    /// The governing currency of everything priced against this rate
    pub fn currency(&self) -> CurrencyCode {
        self.amount.currency()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.amount, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_unit_parsing() {
        assert_eq!("Hourly".parse::<BillingUnit>().unwrap(), BillingUnit::Hour);
        assert_eq!("session".parse::<BillingUnit>().unwrap(), BillingUnit::Session);
        assert!("fortnight".parse::<BillingUnit>().is_err());
    }

    #[test]
    fn test_rate_display() {
        let rate = Rate::new(Money::parse("50", CurrencyCode::USD).unwrap(), BillingUnit::Hour);
        assert_eq!(rate.to_string(), "USD 50.00 / hour");
        assert_eq!(rate.currency(), CurrencyCode::USD);
    }

    #[test]
    fn test_kind_default_unit() {
        assert_eq!("time".parse::<ServiceKind>().unwrap().default_unit(), BillingUnit::Hour);
        assert_eq!(
            serde_json::to_string(&ServiceKind::UsageBased).unwrap(),
            "\"usage-based\""
        );
        assert_eq!(ServiceKind::ProjectBased.to_string(), "project-based");
    }
}
