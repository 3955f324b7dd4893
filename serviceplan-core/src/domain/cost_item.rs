//! Cost-of-service item domain model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};
use super::Money;

/// A per-unit cost component (labor, materials, ...) of a service
///
/// `subtotal` is always `unit_cost × quantity`; the fields that feed it are
/// only writable through methods that recompute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CostItemRecord")]
pub struct CostItem {
    id: String,
    name: String,
    unit_cost: Money,
    quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    subtotal: Money,
}

/// Wire form of a cost item; the stored subtotal is ignored and recomputed
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CostItemRecord {
    id: String,
    name: String,
    unit_cost: Money,
    quantity: Decimal,
    #[serde(default)]
    unit: Option<String>,
}

impl TryFrom<CostItemRecord> for CostItem {
    type Error = Error;

    fn try_from(record: CostItemRecord) -> Result<Self> {
        Self::with_id(
            record.id,
            record.name,
            record.unit_cost,
            record.quantity,
            record.unit,
        )
    }
}

/// Partial update for a cost item; `None` leaves a field as is
#[derive(Debug, Clone, Default)]
pub struct CostItemUpdate {
    pub name: Option<String>,
    pub unit_cost: Option<Money>,
    pub quantity: Option<Decimal>,
    /// `Some(None)` clears the unit label
    pub unit: Option<Option<String>>,
}

impl CostItem {
    /// Create a new cost item with a generated id
    pub fn new(
        name: impl Into<String>,
        unit_cost: Money,
        quantity: Decimal,
        unit: Option<String>,
    ) -> Result<Self> {
        Self::with_id(Uuid::new_v4().to_string(), name, unit_cost, quantity, unit)
    }

    /// Create a cost item with a caller-supplied id
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_cost: Money,
        quantity: Decimal,
        unit: Option<String>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::invalid("cost item id cannot be empty"));
        }
        let name = Self::validate_name(name.into())?;
        Self::validate_unit_cost(&unit_cost)?;
        Self::validate_quantity(quantity)?;
        let subtotal = unit_cost.multiply(quantity)?;

        Ok(Self {
            id,
            name,
            unit_cost,
            quantity,
            unit: Self::normalize_unit(unit),
            subtotal,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_cost(&self) -> Money {
        self.unit_cost
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Apply a partial update. Every field is validated before any is
    /// assigned, so a rejected update leaves the item unchanged.
    pub fn apply(&mut self, update: CostItemUpdate) -> Result<()> {
        let name = update.name.map(Self::validate_name).transpose()?;
        if let Some(unit_cost) = &update.unit_cost {
            Self::validate_unit_cost(unit_cost)?;
            if unit_cost.currency() != self.unit_cost.currency() {
                return Err(Error::currency_mismatch(
                    self.unit_cost.currency(),
                    unit_cost.currency(),
                ));
            }
        }
        if let Some(quantity) = update.quantity {
            Self::validate_quantity(quantity)?;
        }
        let unit_cost = update.unit_cost.unwrap_or(self.unit_cost);
        let quantity = update.quantity.unwrap_or(self.quantity);
        let subtotal = unit_cost.multiply(quantity)?;

        if let Some(name) = name {
            self.name = name;
        }
        self.unit_cost = unit_cost;
        self.quantity = quantity;
        if let Some(unit) = update.unit {
            self.unit = Self::normalize_unit(unit);
        }
        self.subtotal = subtotal;
        Ok(())
    }

    fn validate_name(name: String) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid("cost item name cannot be empty"));
        }
        Ok(trimmed.to_string())
    }

    fn validate_unit_cost(unit_cost: &Money) -> Result<()> {
        if unit_cost.is_negative() {
            return Err(Error::invalid("unit cost cannot be negative"));
        }
        Ok(())
    }

    fn validate_quantity(quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO {
            return Err(Error::invalid("quantity must be greater than zero"));
        }
        Ok(())
    }

    fn normalize_unit(unit: Option<String>) -> Option<String> {
        unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
    }
}
