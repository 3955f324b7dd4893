//! Service entity - the composition root of a billable service
//!
//! A `Service` owns its rate, capacity plan and cost-of-service items, and
//! the finance cache derived from them. It has no logic of its own beyond
//! validating currencies, delegating to [`CapacityPlanner`] and
//! [`FinanceAggregator`], and stamping `updated_at`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    CostItem, CostItemUpdate, Money, MonthlyCapacityEntry, Rate, ServiceKind, YearMonth,
};
use crate::services::{
    CapacityPlanner, Deductions, FinanceAggregator, FinanceInputs, FinanceSnapshot,
    MonthlyFinance, RecomputeMode,
};

/// A billable service (time-, project- or usage-based)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ServiceSnapshot", into = "ServiceSnapshot")]
pub struct Service {
    id: Uuid,
    name: String,
    description: Option<String>,
    kind: ServiceKind,
    rate: Rate,
    capacity: CapacityPlanner,
    cost_items: Vec<CostItem>,
    finance: FinanceAggregator,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Service {
    /// Create a new service with an empty plan and no cost items
    pub fn new(name: impl Into<String>, kind: ServiceKind, rate: Rate) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: Self::validate_name(name.into())?,
            description: None,
            kind,
            rate,
            capacity: CapacityPlanner::new(),
            cost_items: Vec::new(),
            finance: FinanceAggregator::new(),
            created_at: now,
            updated_at: now,
        })
    }

    fn validate_name(name: String) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid("service name cannot be empty"));
        }
        Ok(trimmed.to_string())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Every change to rate, capacity or cost items goes through here
    fn mark_changed(&mut self) {
        self.finance.invalidate();
        self.touch();
    }

    fn inputs(&self) -> FinanceInputs<'_> {
        FinanceInputs::new(&self.rate, self.capacity.entries(), &self.cost_items)
    }

    fn ensure_rate_currency(&self, money: &Money) -> Result<()> {
        if money.currency() != self.rate.currency() {
            return Err(Error::currency_mismatch(self.rate.currency(), money.currency()));
        }
        Ok(())
    }

    fn cost_item_index(&self, id: &str) -> Result<usize> {
        self.cost_items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| Error::item_not_found(id))
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.name = Self::validate_name(name.into())?;
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.touch();
    }

    pub fn set_kind(&mut self, kind: ServiceKind) {
        self.kind = kind;
        self.touch();
    }

    // =========================================================================
    // Rate
    // =========================================================================

    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// Replace the rate. Existing cost items must already be priced in the
    /// new rate's currency.
    pub fn set_rate(&mut self, rate: Rate) -> Result<()> {
        if let Some(item) = self
            .cost_items
            .iter()
            .find(|item| item.unit_cost().currency() != rate.currency())
        {
            return Err(Error::currency_mismatch(
                item.unit_cost().currency(),
                rate.currency(),
            ));
        }
        self.rate = rate;
        self.mark_changed();
        Ok(())
    }

    // =========================================================================
    // Cost-of-service items
    // =========================================================================

    /// Copy of the cost items
    pub fn cost_items(&self) -> Vec<CostItem> {
        self.cost_items.clone()
    }

    pub fn cost_item(&self, id: &str) -> Option<&CostItem> {
        self.cost_items.iter().find(|item| item.id() == id)
    }

    pub fn add_cost_item(&mut self, item: CostItem) -> Result<()> {
        self.ensure_rate_currency(&item.unit_cost())?;
        if self.cost_item(item.id()).is_some() {
            return Err(Error::invalid(format!(
                "cost item id already exists: {}",
                item.id()
            )));
        }
        self.cost_items.push(item);
        self.mark_changed();
        Ok(())
    }

    pub fn update_cost_item(&mut self, id: &str, update: CostItemUpdate) -> Result<()> {
        let index = self.cost_item_index(id)?;
        if let Some(unit_cost) = &update.unit_cost {
            self.ensure_rate_currency(unit_cost)?;
        }
        self.cost_items[index].apply(update)?;
        self.mark_changed();
        Ok(())
    }

    pub fn remove_cost_item(&mut self, id: &str) -> Result<CostItem> {
        let index = self.cost_item_index(id)?;
        let removed = self.cost_items.remove(index);
        self.mark_changed();
        Ok(removed)
    }

    /// Replace all cost items. The batch is validated as a whole before
    /// anything is assigned.
    pub fn set_cost_items(&mut self, items: &[CostItem]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            self.ensure_rate_currency(&item.unit_cost())?;
            if items[..i].iter().any(|other| other.id() == item.id()) {
                return Err(Error::invalid(format!(
                    "duplicate cost item id: {}",
                    item.id()
                )));
            }
        }
        self.cost_items = items.to_vec();
        self.mark_changed();
        Ok(())
    }

    pub fn clear_cost_items(&mut self) {
        self.cost_items.clear();
        self.mark_changed();
    }

    // =========================================================================
    // Capacity plan - mutations
    // =========================================================================

    pub fn generate_capacity_plan(
        &mut self,
        months: usize,
        base_amount: f64,
        growth_rate: f64,
        start: Option<YearMonth>,
    ) -> Result<()> {
        self.capacity.generate(months, base_amount, growth_rate, start)?;
        self.mark_changed();
        Ok(())
    }

    pub fn set_capacity(&mut self, entries: &[MonthlyCapacityEntry]) -> Result<()> {
        self.capacity.set_all(entries)?;
        self.mark_changed();
        Ok(())
    }

    pub fn add_capacity(
        &mut self,
        month: YearMonth,
        capacity: u32,
        adjustment: Option<i32>,
    ) -> Result<()> {
        self.capacity.add(month, capacity, adjustment)?;
        self.mark_changed();
        Ok(())
    }

    pub fn update_capacity_units(&mut self, month: YearMonth, capacity: u32) -> Result<()> {
        self.capacity.update_units(month, capacity)?;
        self.mark_changed();
        Ok(())
    }

    pub fn update_capacity_adjustment(
        &mut self,
        month: YearMonth,
        adjustment: Option<i32>,
    ) -> Result<()> {
        self.capacity.update_adjustment(month, adjustment)?;
        self.mark_changed();
        Ok(())
    }

    pub fn remove_capacity(&mut self, month: YearMonth) -> Result<MonthlyCapacityEntry> {
        let removed = self.capacity.remove(month)?;
        self.mark_changed();
        Ok(removed)
    }

    pub fn clear_capacity(&mut self) {
        self.capacity.clear();
        self.mark_changed();
    }

    pub fn normalize_capacity_units(&mut self, amount: u32) -> Result<()> {
        self.capacity.normalize_units(amount)?;
        self.mark_changed();
        Ok(())
    }

    pub fn recompute_capacity_period(
        &mut self,
        start: YearMonth,
        end: YearMonth,
        mode: RecomputeMode,
    ) -> Result<()> {
        self.capacity.recompute_period(start, end, mode)?;
        self.mark_changed();
        Ok(())
    }

    // =========================================================================
    // Capacity plan - queries
    // =========================================================================

    /// Copy of the plan, ordered by month
    pub fn capacity_plan(&self) -> Vec<MonthlyCapacityEntry> {
        self.capacity.entries().to_vec()
    }

    pub fn capacity_for(&self, month: YearMonth) -> Option<MonthlyCapacityEntry> {
        self.capacity.get(month).copied()
    }

    pub fn total_capacity(&self) -> i64 {
        self.capacity.total_capacity()
    }

    pub fn average_monthly_capacity(&self) -> f64 {
        self.capacity.average_monthly_capacity()
    }

    pub fn earliest_month(&self) -> Option<YearMonth> {
        self.capacity.earliest_month()
    }

    pub fn latest_month(&self) -> Option<YearMonth> {
        self.capacity.latest_month()
    }

    pub fn entry_with_max_supply(&self) -> Option<MonthlyCapacityEntry> {
        self.capacity.entry_with_max_supply().copied()
    }

    pub fn entry_with_min_supply(&self) -> Option<MonthlyCapacityEntry> {
        self.capacity.entry_with_min_supply().copied()
    }

    // =========================================================================
    // Finance
    // =========================================================================

    /// The fresh finance snapshot (rebuilt first if anything changed)
    pub fn finance_snapshot(&self) -> Result<FinanceSnapshot> {
        self.finance.snapshot(&self.inputs())
    }

    pub fn is_finance_dirty(&self) -> bool {
        self.finance.is_dirty()
    }

    /// Number of finance snapshot rebuilds since this value was created
    /// or restored
    pub fn finance_recomputations(&self) -> u64 {
        self.finance.recomputations()
    }

    pub fn gross_revenue(&self) -> Result<Money> {
        self.finance.gross_revenue(&self.inputs())
    }

    pub fn gross_cost(&self) -> Result<Money> {
        self.finance.gross_cost(&self.inputs())
    }

    pub fn gross_profit(&self) -> Result<Money> {
        self.finance.gross_profit(&self.inputs())
    }

    pub fn gross_margin(&self) -> Result<Decimal> {
        self.finance.gross_margin(&self.inputs())
    }

    pub fn average_monthly_revenue(&self) -> Result<Money> {
        self.finance.average_monthly_revenue(&self.inputs())
    }

    pub fn average_monthly_profit(&self) -> Result<Money> {
        self.finance.average_monthly_profit(&self.inputs())
    }

    pub fn unit_cost(&self) -> Result<Money> {
        self.finance.unit_cost(&self.inputs())
    }

    pub fn unit_profit(&self) -> Result<Money> {
        self.finance.unit_profit(&self.inputs())
    }

    pub fn unit_margin(&self) -> Result<Decimal> {
        self.finance.unit_margin(&self.inputs())
    }

    pub fn monthly_finance(&self, month: YearMonth) -> Result<MonthlyFinance> {
        self.finance.monthly(&self.inputs(), month)
    }

    pub fn monthly_revenue(&self, month: YearMonth) -> Result<Money> {
        self.finance.monthly_revenue(&self.inputs(), month)
    }

    pub fn monthly_cost(&self, month: YearMonth) -> Result<Money> {
        self.finance.monthly_cost(&self.inputs(), month)
    }

    pub fn monthly_profit(&self, month: YearMonth) -> Result<Money> {
        self.finance.monthly_profit(&self.inputs(), month)
    }

    pub fn monthly_margin(&self, month: YearMonth) -> Result<Decimal> {
        self.finance.monthly_margin(&self.inputs(), month)
    }

    pub fn net_revenue(&self, month: YearMonth, deductions: &Deductions) -> Result<Money> {
        self.finance.net_revenue(&self.inputs(), month, deductions)
    }

    pub fn net_profit(
        &self,
        month: YearMonth,
        op_ex: Option<Money>,
        taxes: Option<Money>,
        deductions: &Deductions,
    ) -> Result<Money> {
        self.finance
            .net_profit(&self.inputs(), month, op_ex, taxes, deductions)
    }

    pub fn monthly_breakdown(&self) -> Result<Vec<MonthlyFinance>> {
        self.finance.monthly_breakdown(&self.inputs())
    }

    // =========================================================================
    // Serialization boundary
    // =========================================================================

    pub fn to_snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind,
            rate: self.rate,
            capacity: self.capacity.entries().to_vec(),
            cost_items: self.cost_items.clone(),
            finance: self.finance.cached(),
            finance_dirty: self.finance.is_dirty(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild a service, re-validating everything the constructors and
    /// mutators would have enforced
    pub fn from_snapshot(snapshot: ServiceSnapshot) -> Result<Self> {
        let name = Self::validate_name(snapshot.name)?;
        let capacity = CapacityPlanner::from_entries(&snapshot.capacity)?;

        let currency = snapshot.rate.currency();
        for (i, item) in snapshot.cost_items.iter().enumerate() {
            if item.unit_cost().currency() != currency {
                return Err(Error::currency_mismatch(currency, item.unit_cost().currency()));
            }
            if snapshot.cost_items[..i].iter().any(|other| other.id() == item.id()) {
                return Err(Error::invalid(format!("duplicate cost item id: {}", item.id())));
            }
        }

        // A clean cache is only trusted when it matches the restored inputs
        let mut dirty = snapshot.finance_dirty;
        match &snapshot.finance {
            None => {
                warn!(service = %snapshot.id, "snapshot has no cached finance figures");
            }
            Some(cached) if !dirty => {
                let inputs =
                    FinanceInputs::new(&snapshot.rate, capacity.entries(), &snapshot.cost_items);
                if FinanceSnapshot::compute(&inputs).ok().as_ref() != Some(cached) {
                    warn!(
                        service = %snapshot.id,
                        "cached finance figures do not match the service; recomputing"
                    );
                    dirty = true;
                }
            }
            Some(_) => {}
        }

        Ok(Self {
            id: snapshot.id,
            name,
            description: snapshot.description,
            kind: snapshot.kind,
            rate: snapshot.rate,
            capacity,
            cost_items: snapshot.cost_items,
            finance: FinanceAggregator::restore(snapshot.finance, dirty),
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ServiceSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }
}

/// Plain-data form of a [`Service`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: ServiceKind,
    pub rate: Rate,
    #[serde(default)]
    pub capacity: Vec<MonthlyCapacityEntry>,
    #[serde(default)]
    pub cost_items: Vec<CostItem>,
    #[serde(default)]
    pub finance: Option<FinanceSnapshot>,
    #[serde(default = "default_dirty")]
    pub finance_dirty: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_dirty() -> bool {
    true
}

impl TryFrom<ServiceSnapshot> for Service {
    type Error = Error;

    fn try_from(snapshot: ServiceSnapshot) -> Result<Self> {
        Self::from_snapshot(snapshot)
    }
}

impl From<Service> for ServiceSnapshot {
    fn from(service: Service) -> Self {
        service.to_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BillingUnit, CurrencyCode};

    fn usd(amount: &str) -> Money {
        Money::parse(amount, CurrencyCode::USD).unwrap()
    }

    fn ym(key: &str) -> YearMonth {
        YearMonth::parse(key).unwrap()
    }

    fn consulting() -> Service {
        Service::new(
            "Consulting",
            ServiceKind::TimeBased,
            Rate::new(usd("50"), BillingUnit::Hour),
        )
        .unwrap()
    }

    #[test]
    fn test_new_validates_name() {
        let rate = Rate::new(usd("1"), BillingUnit::Hour);
        assert!(Service::new("   ", ServiceKind::TimeBased, rate).is_err());
        assert_eq!(consulting().name(), "Consulting");
    }

    #[test]
    fn test_mutations_stamp_and_invalidate() {
        let mut service = consulting();
        service.generate_capacity_plan(2, 10.0, 0.0, Some(ym("2025-01"))).unwrap();
        service.gross_revenue().unwrap();
        assert!(!service.is_finance_dirty());

        let before = service.updated_at();
        service.update_capacity_units(ym("2025-01"), 20).unwrap();
        assert!(service.is_finance_dirty());
        assert!(service.updated_at() >= before);
        assert_eq!(service.gross_revenue().unwrap(), usd("1500"));
    }

    #[test]
    fn test_failed_mutation_keeps_cache_fresh() {
        let mut service = consulting();
        service.generate_capacity_plan(1, 10.0, 0.0, Some(ym("2025-01"))).unwrap();
        service.gross_revenue().unwrap();

        assert!(service.remove_capacity(ym("2026-01")).is_err());
        assert!(!service.is_finance_dirty());
    }

    #[test]
    fn test_cost_item_currency_is_checked_on_add() {
        let mut service = consulting();
        let euro = Money::parse("5", CurrencyCode::EUR).unwrap();
        let item = CostItem::new("Licence", euro, Decimal::ONE, None).unwrap();
        let err = service.add_cost_item(item).unwrap_err();
        assert!(matches!(err, Error::CurrencyMismatch { .. }));
        assert!(service.cost_items().is_empty());
    }

    #[test]
    fn test_set_rate_rejects_foreign_currency_with_items() {
        let mut service = consulting();
        service
            .add_cost_item(CostItem::new("Labor", usd("20"), Decimal::ONE, None).unwrap())
            .unwrap();
        let euro_rate = Rate::new(
            Money::parse("45", CurrencyCode::EUR).unwrap(),
            BillingUnit::Hour,
        );
        assert!(matches!(
            service.set_rate(euro_rate),
            Err(Error::CurrencyMismatch { .. })
        ));

        service.clear_cost_items();
        service.set_rate(euro_rate).unwrap();
        assert_eq!(service.rate().currency(), CurrencyCode::EUR);
    }

    #[test]
    fn test_cost_item_lifecycle() {
        let mut service = consulting();
        let labor = CostItem::with_id("labor", "Labor", usd("20"), Decimal::ONE, None).unwrap();
        service.add_cost_item(labor.clone()).unwrap();
        assert!(service.add_cost_item(labor).is_err());

        service
            .update_cost_item(
                "labor",
                CostItemUpdate {
                    quantity: Some(Decimal::from(2)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(service.unit_cost().unwrap(), usd("40"));

        assert!(matches!(
            service.update_cost_item("nope", CostItemUpdate::default()),
            Err(Error::ItemNotFound(_))
        ));
        assert!(matches!(
            service.remove_cost_item("nope"),
            Err(Error::ItemNotFound(_))
        ));

        let removed = service.remove_cost_item("labor").unwrap();
        assert_eq!(removed.name(), "Labor");
        assert_eq!(service.unit_cost().unwrap(), usd("0"));
    }

    #[test]
    fn test_set_cost_items_is_all_or_nothing() {
        let mut service = consulting();
        service
            .add_cost_item(CostItem::with_id("a", "A", usd("1"), Decimal::ONE, None).unwrap())
            .unwrap();

        let batch = vec![
            CostItem::with_id("b", "B", usd("2"), Decimal::ONE, None).unwrap(),
            CostItem::with_id("b", "B again", usd("3"), Decimal::ONE, None).unwrap(),
        ];
        assert!(service.set_cost_items(&batch).is_err());
        assert_eq!(service.cost_items().len(), 1);
        assert!(service.cost_item("a").is_some());
    }

    #[test]
    fn test_capacity_plan_is_a_copy() {
        let mut service = consulting();
        service.generate_capacity_plan(3, 8.0, 0.0, Some(ym("2025-01"))).unwrap();

        let mut plan = service.capacity_plan();
        plan[0].capacity = 999;
        plan.clear();

        assert_eq!(service.capacity_for(ym("2025-01")).unwrap().capacity, 8);
        assert_eq!(service.total_capacity(), 24);
    }

    #[test]
    fn test_snapshot_rejects_inconsistent_currency() {
        let mut service = consulting();
        service
            .add_cost_item(CostItem::new("Labor", usd("20"), Decimal::ONE, None).unwrap())
            .unwrap();
        let mut snapshot = service.to_snapshot();
        snapshot.rate = Rate::new(Money::parse("1", CurrencyCode::EUR).unwrap(), BillingUnit::Hour);
        assert!(matches!(
            Service::from_snapshot(snapshot),
            Err(Error::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_snapshot_with_foreign_cached_currency_is_dirty() {
        let service = consulting();
        service.gross_revenue().unwrap();
        let mut snapshot = service.to_snapshot();
        let euro_rate = Rate::new(Money::zero(CurrencyCode::EUR), BillingUnit::Hour);
        let cached = FinanceSnapshot::compute(&FinanceInputs::new(&euro_rate, &[], &[])).unwrap();
        snapshot.finance = Some(cached);
        snapshot.finance_dirty = false;

        let restored = Service::from_snapshot(snapshot).unwrap();
        assert!(restored.is_finance_dirty());
        assert_eq!(restored.gross_revenue().unwrap(), Money::zero(CurrencyCode::USD));
    }
}
