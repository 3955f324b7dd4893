//! Finance aggregator - revenue, cost, profit and margins of a service
//!
//! Whole-plan ("gross") aggregates are served from a cached
//! [`FinanceSnapshot`] that is rebuilt at most once per batch of mutations.
//! Per-month queries always compute directly from the current state.

use std::cell::RefCell;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::result::Result;
use crate::domain::{CostItem, Money, MonthlyCapacityEntry, Rate, YearMonth};

/// Borrowed view of everything the finance figures are derived from
#[derive(Debug, Clone, Copy)]
pub struct FinanceInputs<'a> {
    pub rate: &'a Rate,
    pub entries: &'a [MonthlyCapacityEntry],
    pub cost_items: &'a [CostItem],
}

impl<'a> FinanceInputs<'a> {
    pub fn new(
        rate: &'a Rate,
        entries: &'a [MonthlyCapacityEntry],
        cost_items: &'a [CostItem],
    ) -> Self {
        Self {
            rate,
            entries,
            cost_items,
        }
    }

    /// Sum of cost-item subtotals: the cost of delivering one unit
    pub fn unit_cost(&self) -> Result<Money> {
        self.cost_items
            .iter()
            .try_fold(Money::zero(self.rate.currency()), |acc, item| {
                acc.add(&item.subtotal())
            })
    }

    fn entry(&self, month: YearMonth) -> Option<&'a MonthlyCapacityEntry> {
        let entries = self.entries;
        entries
            .binary_search_by_key(&month, |e| e.month)
            .ok()
            .map(|i| &entries[i])
    }
}

/// `profit / revenue`, or zero when there is no revenue
pub fn margin(profit: &Money, revenue: &Money) -> Result<Decimal> {
    if revenue.is_zero() {
        return Ok(Decimal::ZERO);
    }
    profit.ratio(revenue)
}

/// Derived whole-plan figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSnapshot {
    pub months: usize,
    pub total_units: i64,
    pub gross_revenue: Money,
    pub gross_cost: Money,
    pub gross_profit: Money,
    pub gross_margin: Decimal,
    pub average_monthly_revenue: Money,
    pub average_monthly_profit: Money,
    pub unit_cost: Money,
    pub unit_profit: Money,
    pub unit_margin: Decimal,
}

impl FinanceSnapshot {
    /// Compute every figure from scratch
    pub fn compute(inputs: &FinanceInputs<'_>) -> Result<Self> {
        let currency = inputs.rate.currency();
        let unit_cost = inputs.unit_cost()?;

        let mut total_units = 0i64;
        let mut gross_revenue = Money::zero(currency);
        let mut gross_cost = Money::zero(currency);
        for entry in inputs.entries {
            let units = Decimal::from(entry.effective_units());
            total_units += entry.effective_units();
            gross_revenue = gross_revenue.add(&inputs.rate.amount.multiply(units)?)?;
            gross_cost = gross_cost.add(&unit_cost.multiply(units)?)?;
        }
        let gross_profit = gross_revenue.subtract(&gross_cost)?;

        let months = inputs.entries.len();
        let (average_monthly_revenue, average_monthly_profit) = if months == 0 {
            (Money::zero(currency), Money::zero(currency))
        } else {
            let count = Decimal::from(months);
            (gross_revenue.divide(count)?, gross_profit.divide(count)?)
        };

        let unit_profit = inputs.rate.amount.subtract(&unit_cost)?;

        Ok(Self {
            months,
            total_units,
            gross_revenue,
            gross_cost,
            gross_profit,
            gross_margin: margin(&gross_profit, &gross_revenue)?,
            average_monthly_revenue,
            average_monthly_profit,
            unit_cost,
            unit_profit,
            unit_margin: margin(&unit_profit, &inputs.rate.amount)?,
        })
    }
}

/// Figures for a single month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyFinance {
    pub month: YearMonth,
    pub units: i64,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    pub margin: Decimal,
}

impl MonthlyFinance {
    /// Compute the figures for `month`; an unplanned month has no activity
    /// and yields zeros
    pub fn compute(inputs: &FinanceInputs<'_>, month: YearMonth) -> Result<Self> {
        let units = inputs.entry(month).map_or(0, |e| e.effective_units());
        let factor = Decimal::from(units);
        let revenue = inputs.rate.amount.multiply(factor)?;
        let cost = inputs.unit_cost()?.multiply(factor)?;
        let profit = revenue.subtract(&cost)?;
        Ok(Self {
            month,
            units,
            revenue,
            cost,
            profit,
            margin: margin(&profit, &revenue)?,
        })
    }
}

/// Optional revenue deductions for net figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deductions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounts: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowances: Option<Money>,
}

impl Deductions {
    /// Subtract whichever deductions are present from `revenue`
    pub fn apply(&self, revenue: Money) -> Result<Money> {
        [self.discounts, self.returns, self.allowances]
            .iter()
            .flatten()
            .try_fold(revenue, |acc, deduction| acc.subtract(deduction))
    }
}

#[derive(Debug, Clone)]
struct CacheState {
    dirty: bool,
    snapshot: Option<FinanceSnapshot>,
    recomputations: u64,
}

impl Default for CacheState {
    fn default() -> Self {
        Self {
            dirty: true,
            snapshot: None,
            recomputations: 0,
        }
    }
}

/// Lazily recomputed finance figures
///
/// Owners call [`FinanceAggregator::invalidate`] from every mutation of the
/// rate, cost items or capacity plan. Reads of whole-plan figures rebuild
/// the snapshot only when it has been invalidated since the last rebuild.
#[derive(Debug, Clone, Default)]
pub struct FinanceAggregator {
    state: RefCell<CacheState>,
}

impl FinanceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore an aggregator from a previously serialized cache. Without a
    /// snapshot the cache starts dirty.
    pub fn restore(snapshot: Option<FinanceSnapshot>, dirty: bool) -> Self {
        Self {
            state: RefCell::new(CacheState {
                dirty: dirty || snapshot.is_none(),
                snapshot,
                recomputations: 0,
            }),
        }
    }

    /// Mark the cached snapshot stale
    pub fn invalidate(&mut self) {
        self.state.get_mut().dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.state.borrow().dirty
    }

    /// How many times the snapshot has been rebuilt by this aggregator
    pub fn recomputations(&self) -> u64 {
        self.state.borrow().recomputations
    }

    /// Whatever is currently cached, fresh or not
    pub fn cached(&self) -> Option<FinanceSnapshot> {
        self.state.borrow().snapshot
    }

    /// The fresh snapshot, rebuilding it first when stale
    pub fn snapshot(&self, inputs: &FinanceInputs<'_>) -> Result<FinanceSnapshot> {
        let mut state = self.state.borrow_mut();
        if !state.dirty {
            if let Some(snapshot) = state.snapshot {
                trace!("finance cache hit");
                return Ok(snapshot);
            }
        }

        let snapshot = FinanceSnapshot::compute(inputs)?;
        state.snapshot = Some(snapshot);
        state.dirty = false;
        state.recomputations += 1;
        debug!(
            recomputations = state.recomputations,
            months = snapshot.months,
            total_units = snapshot.total_units,
            "recomputed finance snapshot"
        );
        Ok(snapshot)
    }

    // === Whole-plan figures (cached) ===

    pub fn gross_revenue(&self, inputs: &FinanceInputs<'_>) -> Result<Money> {
        Ok(self.snapshot(inputs)?.gross_revenue)
    }

    pub fn gross_cost(&self, inputs: &FinanceInputs<'_>) -> Result<Money> {
        Ok(self.snapshot(inputs)?.gross_cost)
    }

    pub fn gross_profit(&self, inputs: &FinanceInputs<'_>) -> Result<Money> {
        Ok(self.snapshot(inputs)?.gross_profit)
    }

    pub fn gross_margin(&self, inputs: &FinanceInputs<'_>) -> Result<Decimal> {
        Ok(self.snapshot(inputs)?.gross_margin)
    }

    pub fn average_monthly_revenue(&self, inputs: &FinanceInputs<'_>) -> Result<Money> {
        Ok(self.snapshot(inputs)?.average_monthly_revenue)
    }

    pub fn average_monthly_profit(&self, inputs: &FinanceInputs<'_>) -> Result<Money> {
        Ok(self.snapshot(inputs)?.average_monthly_profit)
    }

    pub fn unit_cost(&self, inputs: &FinanceInputs<'_>) -> Result<Money> {
        Ok(self.snapshot(inputs)?.unit_cost)
    }

    pub fn unit_profit(&self, inputs: &FinanceInputs<'_>) -> Result<Money> {
        Ok(self.snapshot(inputs)?.unit_profit)
    }

    pub fn unit_margin(&self, inputs: &FinanceInputs<'_>) -> Result<Decimal> {
        Ok(self.snapshot(inputs)?.unit_margin)
    }

    // === Per-month figures (never cached) ===

    pub fn monthly(&self, inputs: &FinanceInputs<'_>, month: YearMonth) -> Result<MonthlyFinance> {
        MonthlyFinance::compute(inputs, month)
    }

    pub fn monthly_revenue(&self, inputs: &FinanceInputs<'_>, month: YearMonth) -> Result<Money> {
        Ok(self.monthly(inputs, month)?.revenue)
    }

    pub fn monthly_cost(&self, inputs: &FinanceInputs<'_>, month: YearMonth) -> Result<Money> {
        Ok(self.monthly(inputs, month)?.cost)
    }

    pub fn monthly_profit(&self, inputs: &FinanceInputs<'_>, month: YearMonth) -> Result<Money> {
        Ok(self.monthly(inputs, month)?.profit)
    }

    pub fn monthly_margin(&self, inputs: &FinanceInputs<'_>, month: YearMonth) -> Result<Decimal> {
        Ok(self.monthly(inputs, month)?.margin)
    }

    /// Monthly revenue minus the supplied deductions
    pub fn net_revenue(
        &self,
        inputs: &FinanceInputs<'_>,
        month: YearMonth,
        deductions: &Deductions,
    ) -> Result<Money> {
        deductions.apply(self.monthly_revenue(inputs, month)?)
    }

    /// Net revenue minus operating expenses and taxes
    pub fn net_profit(
        &self,
        inputs: &FinanceInputs<'_>,
        month: YearMonth,
        op_ex: Option<Money>,
        taxes: Option<Money>,
        deductions: &Deductions,
    ) -> Result<Money> {
        [op_ex, taxes]
            .iter()
            .flatten()
            .try_fold(self.net_revenue(inputs, month, deductions)?, |acc, expense| {
                acc.subtract(expense)
            })
    }

    /// Figures for every planned month, in plan order
    pub fn monthly_breakdown(&self, inputs: &FinanceInputs<'_>) -> Result<Vec<MonthlyFinance>> {
        inputs
            .entries
            .iter()
            .map(|entry| MonthlyFinance::compute(inputs, entry.month))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BillingUnit, CurrencyCode, Error};

    fn usd(amount: &str) -> Money {
        Money::parse(amount, CurrencyCode::USD).unwrap()
    }

    fn ym(key: &str) -> YearMonth {
        YearMonth::parse(key).unwrap()
    }

    fn rate(amount: &str) -> Rate {
        Rate::new(usd(amount), BillingUnit::Hour)
    }

    fn plan() -> Vec<MonthlyCapacityEntry> {
        vec![
            MonthlyCapacityEntry::new(ym("2025-01"), 100),
            MonthlyCapacityEntry::with_adjustment(ym("2025-02"), 100, Some(-20)),
        ]
    }

    fn costs() -> Vec<CostItem> {
        vec![
            CostItem::new("Labor", usd("15"), Decimal::ONE, None).unwrap(),
            CostItem::new("Tools", usd("2.50"), Decimal::from(2), None).unwrap(),
        ]
    }

    #[test]
    fn test_snapshot_figures() {
        let rate = rate("50");
        let entries = plan();
        let cost_items = costs();
        let inputs = FinanceInputs::new(&rate, &entries, &cost_items);

        let snapshot = FinanceSnapshot::compute(&inputs).unwrap();
        assert_eq!(snapshot.total_units, 180);
        assert_eq!(snapshot.gross_revenue, usd("9000"));
        assert_eq!(snapshot.unit_cost, usd("20"));
        assert_eq!(snapshot.gross_cost, usd("3600"));
        assert_eq!(snapshot.gross_profit, usd("5400"));
        assert_eq!(snapshot.gross_margin, Decimal::new(6, 1));
        assert_eq!(snapshot.average_monthly_revenue, usd("4500"));
        assert_eq!(snapshot.unit_profit, usd("30"));
        assert_eq!(snapshot.unit_margin, Decimal::new(6, 1));
    }

    #[test]
    fn test_zero_revenue_margins_are_zero() {
        let rate = rate("0");
        let entries = plan();
        let cost_items = costs();
        let inputs = FinanceInputs::new(&rate, &entries, &cost_items);

        let snapshot = FinanceSnapshot::compute(&inputs).unwrap();
        assert_eq!(snapshot.gross_margin, Decimal::ZERO);
        assert_eq!(snapshot.unit_margin, Decimal::ZERO);

        let empty = FinanceInputs::new(&rate, &[], &[]);
        let snapshot = FinanceSnapshot::compute(&empty).unwrap();
        assert_eq!(snapshot.average_monthly_profit, usd("0"));
        assert_eq!(snapshot.gross_margin, Decimal::ZERO);
    }

    #[test]
    fn test_unplanned_month_is_all_zero() {
        let rate = rate("50");
        let entries = plan();
        let cost_items = costs();
        let inputs = FinanceInputs::new(&rate, &entries, &cost_items);

        let monthly = MonthlyFinance::compute(&inputs, ym("2030-01")).unwrap();
        assert_eq!(monthly.units, 0);
        assert!(monthly.revenue.is_zero());
        assert!(monthly.cost.is_zero());
        assert!(monthly.profit.is_zero());
        assert_eq!(monthly.margin, Decimal::ZERO);
    }

    #[test]
    fn test_net_figures() {
        let rate = rate("50");
        let entries = plan();
        let cost_items = costs();
        let inputs = FinanceInputs::new(&rate, &entries, &cost_items);
        let aggregator = FinanceAggregator::new();

        let deductions = Deductions {
            discounts: Some(usd("100")),
            returns: None,
            allowances: Some(usd("25")),
        };
        let net = aggregator
            .net_revenue(&inputs, ym("2025-02"), &deductions)
            .unwrap();
        assert_eq!(net, usd("3875"));

        let profit = aggregator
            .net_profit(&inputs, ym("2025-02"), Some(usd("500")), Some(usd("375")), &deductions)
            .unwrap();
        assert_eq!(profit, usd("3000"));

        let none = aggregator
            .net_revenue(&inputs, ym("2025-02"), &Deductions::default())
            .unwrap();
        assert_eq!(none, usd("4000"));
    }

    #[test]
    fn test_foreign_deduction_is_rejected() {
        let rate = rate("50");
        let entries = plan();
        let inputs = FinanceInputs::new(&rate, &entries, &[]);
        let deductions = Deductions {
            discounts: Some(Money::parse("1", CurrencyCode::EUR).unwrap()),
            ..Default::default()
        };
        let err = FinanceAggregator::new()
            .net_revenue(&inputs, ym("2025-01"), &deductions)
            .unwrap_err();
        assert!(matches!(err, Error::CurrencyMismatch { .. }));
    }

    #[test]
    fn test_cache_rebuilds_once_per_invalidation() {
        let rate = rate("50");
        let entries = plan();
        let inputs = FinanceInputs::new(&rate, &entries, &[]);
        let mut aggregator = FinanceAggregator::new();
        assert!(aggregator.is_dirty());

        aggregator.gross_revenue(&inputs).unwrap();
        aggregator.gross_profit(&inputs).unwrap();
        aggregator.gross_margin(&inputs).unwrap();
        assert_eq!(aggregator.recomputations(), 1);
        assert!(!aggregator.is_dirty());

        aggregator.invalidate();
        aggregator.invalidate();
        aggregator.invalidate();
        assert!(aggregator.is_dirty());
        aggregator.gross_cost(&inputs).unwrap();
        aggregator.unit_margin(&inputs).unwrap();
        assert_eq!(aggregator.recomputations(), 2);
    }

    #[test]
    fn test_monthly_queries_do_not_touch_cache() {
        let rate = rate("50");
        let entries = plan();
        let inputs = FinanceInputs::new(&rate, &entries, &[]);
        let aggregator = FinanceAggregator::new();

        aggregator.monthly_revenue(&inputs, ym("2025-01")).unwrap();
        aggregator.monthly_breakdown(&inputs).unwrap();
        assert_eq!(aggregator.recomputations(), 0);
        assert!(aggregator.cached().is_none());
    }

    #[test]
    fn test_restore_without_snapshot_is_dirty() {
        assert!(FinanceAggregator::restore(None, false).is_dirty());

        let rate = rate("10");
        let inputs = FinanceInputs::new(&rate, &[], &[]);
        let snapshot = FinanceSnapshot::compute(&inputs).unwrap();
        let restored = FinanceAggregator::restore(Some(snapshot), false);
        assert!(!restored.is_dirty());
        assert_eq!(restored.snapshot(&inputs).unwrap(), snapshot);
        assert_eq!(restored.recomputations(), 0);
    }
}
