//! Capacity planner - the month-by-month unit plan of a service
//!
//! The plan is kept sorted by month with at most one entry per month.
//! Every mutation either completes fully or returns an error without
//! touching the plan.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{MonthlyCapacityEntry, YearMonth};

/// How `recompute_period` maps the old plan onto the new range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecomputeMode {
    /// Re-date old entries by position, holding the last entry for any
    /// extra months
    #[default]
    Default,
    /// Spread the old total evenly over the new range
    Distribute,
}

impl fmt::Display for RecomputeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecomputeMode::Default => f.write_str("default"),
            RecomputeMode::Distribute => f.write_str("distribute"),
        }
    }
}

impl FromStr for RecomputeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(RecomputeMode::Default),
            "distribute" => Ok(RecomputeMode::Distribute),
            other => Err(Error::invalid(format!("unknown recompute mode: {:?}", other))),
        }
    }
}

/// Ordered collection of monthly capacity entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityPlanner {
    entries: Vec<MonthlyCapacityEntry>,
}

impl CapacityPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a planner from arbitrary entries (see [`CapacityPlanner::set_all`])
    pub fn from_entries(entries: &[MonthlyCapacityEntry]) -> Result<Self> {
        let mut planner = Self::new();
        planner.set_all(entries)?;
        Ok(planner)
    }

    // === Queries ===

    pub fn entries(&self) -> &[MonthlyCapacityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, month: YearMonth) -> Option<&MonthlyCapacityEntry> {
        self.position(month).ok().map(|i| &self.entries[i])
    }

    /// Sum of effective units over all entries
    pub fn total_capacity(&self) -> i64 {
        self.entries.iter().map(MonthlyCapacityEntry::effective_units).sum()
    }

    /// Mean effective units per planned month; zero for an empty plan
    pub fn average_monthly_capacity(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.total_capacity() as f64 / self.entries.len() as f64
    }

    pub fn earliest_month(&self) -> Option<YearMonth> {
        self.entries.iter().map(|e| e.month).min()
    }

    pub fn latest_month(&self) -> Option<YearMonth> {
        self.entries.iter().map(|e| e.month).max()
    }

    /// Entry with the most effective units; the first one in plan order
    /// wins a tie
    pub fn entry_with_max_supply(&self) -> Option<&MonthlyCapacityEntry> {
        self.entries.iter().reduce(|best, entry| {
            if entry.effective_units() > best.effective_units() {
                entry
            } else {
                best
            }
        })
    }

    /// Entry with the fewest effective units; the first one in plan order
    /// wins a tie
    pub fn entry_with_min_supply(&self) -> Option<&MonthlyCapacityEntry> {
        self.entries.iter().reduce(|best, entry| {
            if entry.effective_units() < best.effective_units() {
                entry
            } else {
                best
            }
        })
    }

    // === Mutations ===

    /// Replace the plan with `months` consecutive entries starting at
    /// `start` (current month when `None`).
    ///
    /// Entry `i` gets `round(base_amount × (1 + growth_rate)^i)`. The growth
    /// compounds on the unrounded running value so rounding never feeds
    /// back into later months.
    pub fn generate(
        &mut self,
        months: usize,
        base_amount: f64,
        growth_rate: f64,
        start: Option<YearMonth>,
    ) -> Result<()> {
        if months == 0 {
            return Err(Error::invalid("months must be greater than zero"));
        }
        if !base_amount.is_finite() || base_amount < 0.0 {
            return Err(Error::invalid("base amount must be a non-negative number"));
        }
        if !growth_rate.is_finite() || growth_rate < 0.0 {
            return Err(Error::invalid("growth rate must be a non-negative number"));
        }

        let start = start.unwrap_or_else(YearMonth::current);
        let factor = 1.0 + growth_rate;
        let mut running = base_amount;
        let mut entries = Vec::with_capacity(months);

        for month in start.sequence(months)? {
            let capacity = Self::units_from_f64(running.round())?;
            entries.push(MonthlyCapacityEntry::new(month, capacity));
            running *= factor;
        }

        debug!(
            months,
            base_amount,
            growth_rate,
            start = %start,
            "generated capacity plan"
        );
        self.entries = entries;
        Ok(())
    }

    /// Replace the plan wholesale. The input is copied and sorted; a
    /// repeated month rejects the whole batch.
    pub fn set_all(&mut self, entries: &[MonthlyCapacityEntry]) -> Result<()> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|e| e.month);
        if let Some(pair) = sorted.windows(2).find(|w| w[0].month == w[1].month) {
            return Err(Error::DuplicateMonth(pair[0].month));
        }
        self.entries = sorted;
        Ok(())
    }

    /// Add a month that is not yet planned
    pub fn add(&mut self, month: YearMonth, capacity: u32, adjustment: Option<i32>) -> Result<()> {
        match self.position(month) {
            Ok(_) => Err(Error::DuplicateMonth(month)),
            Err(index) => {
                self.entries.insert(
                    index,
                    MonthlyCapacityEntry::with_adjustment(month, capacity, adjustment),
                );
                Ok(())
            }
        }
    }

    pub fn update_units(&mut self, month: YearMonth, capacity: u32) -> Result<()> {
        let index = self.position(month).map_err(|_| Error::MonthNotFound(month))?;
        self.entries[index].capacity = capacity;
        Ok(())
    }

    pub fn update_adjustment(&mut self, month: YearMonth, adjustment: Option<i32>) -> Result<()> {
        let index = self.position(month).map_err(|_| Error::MonthNotFound(month))?;
        self.entries[index].adjustment = adjustment;
        Ok(())
    }

    pub fn remove(&mut self, month: YearMonth) -> Result<MonthlyCapacityEntry> {
        let index = self.position(month).map_err(|_| Error::MonthNotFound(month))?;
        Ok(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Set every entry's capacity (adjustments are kept) to `amount`.
    /// A single-entry plan is left as is.
    pub fn normalize_units(&mut self, amount: u32) -> Result<()> {
        match self.entries.len() {
            0 => Err(Error::EmptyPlan),
            1 => Ok(()),
            _ => {
                for entry in &mut self.entries {
                    entry.capacity = amount;
                }
                Ok(())
            }
        }
    }

    /// Rebuild the plan so it spans exactly `[start, end]`.
    ///
    /// In [`RecomputeMode::Default`] old entries are treated as a sequence
    /// of magnitudes: the entry at position `i` moves to month `start + i`
    /// regardless of its original month, and months past the old length
    /// repeat the last entry. This re-bases a plan onto a new window; it
    /// does not align entries by calendar month.
    ///
    /// In [`RecomputeMode::Distribute`] the old total of effective units is
    /// split evenly, the first `total % len` months taking one extra unit,
    /// so the new plan sums to exactly the old total. Adjustments are
    /// dropped.
    pub fn recompute_period(
        &mut self,
        start: YearMonth,
        end: YearMonth,
        mode: RecomputeMode,
    ) -> Result<()> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        let Some(last) = self.entries.last().copied() else {
            return Err(Error::EmptyPlan);
        };

        let length = YearMonth::months_in_period(start, end);
        let months = start.sequence(length)?;

        let entries = match mode {
            RecomputeMode::Default => months
                .into_iter()
                .enumerate()
                .map(|(i, month)| {
                    let source = self.entries.get(i).unwrap_or(&last);
                    MonthlyCapacityEntry::with_adjustment(month, source.capacity, source.adjustment)
                })
                .collect(),
            RecomputeMode::Distribute => {
                let total = self.total_capacity();
                if total < 0 {
                    return Err(Error::invalid(format!(
                        "cannot distribute a negative total of {} units",
                        total
                    )));
                }
                let len = length as i64;
                let share = total / len;
                let remainder = total % len;
                months
                    .into_iter()
                    .enumerate()
                    .map(|(i, month)| {
                        let extra = if (i as i64) < remainder { 1 } else { 0 };
                        Self::units_from_i64(share + extra)
                            .map(|capacity| MonthlyCapacityEntry::new(month, capacity))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        debug!(
            mode = %mode,
            start = %start,
            end = %end,
            old_len = self.entries.len(),
            new_len = length,
            old_total = self.total_capacity(),
            "recomputed capacity period"
        );
        self.entries = entries;
        Ok(())
    }

    fn position(&self, month: YearMonth) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&month, |e| e.month)
    }

    fn units_from_f64(value: f64) -> Result<u32> {
        if value > f64::from(u32::MAX) {
            return Err(Error::invalid(format!("capacity out of range: {}", value)));
        }
        Ok(value as u32)
    }

    fn units_from_i64(value: i64) -> Result<u32> {
        u32::try_from(value)
            .map_err(|_| Error::invalid(format!("capacity out of range: {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(key: &str) -> YearMonth {
        YearMonth::parse(key).unwrap()
    }

    fn planner(capacities: &[(&str, u32, Option<i32>)]) -> CapacityPlanner {
        let entries: Vec<MonthlyCapacityEntry> = capacities
            .iter()
            .map(|(m, c, a)| MonthlyCapacityEntry::with_adjustment(ym(m), *c, *a))
            .collect();
        CapacityPlanner::from_entries(&entries).unwrap()
    }

    fn capacities(planner: &CapacityPlanner) -> Vec<u32> {
        planner.entries().iter().map(|e| e.capacity).collect()
    }

    #[test]
    fn test_empty_plan_queries() {
        let planner = CapacityPlanner::new();
        assert_eq!(planner.total_capacity(), 0);
        assert_eq!(planner.average_monthly_capacity(), 0.0);
        assert!(planner.earliest_month().is_none());
        assert!(planner.latest_month().is_none());
        assert!(planner.entry_with_max_supply().is_none());
    }

    #[test]
    fn test_generate_flat_series() {
        let mut planner = CapacityPlanner::new();
        planner.generate(12, 160.0, 0.0, Some(ym("2025-01"))).unwrap();
        assert_eq!(planner.len(), 12);
        assert_eq!(planner.total_capacity(), 1920);
        assert_eq!(planner.earliest_month(), Some(ym("2025-01")));
        assert_eq!(planner.latest_month(), Some(ym("2025-12")));
    }

    #[test]
    fn test_generate_compounds_on_unrounded_value() {
        let mut planner = CapacityPlanner::new();
        // 10, 15, 22.5, 33.75; re-rounding 23 would have given 35
        planner.generate(4, 10.0, 0.5, Some(ym("2025-11"))).unwrap();
        assert_eq!(capacities(&planner), vec![10, 15, 23, 34]);
        assert_eq!(planner.latest_month(), Some(ym("2026-02")));
    }

    #[test]
    fn test_generate_rejects_bad_input_without_touching_plan() {
        let mut planner = planner(&[("2025-01", 5, None)]);
        assert!(planner.generate(0, 10.0, 0.0, None).is_err());
        assert!(planner.generate(3, -1.0, 0.0, None).is_err());
        assert!(planner.generate(3, 1.0, -0.5, None).is_err());
        assert!(planner.generate(3, f64::NAN, 0.0, None).is_err());
        assert_eq!(capacities(&planner), vec![5]);
    }

    #[test]
    fn test_set_all_sorts_and_rejects_duplicates() {
        let mut planner = planner(&[("2025-03", 1, None), ("2025-01", 2, None)]);
        assert_eq!(planner.earliest_month(), Some(ym("2025-01")));
        assert_eq!(capacities(&planner), vec![2, 1]);

        let dup = [
            MonthlyCapacityEntry::new(ym("2025-05"), 1),
            MonthlyCapacityEntry::new(ym("2025-05"), 2),
        ];
        let err = planner.set_all(&dup).unwrap_err();
        assert!(matches!(err, Error::DuplicateMonth(m) if m == ym("2025-05")));
        assert_eq!(capacities(&planner), vec![2, 1]);
    }

    #[test]
    fn test_add_update_remove() {
        let mut planner = planner(&[("2025-01", 10, None), ("2025-03", 30, None)]);

        planner.add(ym("2025-02"), 20, Some(-5)).unwrap();
        assert_eq!(capacities(&planner), vec![10, 20, 30]);
        assert!(matches!(
            planner.add(ym("2025-02"), 1, None),
            Err(Error::DuplicateMonth(_))
        ));

        planner.update_units(ym("2025-02"), 25).unwrap();
        planner.update_adjustment(ym("2025-02"), None).unwrap();
        assert_eq!(planner.get(ym("2025-02")).unwrap().effective_units(), 25);

        assert!(matches!(
            planner.update_units(ym("2025-04"), 1),
            Err(Error::MonthNotFound(_))
        ));
        assert!(matches!(
            planner.update_adjustment(ym("2025-04"), Some(1)),
            Err(Error::MonthNotFound(_))
        ));

        let removed = planner.remove(ym("2025-01")).unwrap();
        assert_eq!(removed.capacity, 10);
        assert!(matches!(planner.remove(ym("2025-01")), Err(Error::MonthNotFound(_))));
        assert_eq!(planner.len(), 2);
    }

    #[test]
    fn test_supply_ties_keep_first_entry() {
        let planner = planner(&[
            ("2025-01", 5, None),
            ("2025-02", 9, None),
            ("2025-03", 10, Some(-1)),
            ("2025-04", 4, Some(1)),
        ]);
        assert_eq!(planner.entry_with_max_supply().unwrap().month, ym("2025-02"));
        assert_eq!(planner.entry_with_min_supply().unwrap().month, ym("2025-01"));
    }

    #[test]
    fn test_normalize_units() {
        let mut empty = CapacityPlanner::new();
        assert!(matches!(empty.normalize_units(8), Err(Error::EmptyPlan)));

        let mut single = planner(&[("2025-01", 3, None)]);
        single.normalize_units(8).unwrap();
        assert_eq!(capacities(&single), vec![3]);

        let mut many = planner(&[("2025-01", 3, Some(2)), ("2025-02", 7, None)]);
        many.normalize_units(8).unwrap();
        assert_eq!(capacities(&many), vec![8, 8]);
        assert_eq!(many.entries()[0].adjustment, Some(2));
    }

    #[test]
    fn test_recompute_default_holds_last_entry() {
        let mut planner = planner(&[
            ("2024-06", 10, None),
            ("2024-07", 20, Some(3)),
            ("2024-08", 30, Some(-4)),
        ]);
        planner
            .recompute_period(ym("2025-01"), ym("2025-05"), RecomputeMode::Default)
            .unwrap();

        let entries = planner.entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].month, ym("2025-01"));
        assert_eq!(capacities(&planner), vec![10, 20, 30, 30, 30]);
        assert_eq!(entries[1].adjustment, Some(3));
        assert_eq!(entries[4].adjustment, Some(-4));
    }

    #[test]
    fn test_recompute_default_trims_by_position() {
        let mut planner = planner(&[
            ("2025-01", 1, None),
            ("2025-02", 2, None),
            ("2025-03", 3, None),
        ]);
        // Shifting forward re-dates by position, not by calendar month
        planner
            .recompute_period(ym("2025-02"), ym("2025-03"), RecomputeMode::Default)
            .unwrap();
        assert_eq!(capacities(&planner), vec![1, 2]);
        assert_eq!(planner.earliest_month(), Some(ym("2025-02")));
    }

    #[test]
    fn test_recompute_distribute_spreads_remainder() {
        let mut planner = planner(&[("2025-01", 10, Some(1)), ("2025-02", 3, None)]);
        planner
            .recompute_period(ym("2025-01"), ym("2025-04"), RecomputeMode::Distribute)
            .unwrap();
        assert_eq!(capacities(&planner), vec![4, 4, 3, 3]);
        assert!(planner.entries().iter().all(|e| e.adjustment.is_none()));
        assert_eq!(planner.total_capacity(), 14);
    }

    #[test]
    fn test_recompute_distribute_preserves_total_for_many_lengths() {
        for total in [0u32, 1, 7, 100, 1919, 1920] {
            for length in 1..=30i64 {
                let mut planner = planner(&[("2025-01", total, None)]);
                let end = ym("2025-01").offset(length - 1).unwrap();
                planner
                    .recompute_period(ym("2025-01"), end, RecomputeMode::Distribute)
                    .unwrap();

                assert_eq!(planner.len() as i64, length);
                assert_eq!(planner.total_capacity(), i64::from(total));
                let max = planner.entries().iter().map(|e| e.capacity).max().unwrap();
                let min = planner.entries().iter().map(|e| e.capacity).min().unwrap();
                assert!(max - min <= 1, "total {} over {} months", total, length);
            }
        }
    }

    #[test]
    fn test_recompute_errors() {
        let mut empty = CapacityPlanner::new();
        assert!(matches!(
            empty.recompute_period(ym("2025-01"), ym("2025-02"), RecomputeMode::Default),
            Err(Error::EmptyPlan)
        ));

        let mut planner = planner(&[("2025-01", 5, None)]);
        assert!(matches!(
            planner.recompute_period(ym("2025-03"), ym("2025-02"), RecomputeMode::Default),
            Err(Error::InvalidRange { .. })
        ));

        let mut negative = planner_with_negative_total();
        assert!(matches!(
            negative.recompute_period(ym("2025-01"), ym("2025-02"), RecomputeMode::Distribute),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(negative.total_capacity(), -5);
    }

    fn planner_with_negative_total() -> CapacityPlanner {
        planner(&[("2025-01", 5, Some(-10))])
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Distribute".parse::<RecomputeMode>().unwrap(), RecomputeMode::Distribute);
        assert!("merge".parse::<RecomputeMode>().is_err());
    }
}
