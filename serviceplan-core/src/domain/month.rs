//! Calendar month keys ("YYYY-MM")

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

static MONTH_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(0[1-9]|1[0-2])$").expect("static regex"));

/// A year + month pair
///
/// Ordering is chronological, which for the four-digit key format is also
/// the lexicographic order of the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month key; year must be 1..=9999 and month 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(Error::invalid(format!("year out of range: {}", year)));
        }
        if !(1..=12).contains(&month) {
            return Err(Error::invalid(format!("month out of range: {}", month)));
        }
        Ok(Self { year, month })
    }

    /// Parse a "YYYY-MM" key
    pub fn parse(key: &str) -> Result<Self> {
        let caps = MONTH_KEY_RE
            .captures(key)
            .ok_or_else(|| Error::invalid(format!("malformed month key: {:?}", key)))?;
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| Error::invalid(format!("malformed month key: {:?}", key)))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| Error::invalid(format!("malformed month key: {:?}", key)))?;
        Self::new(year, month)
    }

    /// Check whether a string is a well-formed month key
    pub fn is_valid_key(key: &str) -> bool {
        Self::parse(key).is_ok()
    }

    /// The current month (UTC)
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_index(index: i64) -> Result<Self> {
        let year = i32::try_from(index.div_euclid(12))
            .map_err(|_| Error::invalid("month offset out of range"))?;
        let month = (index.rem_euclid(12) + 1) as u32;
        Self::new(year, month)
    }

    /// The month `n` months after this one (negative `n` goes back)
    pub fn offset(&self, n: i64) -> Result<Self> {
        Self::from_index(self.index() + n)
    }

    /// Number of months in the inclusive range `[start, end]`; zero when
    /// `end` precedes `start`
    pub fn months_in_period(start: YearMonth, end: YearMonth) -> usize {
        let span = end.index() - start.index();
        if span < 0 {
            0
        } else {
            (span + 1) as usize
        }
    }

    /// `count` consecutive months starting at `self`
    pub fn sequence(&self, count: usize) -> Result<Vec<YearMonth>> {
        (0..count as i64).map(|i| self.offset(i)).collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<YearMonth> for String {
    fn from(month: YearMonth) -> Self {
        month.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(key: &str) -> YearMonth {
        YearMonth::parse(key).unwrap()
    }

    #[test]
    fn test_parse_and_format() {
        assert_eq!(ym("2025-01").to_string(), "2025-01");
        assert!(YearMonth::is_valid_key("1999-12"));
        assert!(!YearMonth::is_valid_key("2025-1"));
        assert!(!YearMonth::is_valid_key("2025-13"));
        assert!(!YearMonth::is_valid_key("2025-00"));
        assert!(!YearMonth::is_valid_key("25-01"));
        assert!(!YearMonth::is_valid_key("2025-01-01"));
    }

    #[test]
    fn test_ordering_matches_key_order() {
        let mut months = vec![ym("2025-02"), ym("2024-12"), ym("2025-01"), ym("2024-11")];
        let mut keys: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        months.sort();
        keys.sort();
        let sorted: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(sorted, keys);
    }

    #[test]
    fn test_offset_crosses_year_boundary() {
        assert_eq!(ym("2025-11").offset(3).unwrap(), ym("2026-02"));
        assert_eq!(ym("2025-01").offset(-1).unwrap(), ym("2024-12"));
        assert_eq!(ym("2025-01").offset(24).unwrap(), ym("2027-01"));
        assert!(ym("9999-12").offset(1).is_err());
    }

    #[test]
    fn test_months_in_period_is_inclusive() {
        assert_eq!(YearMonth::months_in_period(ym("2025-01"), ym("2025-12")), 12);
        assert_eq!(YearMonth::months_in_period(ym("2025-03"), ym("2025-03")), 1);
        assert_eq!(YearMonth::months_in_period(ym("2024-11"), ym("2025-02")), 4);
        assert_eq!(YearMonth::months_in_period(ym("2025-02"), ym("2025-01")), 0);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ym("2025-07")).unwrap();
        assert_eq!(json, "\"2025-07\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym("2025-07"));
        assert!(serde_json::from_str::<YearMonth>("\"2025-7\"").is_err());
    }
}
