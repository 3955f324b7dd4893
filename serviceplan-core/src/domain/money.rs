//! Money domain model

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// ISO 4217 currency code, normalized to uppercase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
    pub const EUR: CurrencyCode = CurrencyCode(*b"EUR");

    /// Parse a currency code, trimming whitespace and normalizing case
    pub fn parse(code: &str) -> Result<Self> {
        let normalized = code.trim().to_ascii_uppercase();
        let bytes = normalized.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(Error::invalid(format!("invalid currency code: {:?}", code)));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

/// An exact decimal amount tagged with its currency
///
/// Arithmetic between two `Money` values requires both to carry the same
/// currency; scalar multiplication and division keep the currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Parse a decimal string such as "49.99"
    pub fn parse(amount: &str, currency: CurrencyCode) -> Result<Self> {
        let amount = Decimal::from_str(amount.trim())
            .map_err(|_| Error::invalid(format!("invalid amount: {:?}", amount)))?;
        Ok(Self::new(amount, currency))
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Fail unless `other` shares this value's currency
    pub fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(Error::currency_mismatch(self.currency, other.currency));
        }
        Ok(())
    }

    pub fn add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        self.with_amount(self.amount.checked_add(other.amount))
    }

    pub fn subtract(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        self.with_amount(self.amount.checked_sub(other.amount))
    }

    pub fn multiply(&self, factor: Decimal) -> Result<Money> {
        self.with_amount(self.amount.checked_mul(factor))
    }

    pub fn divide(&self, divisor: Decimal) -> Result<Money> {
        if divisor.is_zero() {
            return Err(Error::invalid("cannot divide money by zero"));
        }
        self.with_amount(self.amount.checked_div(divisor))
    }

    /// `self / other` as a plain ratio
    pub fn ratio(&self, other: &Money) -> Result<Decimal> {
        self.ensure_same_currency(other)?;
        if other.is_zero() {
            return Err(Error::invalid("cannot take a ratio against zero"));
        }
        self.amount.checked_div(other.amount).ok_or_else(out_of_range)
    }

    fn with_amount(&self, amount: Option<Decimal>) -> Result<Money> {
        amount
            .map(|amount| Self::new(amount, self.currency))
            .ok_or_else(out_of_range)
    }

    /// Round to `dp` decimal places, midpoints away from zero
    pub fn round_dp(&self, dp: u32) -> Money {
        Self::new(
            self.amount
                .round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero),
            self.currency,
        )
    }
}

fn out_of_range() -> Error {
    Error::invalid("amount out of range")
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.round_dp(2).amount)
    }
}
