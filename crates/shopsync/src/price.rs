//! Prices as exact integer minor units.
//!
//! Displayed prices are parsed by stripping currency symbols and whitespace;
//! whatever is left must be a decimal with at most two fractional digits,
//! optionally grouped by commas in threes (`1,234,567.89`). Anything else is
//! a parse failure.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];

fn amount_pattern() -> Option<&'static Regex> {
    static AMOUNT: OnceLock<Option<Regex>> = OnceLock::new();
    AMOUNT
        .get_or_init(|| Regex::new(r"^(-)?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?$").ok())
        .as_ref()
}

/// A displayed price that could not be read as an amount
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unparsable price: {raw:?}")]
pub struct PriceError {
    /// Text as displayed
    pub raw: String,
}

/// Exact amount in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(i64);

impl Price {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// From minor units
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Minor units
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Parse displayed text such as `"$1,234.50"`
    ///
    /// # Errors
    ///
    /// [`PriceError`] carrying the raw text when it is not an amount.
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        let fail = || PriceError {
            raw: raw.to_string(),
        };
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
            .collect();
        let caps = amount_pattern()
            .and_then(|re| re.captures(&cleaned))
            .ok_or_else(fail)?;

        let whole: i64 = caps[2].replace(',', "").parse().map_err(|_| fail())?;
        let fraction = caps.get(3).map_or("", |m| m.as_str());
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| fail())? * 10,
            _ => fraction.parse().map_err(|_| fail())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(fail)?;
        Ok(Self(if caps.get(1).is_some() { -cents } else { cents }))
    }

    /// Checked addition
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// One displayed price and its reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Text as displayed
    pub raw: String,
    /// Parsed amount; `None` when unparsable
    pub parsed: Option<Price>,
}

impl PriceSample {
    /// Read a displayed price
    #[must_use]
    pub fn read(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = Price::parse(&raw).ok();
        Self { raw, parsed }
    }
}

/// Inclusive price interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Lower bound
    pub min: Price,
    /// Upper bound
    pub max: Price,
}

impl PriceRange {
    /// Create a range
    #[must_use]
    pub const fn new(min: Price, max: Price) -> Self {
        Self { min, max }
    }

    /// Range of a layered-navigation bucket such as `"50-60"`.
    ///
    /// Buckets exclude their upper edge, so `50-60` covers 50.00 through 59.99.
    ///
    /// # Errors
    ///
    /// [`PriceError`] when either edge is not an amount or the bucket is empty.
    pub fn from_bucket(bucket: &str) -> Result<Self, PriceError> {
        let fail = || PriceError {
            raw: bucket.to_string(),
        };
        let (low, high) = bucket.split_once('-').ok_or_else(fail)?;
        let min = Price::parse(low).map_err(|_| fail())?;
        let max = Price::from_cents(Price::parse(high).map_err(|_| fail())?.cents() - 1);
        if max < min {
            return Err(fail());
        }
        Ok(Self { min, max })
    }

    /// Whether `price` lies within the range
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        self.min <= price && price <= self.max
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
