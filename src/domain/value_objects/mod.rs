//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Free-text price as typed into the spreadsheet ("4500 DA", "25.00", "1 250 MAD").
///
/// The text is kept verbatim for display; [`PriceTag::amount`] parses it the
/// way the storefront always has: drop everything but digits and dots, then
/// read the leading decimal number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTag(String);

impl PriceTag {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_blank(&self) -> bool { self.0.trim().is_empty() }

    pub fn amount(&self) -> Decimal { parse_price(&self.0) }
}

impl fmt::Display for PriceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<String> for PriceTag {
    fn from(value: String) -> Self { Self(value) }
}

impl From<&str> for PriceTag {
    fn from(value: &str) -> Self { Self::new(value) }
}

/// Strip non-numeric characters and read the leading decimal number.
///
/// A second `.` ends the number, so `"1.250.00"` reads as `1.250`. Anything
/// that leaves no digits is zero.
pub fn parse_price(raw: &str) -> Decimal {
    let kept: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    let mut number = String::with_capacity(kept.len());
    let mut seen_dot = false;
    for c in kept.chars() {
        if c == '.' {
            if seen_dot { break; }
            seen_dot = true;
        }
        number.push(c);
    }
    let number = number.trim_end_matches('.');
    if number.is_empty() || number == "." { return Decimal::ZERO; }
    let number = if number.starts_with('.') { format!("0{number}") } else { number.to_string() };
    Decimal::from_str(&number).unwrap_or(Decimal::ZERO)
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Two-decimal amount without the currency, as stored in `orderTotal`.
    pub fn to_fixed(&self) -> String { format!("{:.2}", self.amount.round_dp(2)) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.to_fixed(), self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("DA") } }

#[derive(Debug, Clone)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}
