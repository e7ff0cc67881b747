//! Currency and exchange rate types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// An ISO-style currency code, compared exactly as published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Currency(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Currency::new(code)
    }
}

impl FromStr for Currency {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Currency::new(s))
    }
}

/// A published rate: one unit of `target` costs `rate` units of `base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRate {
    base: Currency,
    target: Currency,
    rate: Decimal,
}

impl ExchangeRate {
    /// Returns `None` unless `rate` is strictly positive.
    pub fn new(base: Currency, target: Currency, rate: Decimal) -> Option<Self> {
        if rate <= Decimal::ZERO {
            return None;
        }
        Some(ExchangeRate { base, target, rate })
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn target(&self) -> &Currency {
        &self.target
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} {}", self.base, self.target, self.rate)
    }
}

/// Every rate from one published document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSnapshot {
    pub published_on: Option<NaiveDate>,
    pub rates: Vec<ExchangeRate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_equality_is_case_sensitive() {
        assert_eq!(Currency::new("USD"), Currency::from("USD"));
        assert_ne!(Currency::new("USD"), Currency::new("usd"));
        assert_eq!("EUR".parse::<Currency>().unwrap().code(), "EUR");
    }

    #[test]
    fn test_exchange_rate_rejects_non_positive_values() {
        let base = Currency::new("CZK");
        assert!(ExchangeRate::new(base.clone(), Currency::new("USD"), dec!(0)).is_none());
        assert!(ExchangeRate::new(base.clone(), Currency::new("USD"), dec!(-1.5)).is_none());

        let rate = ExchangeRate::new(base, Currency::new("USD"), dec!(22.222)).unwrap();
        assert_eq!(rate.base().code(), "CZK");
        assert_eq!(rate.target().code(), "USD");
        assert_eq!(rate.rate(), dec!(22.222));
        assert_eq!(rate.to_string(), "CZK/USD 22.222");
    }

    #[test]
    fn test_exchange_rate_serializes_codes_as_strings() {
        let rate =
            ExchangeRate::new(Currency::new("CZK"), Currency::new("EUR"), dec!(24.5)).unwrap();
        let json = serde_json::to_value(&rate).unwrap();
        assert_eq!(json["base"], "CZK");
        assert_eq!(json["target"], "EUR");
        assert_eq!(json["rate"], "24.5");
    }
}
