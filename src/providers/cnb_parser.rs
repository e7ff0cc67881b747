//! Parser for the Czech National Bank daily rate document.
//!
//! The document looks like:
//!
//! ```xml
//! <kurzy banka="CNB" datum="16.10.2026" poradi="201">
//!   <tabulka typ="XML_TYP_CNB_KURZY_DEVIZOVEHO_TRHU">
//!     <radek kod="USD" mena="dolar" mnozstvi="1" kurz="22,222" zeme="USA"/>
//!     <radek kod="JPY" mena="jen" mnozstvi="100" kurz="14,960" zeme="Japonsko"/>
//!   </tabulka>
//! </kurzy>
//! ```
//!
//! Each `radek` quotes the price in Czech crowns for `mnozstvi` units of
//! `kod`. The name (`mena`) and country (`zeme`) are ignored.

use crate::core::currency::{Currency, ExchangeRate, RateSnapshot};
use crate::core::error::SourceError;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// The CNB publishes every rate against the Czech crown.
pub const BASE_CURRENCY: &str = "CZK";

const ROOT_ELEMENT: &[u8] = b"kurzy";
const ROW_ELEMENT: &[u8] = b"radek";
const DATE_FORMAT: &str = "%d.%m.%Y";

/// One `radek` element before the rate is derived from it.
#[derive(Debug)]
struct RawRow {
    code: String,
    amount: Decimal,
    price: Decimal,
}

impl RawRow {
    fn from_element(element: &BytesStart) -> Result<Self, SourceError> {
        let code = required_attribute(element, "kod")?;
        let amount = parse_number(&required_attribute(element, "mnozstvi")?, "mnozstvi", &code)?;
        let price = parse_number(&required_attribute(element, "kurz")?, "kurz", &code)?;

        if amount <= Decimal::ZERO {
            return Err(SourceError::Malformed(format!(
                "unit amount must be positive for {code}, got {amount}"
            )));
        }

        Ok(RawRow {
            code,
            amount,
            price,
        })
    }

    fn into_rate(self, base: &Currency) -> Result<ExchangeRate, SourceError> {
        let rate = self
            .price
            .checked_div(self.amount)
            .ok_or_else(|| {
                SourceError::Malformed(format!(
                    "rate overflows for {}: {} / {}",
                    self.code, self.price, self.amount
                ))
            })?
            .normalize();
        ExchangeRate::new(base.clone(), Currency::new(&self.code), rate).ok_or_else(|| {
            SourceError::Malformed(format!(
                "rate must be positive for {}, got {}",
                self.code, self.price
            ))
        })
    }
}

fn required_attribute(element: &BytesStart, name: &str) -> Result<String, SourceError> {
    let attribute = element
        .try_get_attribute(name)
        .map_err(|e| SourceError::Malformed(format!("invalid attributes in row: {e}")))?
        .ok_or_else(|| SourceError::Malformed(format!("row is missing attribute '{name}'")))?;

    attribute
        .unescape_value()
        .map(|value| value.trim().to_string())
        .map_err(|e| SourceError::Malformed(format!("invalid value for '{name}': {e}")))
}

/// Accepts both `,` and `.` as the decimal separator.
fn parse_number(value: &str, name: &str, code: &str) -> Result<Decimal, SourceError> {
    Decimal::from_str(&value.replace(',', ".")).map_err(|e| {
        SourceError::Malformed(format!("invalid number '{value}' in '{name}' for {code}: {e}"))
    })
}

fn published_on(element: &BytesStart) -> Option<NaiveDate> {
    let value = required_attribute(element, "datum").ok()?;
    match NaiveDate::parse_from_str(&value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!("Could not parse publication date '{}': {}", value, e);
            None
        }
    }
}

/// Parses the rate document into a snapshot quoted against [`BASE_CURRENCY`].
///
/// Rows keep document order. If a code appears more than once the last row
/// wins, in the position of the first.
pub fn parse_rates(raw: &str) -> Result<RateSnapshot, SourceError> {
    let base = Currency::new(BASE_CURRENCY);
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut date = None;
    let mut rates: Vec<ExchangeRate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                match element.name().as_ref() {
                    ROOT_ELEMENT => date = published_on(&element),
                    ROW_ELEMENT => {
                        let row = RawRow::from_element(&element)?;
                        let code = row.code.clone();
                        let rate = row.into_rate(&base)?;
                        match positions.get(&code) {
                            Some(&index) => {
                                warn!("Duplicate row for {} in rate document, keeping the last", code);
                                rates[index] = rate;
                            }
                            None => {
                                positions.insert(code, rates.len());
                                rates.push(rate);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Malformed(format!(
                    "XML error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    if rates.is_empty() {
        return Err(SourceError::Malformed(
            "document contains no rate rows".to_string(),
        ));
    }

    debug!("Parsed {} rates published on {:?}", rates.len(), date);
    Ok(RateSnapshot {
        published_on: date,
        rates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kurzy banka="CNB" datum="16.10.2026" poradi="201">
  <tabulka typ="XML_TYP_CNB_KURZY_DEVIZOVEHO_TRHU">
    <radek kod="EUR" mena="euro" mnozstvi="1" kurz="24,335" zeme="EMU"/>
    <radek kod="JPY" mena="jen" mnozstvi="100" kurz="14,960" zeme="Japonsko"/>
    <radek kod="USD" mena="dolar" mnozstvi="1" kurz="22,222" zeme="USA"/>
  </tabulka>
</kurzy>"#;

    fn czk() -> Currency {
        Currency::new(BASE_CURRENCY)
    }

    #[test]
    fn test_parse_rates() {
        let snapshot = parse_rates(DOCUMENT).unwrap();

        assert_eq!(
            snapshot.published_on,
            NaiveDate::from_ymd_opt(2026, 10, 16)
        );
        let codes: Vec<_> = snapshot.rates.iter().map(|r| r.target().code()).collect();
        assert_eq!(codes, vec!["EUR", "JPY", "USD"]);
        assert!(snapshot.rates.iter().all(|r| r.base() == &czk()));

        assert_eq!(snapshot.rates[0].rate(), dec!(24.335));
        // Quoted per 100 units
        assert_eq!(snapshot.rates[1].rate(), dec!(0.1496));
        assert_eq!(snapshot.rates[2].rate(), dec!(22.222));
    }

    #[test]
    fn test_parse_accepts_dot_separator_and_missing_date() {
        let raw = r#"<kurzy><radek kod="GBP" mnozstvi="1" kurz="28.5"/></kurzy>"#;
        let snapshot = parse_rates(raw).unwrap();

        assert!(snapshot.published_on.is_none());
        assert_eq!(snapshot.rates.len(), 1);
        assert_eq!(snapshot.rates[0].rate(), dec!(28.5));
    }

    #[test]
    fn test_parse_duplicate_code_last_row_wins() {
        let raw = r#"<kurzy>
            <radek kod="USD" mnozstvi="1" kurz="22,000"/>
            <radek kod="EUR" mnozstvi="1" kurz="24,335"/>
            <radek kod="USD" mnozstvi="1" kurz="22,500"/>
        </kurzy>"#;
        let snapshot = parse_rates(raw).unwrap();

        assert_eq!(snapshot.rates.len(), 2);
        assert_eq!(snapshot.rates[0].target().code(), "USD");
        assert_eq!(snapshot.rates[0].rate(), dec!(22.5));
        assert_eq!(snapshot.rates[1].target().code(), "EUR");
    }

    #[test]
    fn test_parse_missing_attribute() {
        let raw = r#"<kurzy><radek kod="USD" mnozstvi="1"/></kurzy>"#;
        let result = parse_rates(raw);
        assert_eq!(
            result,
            Err(SourceError::Malformed(
                "row is missing attribute 'kurz'".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_zero_unit_amount() {
        let raw = r#"<kurzy><radek kod="USD" mnozstvi="0" kurz="22,222"/></kurzy>"#;
        let err = parse_rates(raw).unwrap_err();
        assert!(err.to_string().contains("unit amount must be positive for USD"));
    }

    #[test]
    fn test_parse_non_positive_price() {
        let raw = r#"<kurzy><radek kod="USD" mnozstvi="1" kurz="-1"/></kurzy>"#;
        let err = parse_rates(raw).unwrap_err();
        assert!(err.to_string().contains("rate must be positive for USD"));
    }

    #[test]
    fn test_parse_invalid_number() {
        let raw = r#"<kurzy><radek kod="USD" mnozstvi="1" kurz="n/a"/></kurzy>"#;
        let err = parse_rates(raw).unwrap_err();
        assert!(err.to_string().contains("invalid number 'n/a' in 'kurz' for USD"));
    }

    #[test]
    fn test_parse_no_rows() {
        let result = parse_rates("Service temporarily unavailable");
        assert_eq!(
            result,
            Err(SourceError::Malformed(
                "document contains no rate rows".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_broken_xml() {
        let raw = r#"<kurzy><tabulka><radek kod="USD" mnozstvi="1" kurz="22,222"/></kurzy>"#;
        let err = parse_rates(raw).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse rate document: XML error"));
    }

    #[test]
    fn test_parse_overflowing_rate() {
        let raw = r#"<kurzy><radek kod="USD" mnozstvi="0,0000000000000000000000000001" kurz="79228162514264337593543950335"/></kurzy>"#;
        let err = parse_rates(raw).unwrap_err();
        assert_eq!(err.category(), crate::core::error::ErrorCategory::MalformedSource);
        assert!(err.to_string().contains("rate overflows for USD"), "{err}");
    }
}
