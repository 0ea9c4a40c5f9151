//! Price text parsing and comparison helpers.
//!
//! [`parse_price`] is meant for [`crate::source::ProductSource`] implementors
//! turning marketplace page text into a [`Decimal`].

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use crate::model::Region;

#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum PriceParseError {
    #[error("Price text is empty.")]
    Empty,

    #[error("Price text `{text}` is not a number.")]
    Malformed { text: String },
}

/// Rounds to hundredths, half away from zero.
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts marketplace price text such as `1.099,89 €` or `$1,099.89` into a
/// decimal, using the region's separator conventions.
pub fn parse_price(text: &str, region: &Region) -> Result<Decimal, PriceParseError> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if digits.is_empty() {
        return Err(PriceParseError::Empty);
    }

    let normalized = if region.uses_decimal_comma() {
        digits.replace('.', "").replacen(',', ".", 1)
    } else {
        digits.replace(',', "")
    };

    Decimal::from_str(&normalized).map_err(|_| PriceParseError::Malformed {
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_price_decimal_comma() {
        let it = Region::new("it");
        assert_eq!(parse_price("12,99 €", &it), Ok(dec("12.99")));
        assert_eq!(parse_price("1.099,89\u{a0}€", &it), Ok(dec("1099.89")));
    }

    #[test]
    fn test_parse_price_decimal_point() {
        let com = Region::new("com");
        assert_eq!(parse_price("$1,099.89", &com), Ok(dec("1099.89")));
        assert_eq!(parse_price(" $7 ", &com), Ok(dec("7")));
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        let it = Region::new("it");
        assert_eq!(parse_price("", &it), Err(PriceParseError::Empty));
        assert_eq!(parse_price("Non disponibile", &it), Err(PriceParseError::Empty));
        assert!(matches!(
            parse_price("1,2,3", &it),
            Err(PriceParseError::Malformed { .. })
        ));
    }

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(dec("1.005")), dec("1.01"));
        assert_eq!(round_price(dec("1.004")), dec("1.00"));
    }
}
