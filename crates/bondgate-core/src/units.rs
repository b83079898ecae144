//! Fixed-point amount conversion at the display boundary.
//!
//! Contract arithmetic never leaves U256; these helpers convert between
//! smallest-unit integers and human decimal strings without touching
//! binary floating point, so values wider than an f64 mantissa survive
//! round trips intact.

use alloy::primitives::{
    utils::{format_units, parse_units},
    U256,
};

use crate::error::MarketError;

/// Validate an amount string without needing the token's decimals.
///
/// Rejects empty, negative, non-numeric and all-zero input. Used by the
/// mutating flows to fail bad input before the first network call.
pub fn validate_amount_str(input: &str) -> Result<(), MarketError> {
    let trimmed = input.trim();
    let reject = || MarketError::InvalidAmount(input.to_string());

    if trimmed.is_empty() || trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(reject());
    }
    if trimmed.chars().filter(|c| *c == '.').count() > 1 {
        return Err(reject());
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(reject());
    }
    // "0", "0.00", "." are syntactically numbers but not a positive quantity
    if trimmed.chars().all(|c| c == '0' || c == '.') {
        return Err(reject());
    }
    Ok(())
}

/// Parse a human decimal string into smallest units at the given decimals.
///
/// Applies the same validation as [`validate_amount_str`]; zero never passes.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256, MarketError> {
    validate_amount_str(input)?;

    let parsed = parse_units(input.trim(), decimals)
        .map_err(|_| MarketError::InvalidAmount(input.to_string()))?;
    let value = parsed.get_absolute();
    if value.is_zero() {
        return Err(MarketError::InvalidAmount(input.to_string()));
    }
    Ok(value)
}

/// Render a smallest-unit amount as a decimal string for display
pub fn format_amount(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_amount() {
        assert_eq!(
            parse_amount("100", 18).unwrap(),
            U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64))
        );
    }

    #[test]
    fn test_parse_fractional_amount() {
        assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_amount("0.000001", 6).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_parse_zero_decimals() {
        assert_eq!(parse_amount("42", 0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_rejects_bad_input() {
        for bad in ["", "0", "0.00", "-5", "abc", "1.2.3", "+7", " . "] {
            assert!(
                matches!(parse_amount(bad, 18), Err(MarketError::InvalidAmount(_))),
                "expected InvalidAmount for {bad:?}"
            );
        }
    }

    #[test]
    fn test_format_survives_wide_values() {
        // 27 significant digits, far past what an f64 mantissa can hold
        let raw = U256::from_str_radix("123456789012345678901234567", 10).unwrap();
        assert_eq!(format_amount(raw, 18), "123456789.012345678901234567");
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let raw = U256::from_str_radix("987654321987654321987654321", 10).unwrap();
        let rendered = format_amount(raw, 18);
        assert_eq!(parse_amount(&rendered, 18).unwrap(), raw);
    }
}
