//! Fixed-point unit conversion.
//!
//! Morpho reports asset amounts as 18-decimal integers and oracle prices as
//! 36-decimal integers. Integer strings are split into whole and fractional
//! parts with exact U256 arithmetic before the single conversion to `f64`,
//! so no precision is lost beyond the final float representation.

use alloy::primitives::U256;
use thiserror::Error;

/// Decimals of raw asset amounts (supply, borrow, collateral, reallocatable liquidity).
pub const ASSET_DECIMALS: u8 = 18;

/// Decimals of Morpho oracle collateral prices.
pub const PRICE_DECIMALS: u8 = 36;

/// Value that could not be read as a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a numeric value: {0:?}")]
pub struct NotNumeric(pub String);

/// Pre-computed powers of 10 for fast decimal conversion
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Fast power of 10 lookup (up to 10^38)
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    if exp < 39 {
        U256::from(POW10[exp as usize])
    } else {
        U256::from(10u64).pow(U256::from(exp))
    }
}

/// Convert a U256 to the nearest f64.
#[inline]
pub fn u256_to_f64(value: U256) -> f64 {
    if value <= U256::from(u128::MAX) {
        let value: u128 = value.to();
        value as f64
    } else {
        const LIMB: f64 = 18_446_744_073_709_551_616.0; // 2^64
        value
            .as_limbs()
            .iter()
            .rev()
            .fold(0.0, |acc, &limb| acc * LIMB + limb as f64)
    }
}

/// Convert a fixed-point numeric string to a display float: `raw / 10^decimals`.
///
/// Integer strings take the exact path; anything else that parses as a finite
/// float (decimal points, exponents, a leading minus) is divided directly.
/// Empty and non-numeric input fails.
pub fn to_decimal(raw: &str, decimals: u8) -> Result<f64, NotNumeric> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NotNumeric(raw.to_string()));
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = U256::from_str_radix(trimmed, 10) {
            return Ok(scale_down(value, decimals));
        }
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value / u256_to_f64(pow10(decimals))),
        _ => Err(NotNumeric(raw.to_string())),
    }
}

/// Divide an integer by 10^decimals, keeping the remainder exact until the end.
fn scale_down(value: U256, decimals: u8) -> f64 {
    let divisor = pow10(decimals);
    let whole = value / divisor;
    let fraction = value % divisor;
    u256_to_f64(whole) + u256_to_f64(fraction) / u256_to_f64(divisor)
}

/// Largest power of ten representable as a finite `f64`.
const MAX_F64_POW10: u32 = 308;

/// Round half away from zero to `decimals` places.
///
/// Values whose scaled form overflows are returned unchanged.
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals.min(MAX_F64_POW10) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// `numerator / denominator`, or 0 when the denominator is zero.
#[inline]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_amount_conversion() {
        assert_eq!(to_decimal("2000000000000000000", ASSET_DECIMALS).unwrap(), 2.0);
        assert_eq!(to_decimal("0", ASSET_DECIMALS).unwrap(), 0.0);
        assert_eq!(to_decimal("1500000000000000000", ASSET_DECIMALS).unwrap(), 1.5);
    }

    #[test]
    fn test_price_conversion() {
        // Price of exactly 1.0 at 36 decimals
        let one = "1000000000000000000000000000000000000";
        assert_eq!(to_decimal(one, PRICE_DECIMALS).unwrap(), 1.0);

        // 3412.55 at 36 decimals exceeds u128 once multiplied out
        let price = "3412550000000000000000000000000000000000";
        let value = to_decimal(price, PRICE_DECIMALS).unwrap();
        assert!((value - 3412.55).abs() < 1e-9);
    }

    #[test]
    fn test_non_integer_strings() {
        assert!((to_decimal("1.5e18", ASSET_DECIMALS).unwrap() - 1.5).abs() < 1e-12);
        assert!((to_decimal(" 250000000000000000 ", ASSET_DECIMALS).unwrap() - 0.25).abs() < 1e-12);
        assert!((to_decimal("-1000000000000000000", ASSET_DECIMALS).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_input_fails() {
        assert_eq!(
            to_decimal("abc", ASSET_DECIMALS),
            Err(NotNumeric("abc".to_string()))
        );
        assert!(to_decimal("", ASSET_DECIMALS).is_err());
        assert!(to_decimal("NaN", ASSET_DECIMALS).is_err());
        assert!(to_decimal("inf", ASSET_DECIMALS).is_err());
    }

    #[test]
    fn test_u256_to_f64_beyond_u128() {
        let large = U256::from(u128::MAX) * U256::from(4u64);
        let expected = u128::MAX as f64 * 4.0;
        assert!((u256_to_f64(large) - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.234_56, 4), 1.2346);
        assert_eq!(round_to(-1.234_56, 4), -1.2346);
        assert_eq!(round_to(2.0, 4), 2.0);
        assert!(round_to(f64::NAN, 4).is_nan());
    }

    #[test]
    fn test_round_to_large_decimals() {
        assert_eq!(round_to(0.0, 400), 0.0);
        assert!((round_to(1.5, 400) - 1.5).abs() < 1e-12);
        assert!((round_to(1.5, u32::MAX) - 1.5).abs() < 1e-12);
        assert_eq!(round_to(1e300, 20), 1e300);
    }

    #[test]
    fn test_safe_ratio_guards_zero() {
        assert_eq!(safe_ratio(10.0, 0.0), 0.0);
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
        assert_eq!(safe_ratio(5.0, 20.0), 0.25);
    }

    #[test]
    fn test_pow10_lookup() {
        assert_eq!(pow10(0), U256::from(1u64));
        assert_eq!(pow10(18), U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(pow10(40), U256::from(10u64).pow(U256::from(40u64)));
    }
}
