// ============================================================================
// Fixed Point - 18-decimal integer arithmetic
// ============================================================================
//
// Every amount in the engine (collateral, SI, NO, liquidity shares, scale) is
// an unsigned integer scaled by 10^18. Products of two amounts overflow u128
// quickly (10_000e18 * 10_000e18 = 1e44), so every multiply-then-divide goes
// through a 256-bit intermediate.
//
// Rounding is always explicit: callers pick floor or ceil, and results that
// do not fit back into u128 are reported, never clamped.
//
// ============================================================================

use rust_decimal::Decimal;
use uint::construct_uint;

use crate::error::MarketError;

construct_uint! {
    /// 256-bit unsigned integer for intermediate products.
    pub struct U256(4);
}

/// 1.0 in 18-decimal fixed point
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Number of fractional digits carried by every amount
pub const DECIMALS: u32 = 18;

/// Narrow a 256-bit value back to u128.
pub fn to_u128(value: U256) -> Result<u128, MarketError> {
    if value > U256::from(u128::MAX) {
        return Err(MarketError::Overflow);
    }
    Ok(value.low_u128())
}

/// floor(a * b / d)
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128, MarketError> {
    if d == 0 {
        return Err(MarketError::DivisionByZero);
    }
    to_u128(U256::from(a) * U256::from(b) / U256::from(d))
}

/// ceil(a * b / d)
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Result<u128, MarketError> {
    if d == 0 {
        return Err(MarketError::DivisionByZero);
    }
    let numerator = U256::from(a) * U256::from(b);
    let d = U256::from(d);
    let mut quotient = numerator / d;
    if !(numerator % d).is_zero() {
        quotient = quotient + U256::one();
    }
    to_u128(quotient)
}

/// Integer square root, rounded down (Newton iteration).
pub fn sqrt_floor(value: U256) -> U256 {
    if value.is_zero() {
        return U256::zero();
    }
    let mut x = value;
    let mut y = (x >> 1) + (x & U256::one());
    while y < x {
        x = y;
        y = (x + value / x) >> 1;
    }
    x
}

/// Convert a human decimal (e.g. `100.25`) into an 18-decimal integer.
///
/// Rejects negative values and anything with more than 18 fractional digits
/// instead of rounding them away.
pub fn to_wad(amount: Decimal) -> Result<u128, MarketError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MarketError::InvalidAmount(format!("negative amount {}", amount)));
    }
    let normalized = amount.normalize();
    if normalized.scale() > DECIMALS {
        return Err(MarketError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, DECIMALS
        )));
    }
    // mantissa * 10^(18 - scale)
    let mantissa = normalized.mantissa().unsigned_abs();
    let factor = 10u128.pow(DECIMALS - normalized.scale());
    mantissa.checked_mul(factor).ok_or(MarketError::Overflow)
}

/// Render an 18-decimal integer as a human decimal string (`"42.25"`).
///
/// Works on the full u128 range, which `Decimal` cannot hold, so rendering a
/// committed amount never fails.
pub fn format_wad(amount: u128) -> String {
    let whole = amount / WAD;
    let fraction = amount % WAD;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:018}", fraction);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Whole units to 18-decimal integer (`units(5) == 5 * WAD`).
pub fn units(whole: u128) -> u128 {
    whole * WAD
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mul_div_survives_wide_products() {
        let a = units(10_000);
        let b = units(10_000);
        // 1e44 / 1e22 would overflow a plain u128 multiply
        assert_eq!(mul_div_floor(a, b, units(10_000)).unwrap(), units(10_000));
    }

    #[test]
    fn test_mul_div_rounding_direction() {
        assert_eq!(mul_div_floor(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div_ceil(10, 10, 3).unwrap(), 34);
        assert_eq!(mul_div_ceil(9, 10, 3).unwrap(), 30);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(MarketError::DivisionByZero));
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), Err(MarketError::Overflow));
    }

    #[test]
    fn test_sqrt_floor() {
        assert_eq!(sqrt_floor(U256::from(0u8)), U256::zero());
        assert_eq!(sqrt_floor(U256::from(1u8)), U256::one());
        assert_eq!(sqrt_floor(U256::from(15u8)), U256::from(3u8));
        assert_eq!(sqrt_floor(U256::from(16u8)), U256::from(4u8));
        let big = U256::from(units(10_000)) * U256::from(units(10_000));
        assert_eq!(sqrt_floor(big), U256::from(units(10_000)));
    }

    #[test]
    fn test_decimal_conversion() {
        assert_eq!(to_wad(dec!(1)).unwrap(), WAD);
        assert_eq!(to_wad(dec!(0.5)).unwrap(), WAD / 2);
        assert_eq!(to_wad(dec!(100.000000000000000001)).unwrap(), units(100) + 1);
    }

    #[test]
    fn test_format_wad() {
        assert_eq!(format_wad(0), "0");
        assert_eq!(format_wad(units(42) + WAD / 4), "42.25");
        assert_eq!(format_wad(1), "0.000000000000000001");
        assert_eq!(format_wad(units(100_000_000_000)), "100000000000");
        assert_eq!(format_wad(u128::MAX), "340282366920938463463.374607431768211455");
    }

    #[test]
    fn test_decimal_conversion_rejects_instead_of_rounding() {
        assert!(matches!(to_wad(dec!(-1)), Err(MarketError::InvalidAmount(_))));
        assert!(matches!(
            to_wad(dec!(0.0000000000000000001)),
            Err(MarketError::InvalidAmount(_))
        ));
    }
}
