// ============================================================================
// Constant-Product Pricing - closed forms
// ============================================================================
//
// Formula: x * y = k (fee-free)
//
// For the outcome pair:
// - x = SI reserve, y = NO reserve
// - Price(SI) = NO / (SI + NO) (implied probability of SI)
// - Price(NO) = SI / (SI + NO)
//
// All solvers below are analytic: no iteration over trial amounts. Integer
// results are floored so that rounding always favors the pool.
//
// ============================================================================

use super::Reserves;
use crate::error::MarketError;
use crate::fixed_point::{mul_div_floor, sqrt_floor, to_u128, U256, WAD};
use crate::outcome::Side;

/// Output of a fee-free constant-product swap.
///
/// `reserve_out - k / (reserve_in + amount_in)`, floored. Equivalent to
/// `floor(amount_in * reserve_out / (reserve_in + amount_in))`.
pub fn swap_output(reserve_in: u128, reserve_out: u128, amount_in: u128) -> Result<u128, MarketError> {
    if amount_in == 0 {
        return Err(MarketError::ZeroAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(MarketError::InsufficientReserve);
    }
    let denominator = reserve_in
        .checked_add(amount_in)
        .ok_or(MarketError::Overflow)?;
    mul_div_floor(amount_in, reserve_out, denominator)
}

/// `floor(a * b / d)` on 256-bit operands without forming `a * b`.
///
/// Used where `a` is itself a product of two reserves.
fn mul_div_wide(a: U256, b: U256, d: U256) -> Result<U256, MarketError> {
    if d.is_zero() {
        return Err(MarketError::DivisionByZero);
    }
    let whole = (a / d).checked_mul(b).ok_or(MarketError::Overflow)?;
    let part = (a % d).checked_mul(b).ok_or(MarketError::Overflow)? / d;
    whole.checked_add(part).ok_or(MarketError::Overflow)
}

/// Amount of `side` to swap into the opposite side so that, out of a holding
/// of `amount` tokens of `side`, the remainder equals the swap output.
///
/// Solves `(t - x)(R_s + x) = x * R_o` for x:
///   x^2 + (R_s + R_o - t) x - t R_s = 0
///   x = (sqrt(B^2 + 4 t R_s) - B) / 2,  B = R_s + R_o - t
pub fn sell_swap_amount(amount: u128, reserve_side: u128, reserve_other: u128) -> Result<u128, MarketError> {
    if amount == 0 {
        return Err(MarketError::ZeroAmount);
    }
    if reserve_side == 0 || reserve_other == 0 {
        return Err(MarketError::InsufficientReserve);
    }
    let t = U256::from(amount);
    let r_side = U256::from(reserve_side);
    let reserves_sum = r_side + U256::from(reserve_other);

    let four_t_rs = (t * r_side)
        .checked_mul(U256::from(4u8))
        .ok_or(MarketError::Overflow)?;
    let (b, b_negative) = if reserves_sum >= t {
        (reserves_sum - t, false)
    } else {
        (t - reserves_sum, true)
    };
    let discriminant = b
        .checked_mul(b)
        .and_then(|b2| b2.checked_add(four_t_rs))
        .ok_or(MarketError::Overflow)?;
    let root = sqrt_floor(discriminant);

    let x = if b_negative { (root + b) >> 1 } else { (root - b) >> 1 };
    Ok(to_u128(x)?.min(amount))
}

/// Swap that re-balances a freshly minted `(c, c)` pair towards the pool's
/// ratio, so the resulting holding can be deposited without leftovers.
///
/// Returns the side to swap from and the amount. With `R_a` the reserve of
/// the scarce side we swap out of and `R_b` the other:
///   u = sqrt(R_a R_b (c + R_a) / (c + R_b)),  x = u - R_a
pub fn zap_swap(amount: u128, reserves: Reserves) -> Result<Option<(Side, u128)>, MarketError> {
    if reserves.si == reserves.no {
        return Ok(None);
    }
    // The pool holds more SI than NO: our pair has too little SI, so NO is
    // swapped into SI (and vice versa).
    let from = if reserves.si > reserves.no { Side::No } else { Side::Si };
    let r_from = reserves.get(from);
    let r_to = reserves.get(from.opposite());

    let c = U256::from(amount);
    let k = U256::from(r_from) * U256::from(r_to);
    let u_squared = mul_div_wide(k, c + U256::from(r_from), c + U256::from(r_to))?;
    let u = to_u128(sqrt_floor(u_squared))?;
    let x = u.saturating_sub(r_from).min(amount);
    Ok((x > 0).then_some((from, x)))
}

/// Largest deposit out of `(hold_si, hold_no)` that matches the reserve ratio.
pub fn matched_deposit(hold_si: u128, hold_no: u128, reserves: Reserves) -> Result<(u128, u128), MarketError> {
    if reserves.is_empty() {
        return Ok((hold_si, hold_no));
    }
    let no_needed = mul_div_floor(hold_si, reserves.no, reserves.si)?;
    if no_needed <= hold_no {
        return Ok((hold_si, no_needed));
    }
    let si_needed = mul_div_floor(hold_no, reserves.si, reserves.no)?;
    Ok((si_needed.min(hold_si), hold_no))
}

/// Whether a deposit matches the reserve ratio up to integer rounding:
/// `|a_si * R_no - a_no * R_si| < max(R_si, R_no)`.
pub fn ratio_matches(amount_si: u128, amount_no: u128, reserves: Reserves) -> bool {
    let lhs = U256::from(amount_si) * U256::from(reserves.no);
    let rhs = U256::from(amount_no) * U256::from(reserves.si);
    let diff = if lhs >= rhs { lhs - rhs } else { rhs - lhs };
    diff < U256::from(reserves.si.max(reserves.no))
}

/// Implied probability of SI, 1e18 = 100%. `None` for an empty pool.
pub fn implied_probability(reserves: Reserves) -> Option<u128> {
    let total = reserves.si.checked_add(reserves.no)?;
    if total == 0 {
        return None;
    }
    mul_div_floor(reserves.no, WAD, total).ok()
}

// ============================================================================
// TESTS
// ============================================================================
