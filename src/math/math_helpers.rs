use crate::error::MathError;
use alloy_primitives::U256;

const U256_ONE: U256 = U256::ONE;
const U256_TWO: U256 = U256::from_limbs([2, 0, 0, 0]);
const U256_THREE: U256 = U256::from_limbs([3, 0, 0, 0]);

/// Computes `a * b / denominator` with full 512-bit intermediate precision,
/// returning a `MathError` on overflow or division by zero.
///
/// Mirrors the Solidity `FullMath.mulDiv` behavior and underpins the swap,
/// liquidity, and fee-accrual calculations.
#[inline]
pub fn mul_div(a: U256, b: U256, mut denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }

    // 512-bit product as prod1 * 2^256 + prod0.
    let mm = a.mul_mod(b, U256::MAX);
    let mut prod0 = a.wrapping_mul(b);
    let (mut prod1, borrow) = mm.overflowing_sub(prod0);
    if borrow {
        prod1 = prod1.wrapping_sub(U256_ONE);
    }

    if prod1.is_zero() {
        return Ok(prod0.wrapping_div(denominator));
    }

    if denominator <= prod1 {
        return Err(MathError::Overflow);
    }

    // Subtract the 512-bit remainder so the quotient becomes exact.
    let remainder = a.mul_mod(b, denominator);
    let (sub0, borrow) = prod0.overflowing_sub(remainder);
    prod0 = sub0;
    if borrow {
        prod1 = prod1.wrapping_sub(U256_ONE);
    }

    // Factor powers of two out of the denominator.
    let twos = denominator & denominator.wrapping_neg();
    denominator = denominator.wrapping_div(twos);
    prod0 = prod0.wrapping_div(twos);
    prod0 |= prod1.wrapping_mul(twos.wrapping_neg().wrapping_div(twos).wrapping_add(U256_ONE));

    // Modular inverse of the (now odd) denominator via Newton-Raphson;
    // six iterations are exact for 2^256.
    let mut inv = U256_THREE.wrapping_mul(denominator) ^ U256_TWO;
    for _ in 0..6 {
        inv = inv.wrapping_mul(U256_TWO.wrapping_sub(denominator.wrapping_mul(inv)));
    }

    Ok(prod0.wrapping_mul(inv))
}

/// Like [`mul_div`], but rounds up when the division leaves a remainder.
#[inline]
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    let mut result = mul_div(a, b, denominator)?;

    if a.mul_mod(b, denominator) > U256::ZERO {
        if result == U256::MAX {
            return Err(MathError::Overflow);
        }
        result += U256_ONE;
    }
    Ok(result)
}

/// Divides `a` by `b`, rounding up on a non-zero remainder.
///
/// Panics on division by zero, mirroring primitive integer division, so
/// callers must ensure `b != 0`.
#[inline]
pub fn div_rounding_up(a: U256, b: U256) -> U256 {
    let (quotient, remainder) = a.div_rem(b);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + U256_ONE
    }
}
