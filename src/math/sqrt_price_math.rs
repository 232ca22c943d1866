use crate::RESOLUTION;
use crate::error::{Error, MathError, StateError};
use crate::math::math_helpers::{div_rounding_up, mul_div, mul_div_rounding_up};
use crate::{Q96, U160_MAX};
use alloy_primitives::{I256, U256};

/// Computes the next sqrt price after moving `amount` of token0 into or out
/// of the pool, rounding the resulting price up.
///
/// This is the low-level primitive behind the token0 side of
/// [`get_next_sqrt_price_from_input`] / [`get_next_sqrt_price_from_output`].
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    if amount.is_zero() {
        return Ok(sqrt_p_x96);
    }

    let numerator1: U256 = U256::from(liquidity) << RESOLUTION;
    let product: U256 = amount.wrapping_mul(sqrt_p_x96);

    if add {
        if product / amount == sqrt_p_x96 {
            let denominator = numerator1.wrapping_add(product);
            if denominator >= numerator1 {
                return mul_div_rounding_up(numerator1, sqrt_p_x96, denominator)
                    .map_err(Error::from);
            }
        }
        Ok(div_rounding_up(
            numerator1,
            (numerator1 / sqrt_p_x96) + amount,
        ))
    } else {
        if product / amount != sqrt_p_x96 || numerator1 <= product {
            return Err(StateError::InsufficientReserves.into());
        }
        let denominator = numerator1 - product;
        mul_div_rounding_up(numerator1, sqrt_p_x96, denominator).map_err(Error::from)
    }
}

/// Computes the next sqrt price after moving `amount` of token1 into or out
/// of the pool, rounding the resulting price down.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    let liquidity = U256::from(liquidity);
    if add {
        let quotient: U256 = if amount <= U160_MAX {
            (amount << RESOLUTION) / liquidity
        } else {
            mul_div(amount, Q96, liquidity)?
        };

        let result = sqrt_p_x96 + quotient;
        if result <= U160_MAX {
            Ok(result)
        } else {
            Err(MathError::Overflow.into())
        }
    } else {
        let quotient: U256 = if amount <= U160_MAX {
            div_rounding_up(amount << RESOLUTION, liquidity)
        } else {
            mul_div_rounding_up(amount, Q96, liquidity)?
        };

        if sqrt_p_x96 <= quotient {
            return Err(StateError::InsufficientReserves.into());
        }
        Ok(sqrt_p_x96 - quotient)
    }
}

/// Token0 amount between two sqrt prices for a given liquidity, with an
/// explicit rounding direction.
pub fn get_amount_0_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    if sqrt_ratio_a_x96.is_zero() {
        return Err(StateError::SqrtRatioIsZero.into());
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = sqrt_ratio_b_x96 - sqrt_ratio_a_x96;

    if round_up {
        Ok(div_rounding_up(
            mul_div_rounding_up(numerator1, numerator2, sqrt_ratio_b_x96)?,
            sqrt_ratio_a_x96,
        ))
    } else {
        Ok(mul_div(numerator1, numerator2, sqrt_ratio_b_x96)? / sqrt_ratio_a_x96)
    }
}

/// Token1 amount between two sqrt prices for a given liquidity, with an
/// explicit rounding direction.
pub fn get_amount_1_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };
    let liquidity = U256::from(liquidity);

    if round_up {
        mul_div_rounding_up(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    } else {
        mul_div(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    }
}

/// Signed token0 delta for a signed liquidity amount: negative liquidity
/// rounds down and negates, positive rounds up.
pub fn get_amount_0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, Error> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}

/// Signed token1 delta for a signed liquidity amount.
pub fn get_amount_1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, MathError> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}

/// Next sqrt price when swapping `amount_in` into the pool, choosing the
/// token0/token1 branch from `zero_for_one`. Always rounds against the
/// swapper.
pub fn get_next_sqrt_price_from_input(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if sqrt_p_x96.is_zero() {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if liquidity == 0 {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_in, true)
    }
}

/// Next sqrt price when taking `amount_out` out of the pool.
pub fn get_next_sqrt_price_from_output(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if sqrt_p_x96.is_zero() {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if liquidity == 0 {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_out, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const PRICE_1_1: &str = "79228162514264337593543950336";

    #[test]
    fn next_price_from_input_validation() {
        let result =
            get_next_sqrt_price_from_input(U256::ZERO, 0, U256::from(1e17 as u128), false);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::SqrtPriceIsZero))
        ));

        let result =
            get_next_sqrt_price_from_input(U256::ONE, 0, U256::from(1e17 as u128), true);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::LiquidityIsZero))
        ));
    }

    #[test]
    fn next_price_from_input_overflow_and_underflow() {
        // input amount overflows the price
        let result = get_next_sqrt_price_from_input(U160_MAX, 1024, U256::from(1024), false);
        assert!(matches!(result, Err(Error::MathError(MathError::Overflow))));

        // any input amount cannot underflow the price
        let result = get_next_sqrt_price_from_input(
            U256::ONE,
            1,
            U256::from_str(
                "57896044618658097711785492504343953926634992332820282019728792003956564819968",
            )
            .unwrap(),
            true,
        );
        assert_eq!(result.unwrap(), U256::ONE);
    }

    #[test]
    fn next_price_from_input_zero_amount_is_identity() {
        let price = U256::from_str(PRICE_1_1).unwrap();
        for zero_for_one in [true, false] {
            let result =
                get_next_sqrt_price_from_input(price, 1e17 as u128, U256::ZERO, zero_for_one);
            assert_eq!(result.unwrap(), price);
        }
    }

    #[test]
    fn next_price_from_input_reference_values() {
        // 0.1 token1 in
        let result = get_next_sqrt_price_from_input(
            U256::from_str(PRICE_1_1).unwrap(),
            1e18 as u128,
            U256::from(1e17 as u128),
            false,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("87150978765690771352898345369").unwrap()
        );

        // 0.1 token0 in
        let result = get_next_sqrt_price_from_input(
            U256::from_str(PRICE_1_1).unwrap(),
            1e18 as u128,
            U256::from(1e17 as u128),
            true,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("72025602285694852357767227579").unwrap()
        );
    }

    #[test]
    fn next_price_from_output_insufficient_reserves() {
        let price = U256::from_str("20282409603651670423947251286016").unwrap();

        // output amount exactly the virtual reserves of token0
        let result = get_next_sqrt_price_from_output(price, 1024, U256::from(4), false);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::InsufficientReserves))
        ));

        // output amount exactly the virtual reserves of token1
        let result = get_next_sqrt_price_from_output(price, 1024, U256::from(262144), true);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::InsufficientReserves))
        ));

        // just below the virtual reserves of token1
        let result = get_next_sqrt_price_from_output(price, 1024, U256::from(262143), true);
        assert_eq!(
            result.unwrap(),
            U256::from_str("77371252455336267181195264").unwrap()
        );
    }

    #[test]
    fn next_price_from_output_reference_values() {
        let result = get_next_sqrt_price_from_output(
            U256::from_str(PRICE_1_1).unwrap(),
            1e18 as u128,
            U256::from(1e17 as u128),
            false,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("88031291682515930659493278152").unwrap()
        );

        let result = get_next_sqrt_price_from_output(
            U256::from_str(PRICE_1_1).unwrap(),
            1e18 as u128,
            U256::from(1e17 as u128),
            true,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("71305346262837903834189555302").unwrap()
        );
    }

    #[test]
    fn amount_0_delta_rounding() {
        let lo = U256::from_str(PRICE_1_1).unwrap();
        let hi = U256::from_str("87150978765690771352898345369").unwrap();

        assert_eq!(
            get_amount_0_delta_base(lo, hi, 0, true).unwrap(),
            U256::ZERO
        );

        let up = get_amount_0_delta_base(lo, hi, 1e18 as u128, true).unwrap();
        assert_eq!(up, U256::from_str("90909090909090910").unwrap());

        let down = get_amount_0_delta_base(lo, hi, 1e18 as u128, false).unwrap();
        assert_eq!(down, up - U256::ONE);
    }

    #[test]
    fn amount_1_delta_rounding() {
        let lo = U256::from_str(PRICE_1_1).unwrap();
        let hi = U256::from_str("87150978765690771352898345369").unwrap();

        let up = get_amount_1_delta_base(lo, hi, 1e18 as u128, true).unwrap();
        assert_eq!(up, U256::from_str("100000000000000000").unwrap());

        let down = get_amount_1_delta_base(lo, hi, 1e18 as u128, false).unwrap();
        assert_eq!(down, up - U256::ONE);
    }

    #[test]
    fn signed_deltas_negate_for_negative_liquidity() {
        let lo = U256::from_str(PRICE_1_1).unwrap();
        let hi = U256::from_str("87150978765690771352898345369").unwrap();

        let pos0 = get_amount_0_delta(lo, hi, 1e18 as i128).unwrap();
        let neg0 = get_amount_0_delta(lo, hi, -(1e18 as i128)).unwrap();
        assert!(pos0 > I256::ZERO);
        assert!(neg0 < I256::ZERO);
        // opposite rounding directions differ by at most one unit
        assert_eq!(pos0 + neg0, I256::ONE);

        let pos1 = get_amount_1_delta(lo, hi, 1e18 as i128).unwrap();
        let neg1 = get_amount_1_delta(lo, hi, -(1e18 as i128)).unwrap();
        assert!(pos1 > I256::ZERO);
        assert!(neg1 < I256::ZERO);
    }

    #[test]
    fn swap_computation_round_trip() {
        let sqrt_price =
            U256::from_str("1025574284609383690408304870162715216695788925244").unwrap();
        let liquidity = 50015962439936049619261659728067971248u128;
        let amount_in = U256::from(406);

        let sqrt_q =
            get_next_sqrt_price_from_input(sqrt_price, liquidity, amount_in, true).unwrap();
        assert_eq!(
            sqrt_q,
            U256::from_str("1025574284609383582644711336373707553698163132913").unwrap()
        );

        let amount_0 = get_amount_0_delta_base(sqrt_q, sqrt_price, liquidity, true).unwrap();
        assert_eq!(amount_0, U256::from(406));
    }
}
