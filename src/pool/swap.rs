use crate::Q128;
use crate::error::{Error, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use crate::pool::core_pool::CorePool;
use alloy_primitives::{I256, U256};
use tracing::trace;

/// Signed token deltas and the final price of a swap, from the pool's
/// perspective (positive amounts flow in).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapResult {
    pub amount0: I256,
    pub amount1: I256,
    pub sqrt_price_x96: U256,
}

// the top level state of the swap, committed to the pool at the end unless
// the run is static
struct SwapState {
    // the amount remaining to be swapped in/out of the input/output asset
    amount_specified_remaining: I256,
    // the amount already swapped out/in of the output/input asset
    amount_calculated: I256,
    // current sqrt(price)
    sqrt_price_x96: U256,
    // the tick associated with the current price
    tick: i32,
    // the current liquidity in range
    liquidity: u128,
    // fee growth of the input token, accumulated across steps
    fee_growth_global_x128: U256,
}

#[derive(Default)]
struct StepComputations {
    sqrt_price_start_x96: U256,
    tick_next: i32,
    initialized: bool,
    sqrt_price_next_x96: U256,
    amount_in: U256,
    amount_out: U256,
    fee_amount: U256,
}

impl CorePool {
    /// Runs the swap state machine against this pool.
    ///
    /// `amount_specified >= 0` is an exact-input swap, negative is exact
    /// output. When `sqrt_price_limit_x96` is absent the swap may run to
    /// the edge of the price range. A static run leaves the pool
    /// untouched; otherwise the resulting state is committed.
    pub fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
        is_static: bool,
    ) -> Result<SwapResult, Error> {
        let sqrt_price_limit_x96 = sqrt_price_limit_x96.unwrap_or(if zero_for_one {
            MIN_SQRT_RATIO + U256::ONE
        } else {
            MAX_SQRT_RATIO - U256::ONE
        });

        if zero_for_one {
            if sqrt_price_limit_x96 <= MIN_SQRT_RATIO {
                return Err(PoolError::PriceLimitOutOfRange.into());
            }
            if sqrt_price_limit_x96 >= self.sqrt_price_x96 {
                return Err(PoolError::PriceLimitWrongSide.into());
            }
        } else {
            if sqrt_price_limit_x96 >= MAX_SQRT_RATIO {
                return Err(PoolError::PriceLimitOutOfRange.into());
            }
            if sqrt_price_limit_x96 <= self.sqrt_price_x96 {
                return Err(PoolError::PriceLimitWrongSide.into());
            }
        }

        let exact_input = amount_specified >= I256::ZERO;

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: self.sqrt_price_x96,
            tick: self.tick_current,
            liquidity: self.liquidity,
            fee_growth_global_x128: if zero_for_one {
                self.fee_growth_global_0_x128
            } else {
                self.fee_growth_global_1_x128
            },
        };

        // Every iteration either exhausts the amount or lands on the next
        // addressable tick towards the limit, so the addressable-tick
        // distance bounds the loop.
        let limit_tick = get_tick_at_sqrt_ratio(sqrt_price_limit_x96)?;
        let max_steps =
            (state.tick.abs_diff(limit_tick) / self.tick_spacing.unsigned_abs()) as u64 + 4;
        let mut steps: u64 = 0;

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            steps += 1;
            if steps > max_steps {
                return Err(PoolError::SwapNonTerminating.into());
            }

            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..StepComputations::default()
            };

            (step.tick_next, step.initialized) =
                self.tick_manager
                    .next_initialized_tick(state.tick, self.tick_spacing, zero_for_one);

            step.tick_next = step.tick_next.clamp(MIN_TICK, MAX_TICK);
            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            let sqrt_price_target_x96 = if zero_for_one {
                step.sqrt_price_next_x96.max(sqrt_price_limit_x96)
            } else {
                step.sqrt_price_next_x96.min(sqrt_price_limit_x96)
            };

            (
                state.sqrt_price_x96,
                step.amount_in,
                step.amount_out,
                step.fee_amount,
            ) = compute_swap_step(
                state.sqrt_price_x96,
                sqrt_price_target_x96,
                state.liquidity,
                state.amount_specified_remaining,
                self.fee_pips,
            )?;

            if exact_input {
                state.amount_specified_remaining -=
                    I256::from_raw(step.amount_in + step.fee_amount);
                state.amount_calculated -= I256::from_raw(step.amount_out);
            } else {
                state.amount_specified_remaining += I256::from_raw(step.amount_out);
                state.amount_calculated += I256::from_raw(step.amount_in + step.fee_amount);
            }

            if state.liquidity > 0 {
                let fee_growth_delta =
                    mul_div(step.fee_amount, Q128, U256::from(state.liquidity))?;
                state.fee_growth_global_x128 =
                    state.fee_growth_global_x128.wrapping_add(fee_growth_delta);
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let tick = self
                        .tick_manager
                        .get_mut(step.tick_next)
                        .ok_or(PoolError::TickLookupFailure(step.tick_next))?;

                    let mut liquidity_net = if is_static {
                        // read-only: crossing must not disturb the book
                        tick.liquidity_net
                    } else if zero_for_one {
                        tick.cross(
                            state.fee_growth_global_x128,
                            self.fee_growth_global_1_x128,
                        )
                    } else {
                        tick.cross(
                            self.fee_growth_global_0_x128,
                            state.fee_growth_global_x128,
                        )
                    };

                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }
                    state.liquidity = add_delta(state.liquidity, liquidity_net)?;
                }

                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }

            trace!(
                tick = state.tick,
                price = %state.sqrt_price_x96,
                amount_in = %step.amount_in,
                amount_out = %step.amount_out,
                fee = %step.fee_amount,
                liquidity = state.liquidity,
                "swap step"
            );
        }

        if !is_static {
            self.sqrt_price_x96 = state.sqrt_price_x96;
            self.tick_current = state.tick;
            self.liquidity = state.liquidity;
            if zero_for_one {
                self.fee_growth_global_0_x128 = state.fee_growth_global_x128;
            } else {
                self.fee_growth_global_1_x128 = state.fee_growth_global_x128;
            }
        }

        let (amount0, amount1) = if zero_for_one == exact_input {
            (
                amount_specified - state.amount_specified_remaining,
                state.amount_calculated,
            )
        } else {
            (
                state.amount_calculated,
                amount_specified - state.amount_specified_remaining,
            )
        };

        Ok(SwapResult {
            amount0,
            amount1,
            sqrt_price_x96: state.sqrt_price_x96,
        })
    }
}
