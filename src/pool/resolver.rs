use crate::error::{Error, ResolveError};
use crate::events::PoolSwapEvent;
use crate::pool::core_pool::CorePool;
use alloy_primitives::{I256, U256};
use tracing::debug;

/// One candidate reconstruction of a swap's input parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapSolution {
    pub amount_specified: I256,
    pub sqrt_price_limit_x96: Option<U256>,
}

fn inc_towards_infinity(amount: I256) -> I256 {
    if amount.is_zero() {
        amount
    } else if amount.is_positive() {
        amount + I256::ONE
    } else {
        amount - I256::ONE
    }
}

impl CorePool {
    /// Replays a candidate input against a copy of the current pool state
    /// and checks the outcome against the observed event, all three values
    /// exact.
    fn dry_run_matches(&mut self, event: &PoolSwapEvent, candidate: SwapSolution) -> bool {
        let zero_for_one = event.amount0.is_positive();

        match self.swap(
            zero_for_one,
            candidate.amount_specified,
            candidate.sqrt_price_limit_x96,
            true,
        ) {
            Ok(result) => {
                result.amount0 == event.amount0
                    && result.amount1 == event.amount1
                    && result.sqrt_price_x96 == event.sqrt_price_x96
            }
            Err(err) => {
                // some candidates are expected to be unworkable
                debug!(%err, block = event.meta.block_number, log = event.meta.log_index,
                    "swap dry run rejected candidate");
                false
            }
        }
    }

    /// Recovers the `(amount_specified, price_limit)` input that produced
    /// an observed swap event, by confirming candidates against a static
    /// replay in a fixed order:
    ///
    /// 1. `amount0` unlimited, 2. `amount1` unlimited, 3./4. the amounts
    /// with the after-price as limit (nudged away from zero when the event
    /// reports no liquidity), 5. the unadjusted limited pair when the
    /// event carries the `-1` liquidity sentinel.
    pub fn resolve_swap_input(&mut self, event: &PoolSwapEvent) -> Result<SwapSolution, Error> {
        let mut candidates: Vec<SwapSolution> = vec![
            SwapSolution {
                amount_specified: event.amount0,
                sqrt_price_limit_x96: None,
            },
            SwapSolution {
                amount_specified: event.amount1,
                sqrt_price_limit_x96: None,
            },
        ];

        let limited = |amount: I256| SwapSolution {
            amount_specified: if event.liquidity == 0 {
                inc_towards_infinity(amount)
            } else {
                amount
            },
            sqrt_price_limit_x96: Some(event.sqrt_price_x96),
        };
        candidates.push(limited(event.amount0));
        candidates.push(limited(event.amount1));

        if event.liquidity == -1 {
            candidates.push(SwapSolution {
                amount_specified: event.amount0,
                sqrt_price_limit_x96: Some(event.sqrt_price_x96),
            });
            candidates.push(SwapSolution {
                amount_specified: event.amount1,
                sqrt_price_limit_x96: Some(event.sqrt_price_x96),
            });
        }

        for (index, candidate) in candidates.into_iter().enumerate() {
            if self.dry_run_matches(event, candidate) {
                debug!(
                    candidate = index,
                    block = event.meta.block_number,
                    log = event.meta.log_index,
                    "resolved swap input"
                );
                return Ok(candidate);
            }
        }

        Err(ResolveError::SwapUnresolvable {
            block_number: event.meta.block_number,
            log_index: event.meta.log_index,
        }
        .into())
    }
}
