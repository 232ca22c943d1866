use crate::error::{Error, MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::tick_math::{MAX_TICK, MIN_TICK};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-tick record. A tick exists in the book only while some position
/// references it as a boundary (`liquidity_gross > 0`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub index: i32,
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,
}

impl Tick {
    pub fn new(index: i32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Applies a liquidity delta to this tick as the lower (`upper ==
    /// false`) or upper boundary of a position.
    ///
    /// On first initialization of a tick at or below the current tick, the
    /// outside fee growth is seeded from the globals; above, it stays zero.
    /// Returns whether the tick flipped between referenced and
    /// unreferenced.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        tick_current: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity_per_tick: u128,
    ) -> Result<bool, Error> {
        let liquidity_gross_before = self.liquidity_gross;
        let liquidity_gross_after = add_delta(liquidity_gross_before, liquidity_delta)?;

        if liquidity_gross_after > max_liquidity_per_tick {
            return Err(PoolError::LiquidityOverflow.into());
        }

        let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

        if liquidity_gross_before == 0 && self.index <= tick_current {
            // all prior fee growth is attributed to the side below
            self.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
            self.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
        }

        self.liquidity_gross = liquidity_gross_after;
        self.liquidity_net = if upper {
            self.liquidity_net
                .checked_sub(liquidity_delta)
                .ok_or(MathError::Overflow)?
        } else {
            self.liquidity_net
                .checked_add(liquidity_delta)
                .ok_or(MathError::Overflow)?
        };

        Ok(flipped)
    }

    /// Crosses this tick: flips `fee_growth_outside` to the other side of
    /// the boundary (wrapping subtraction is intentional) and returns the
    /// net liquidity to apply.
    pub fn cross(
        &mut self,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> i128 {
        self.fee_growth_outside_0_x128 =
            fee_growth_global_0_x128.wrapping_sub(self.fee_growth_outside_0_x128);
        self.fee_growth_outside_1_x128 =
            fee_growth_global_1_x128.wrapping_sub(self.fee_growth_outside_1_x128);
        self.liquidity_net
    }
}

/// Derives the per-tick ceiling on `liquidity_gross` from the tick spacing:
/// the full u128 range divided evenly over every addressable tick.
pub fn tick_spacing_to_max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    u128::MAX / num_ticks
}

/// Sparse, ordered book of initialized ticks.
///
/// The original contract keeps a compressed bitmap per 256-tick word; for
/// replay an ordered map gives the same next-initialized-tick queries while
/// also tolerating misaligned ticks observed on chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickManager {
    ticks: BTreeMap<i32, Tick>,
}

impl TickManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: i32) -> Option<&Tick> {
        self.ticks.get(&index)
    }

    pub fn get_mut(&mut self, index: i32) -> Option<&mut Tick> {
        self.ticks.get_mut(&index)
    }

    /// Returns the tick at `index`, materializing a zeroed record on first
    /// reference.
    pub fn get_or_create(&mut self, index: i32) -> &mut Tick {
        self.ticks.entry(index).or_insert_with(|| Tick::new(index))
    }

    /// Removes a tick that flipped to zero gross liquidity.
    pub fn clear(&mut self, index: i32) {
        self.ticks.remove(&index);
    }

    /// Drops a tick that exists but carries no liquidity. Used to roll
    /// back ticks materialized by an update that then failed.
    pub fn prune_if_empty(&mut self, index: i32) {
        if let Some(tick) = self.ticks.get(&index) {
            if tick.liquidity_gross == 0 {
                self.ticks.remove(&index);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i32, &Tick)> {
        self.ticks.iter()
    }

    pub(crate) fn inner(&self) -> &BTreeMap<i32, Tick> {
        &self.ticks
    }

    pub(crate) fn from_inner(ticks: BTreeMap<i32, Tick>) -> Self {
        Self { ticks }
    }

    /// Finds the next initialized tick addressable at the given spacing:
    /// the largest initialized multiple of `tick_spacing` strictly below
    /// `from` when `zero_for_one`, the smallest strictly above otherwise.
    ///
    /// Returns the clamped tick-range boundary with `initialized == false`
    /// when no such tick exists. Misaligned ticks in the book are skipped.
    pub fn next_initialized_tick(
        &self,
        from: i32,
        tick_spacing: i32,
        zero_for_one: bool,
    ) -> (i32, bool) {
        if zero_for_one {
            self.ticks
                .range(..from)
                .rev()
                .find(|(index, _)| *index % tick_spacing == 0)
                .map(|(index, _)| (*index, true))
                .unwrap_or((MIN_TICK, false))
        } else {
            self.ticks
                .range(from + 1..)
                .find(|(index, _)| *index % tick_spacing == 0)
                .map(|(index, _)| (*index, true))
                .unwrap_or((MAX_TICK, false))
        }
    }

    /// Fee growth accumulated inside `[lower, upper)` per unit of
    /// liquidity, in Q128.128. Absent boundary ticks contribute zero
    /// outside-growth; the subtraction wraps by design.
    pub fn fee_growth_inside(
        &self,
        lower: i32,
        upper: i32,
        tick_current: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> (U256, U256) {
        let outside = |index: i32| -> (U256, U256) {
            self.ticks
                .get(&index)
                .map(|tick| {
                    (
                        tick.fee_growth_outside_0_x128,
                        tick.fee_growth_outside_1_x128,
                    )
                })
                .unwrap_or_default()
        };

        let (lower_outside_0, lower_outside_1) = outside(lower);
        let (upper_outside_0, upper_outside_1) = outside(upper);

        let (below_0, below_1) = if tick_current >= lower {
            (lower_outside_0, lower_outside_1)
        } else {
            (
                fee_growth_global_0_x128.wrapping_sub(lower_outside_0),
                fee_growth_global_1_x128.wrapping_sub(lower_outside_1),
            )
        };

        let (above_0, above_1) = if tick_current < upper {
            (upper_outside_0, upper_outside_1)
        } else {
            (
                fee_growth_global_0_x128.wrapping_sub(upper_outside_0),
                fee_growth_global_1_x128.wrapping_sub(upper_outside_1),
            )
        };

        (
            fee_growth_global_0_x128
                .wrapping_sub(below_0)
                .wrapping_sub(above_0),
            fee_growth_global_1_x128
                .wrapping_sub(below_1)
                .wrapping_sub(above_1),
        )
    }
}
