use crate::error::{Error, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::tick_math::{MAX_TICK, MIN_TICK, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio};
use crate::pool::position::{Position, PositionKey, PositionManager};
use crate::pool::tick::{TickManager, tick_spacing_to_max_liquidity_per_tick};
use alloy_primitives::{Address, I256, U256};

/// The conventional fee tiers and their tick spacings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeAmount {
    Low,
    Medium,
    High,
}

impl FeeAmount {
    /// Fee in hundredths of a basis point.
    pub fn fee_pips(self) -> u32 {
        match self {
            FeeAmount::Low => 500,
            FeeAmount::Medium => 3000,
            FeeAmount::High => 10000,
        }
    }

    pub fn tick_spacing(self) -> i32 {
        match self {
            FeeAmount::Low => 10,
            FeeAmount::Medium => 60,
            FeeAmount::High => 200,
        }
    }
}

/// Immutable pool parameters, fixed at deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub token0: Address,
    pub token1: Address,
    pub fee_pips: u32,
    pub tick_spacing: i32,
}

impl PoolConfig {
    pub fn new(token0: Address, token1: Address, fee: FeeAmount) -> Self {
        Self {
            token0,
            token1,
            fee_pips: fee.fee_pips(),
            tick_spacing: fee.tick_spacing(),
        }
    }
}

/// Full replayed state of one concentrated-liquidity pool.
///
/// All mutating operations are strictly sequential; the struct is cloned
/// wholesale when a speculative copy is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorePool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee_pips: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
    /// Zero while the pool is uninitialized.
    pub sqrt_price_x96: U256,
    pub tick_current: i32,
    /// In-range liquidity.
    pub liquidity: u128,
    pub fee_growth_global_0_x128: U256,
    pub fee_growth_global_1_x128: U256,
    pub tick_manager: TickManager,
    pub position_manager: PositionManager,
}

impl CorePool {
    pub fn new(address: Address, config: PoolConfig) -> Self {
        Self {
            address,
            token0: config.token0,
            token1: config.token1,
            fee_pips: config.fee_pips,
            tick_spacing: config.tick_spacing,
            max_liquidity_per_tick: tick_spacing_to_max_liquidity_per_tick(config.tick_spacing),
            sqrt_price_x96: U256::ZERO,
            tick_current: 0,
            liquidity: 0,
            fee_growth_global_0_x128: U256::ZERO,
            fee_growth_global_1_x128: U256::ZERO,
            tick_manager: TickManager::new(),
            position_manager: PositionManager::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.sqrt_price_x96.is_zero()
    }

    /// Sets the starting price; permitted exactly once.
    pub fn initialize(&mut self, sqrt_price_x96: U256) -> Result<(), Error> {
        if self.is_initialized() {
            return Err(PoolError::AlreadyInitialized.into());
        }
        self.tick_current = get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        self.sqrt_price_x96 = sqrt_price_x96;
        Ok(())
    }

    /// Adds `amount` liquidity to `(owner, tick_lower, tick_upper)`,
    /// returning the token amounts the pool pulls in.
    pub fn mint(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<(I256, I256), Error> {
        if amount == 0 {
            return Err(PoolError::TickRangeInvalid.into());
        }
        let delta = i128::try_from(amount).map_err(|_| PoolError::TickRangeInvalid)?;

        let (_, amount_0, amount_1) =
            self.modify_position(owner, tick_lower, tick_upper, delta)?;
        Ok((amount_0, amount_1))
    }

    /// Removes `amount` liquidity, crediting the withdrawn tokens to the
    /// position's owed balances. Returns the (positive) amounts released.
    pub fn burn(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<(I256, I256), Error> {
        let delta = i128::try_from(amount)
            .map_err(|_| PoolError::TickRangeInvalid)?
            .checked_neg()
            .ok_or(PoolError::TickRangeInvalid)?;
        let (key, amount_0, amount_1) = self.modify_position(owner, tick_lower, tick_upper, delta)?;

        let amount_0 = -amount_0;
        let amount_1 = -amount_1;
        if amount_0.is_positive() || amount_1.is_positive() {
            let position = self.position_manager.get_or_create(key);
            position.credit_owed(
                amount_0.max(I256::ZERO).into_raw(),
                amount_1.max(I256::ZERO).into_raw(),
            );
        }
        Ok((amount_0, amount_1))
    }

    /// Pays out owed tokens, clamped at the requested amounts.
    pub fn collect(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: U256,
        amount_1_requested: U256,
    ) -> Result<(U256, U256), Error> {
        self.check_ticks(tick_lower, tick_upper)?;
        self.position_manager.collect(
            owner,
            tick_lower,
            tick_upper,
            amount_0_requested,
            amount_1_requested,
        )
    }

    fn check_ticks(&self, tick_lower: i32, tick_upper: i32) -> Result<(), Error> {
        if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(PoolError::TickRangeInvalid.into());
        }
        Ok(())
    }

    /// Shared mint/burn path: updates ticks and the position, then
    /// computes the token deltas for the current price.
    fn modify_position(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(PositionKey, I256, I256), Error> {
        self.check_ticks(tick_lower, tick_upper)?;

        let key = PositionKey::new(owner, tick_lower, tick_upper);
        if liquidity_delta < 0 {
            let view = self.position_manager.get_readonly(&key);
            if view.liquidity < liquidity_delta.unsigned_abs() {
                return Err(PoolError::LiquidityUnderflow.into());
            }
        }

        self.update_position(&key, liquidity_delta)?;

        let mut amount_0 = I256::ZERO;
        let mut amount_1 = I256::ZERO;
        if liquidity_delta != 0 {
            if self.tick_current < tick_lower {
                // the position is entirely above the current price: it is
                // all token0
                amount_0 = get_amount_0_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
            } else if self.tick_current < tick_upper {
                amount_0 = get_amount_0_delta(
                    self.sqrt_price_x96,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
                amount_1 = get_amount_1_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    self.sqrt_price_x96,
                    liquidity_delta,
                )?;
                self.liquidity = add_delta(self.liquidity, liquidity_delta)?;
            } else {
                amount_1 = get_amount_1_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
            }
        }

        Ok((key, amount_0, amount_1))
    }

    fn update_position(&mut self, key: &PositionKey, liquidity_delta: i128) -> Result<(), Error> {
        let mut flipped_lower = false;
        let mut flipped_upper = false;

        if liquidity_delta != 0 {
            match self.apply_tick_updates(key, liquidity_delta) {
                Ok((lower, upper)) => {
                    flipped_lower = lower;
                    flipped_upper = upper;
                }
                Err(err) => {
                    // a failed update must not leave behind the empty
                    // ticks it may have materialized
                    self.tick_manager.prune_if_empty(key.tick_lower);
                    self.tick_manager.prune_if_empty(key.tick_upper);
                    return Err(err);
                }
            }
        }

        let (fee_growth_inside_0, fee_growth_inside_1) = self.tick_manager.fee_growth_inside(
            key.tick_lower,
            key.tick_upper,
            self.tick_current,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
        );

        self.position_manager.get_or_create(key.clone()).update(
            liquidity_delta,
            fee_growth_inside_0,
            fee_growth_inside_1,
        )?;

        if liquidity_delta < 0 {
            if flipped_lower {
                self.tick_manager.clear(key.tick_lower);
            }
            if flipped_upper {
                self.tick_manager.clear(key.tick_upper);
            }
        }
        Ok(())
    }

    fn apply_tick_updates(
        &mut self,
        key: &PositionKey,
        liquidity_delta: i128,
    ) -> Result<(bool, bool), Error> {
        let flipped_lower = self.tick_manager.get_or_create(key.tick_lower).update(
            liquidity_delta,
            self.tick_current,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
            false,
            self.max_liquidity_per_tick,
        )?;
        let flipped_upper = self.tick_manager.get_or_create(key.tick_upper).update(
            liquidity_delta,
            self.tick_current,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
            true,
            self.max_liquidity_per_tick,
        )?;
        Ok((flipped_lower, flipped_upper))
    }

    /// Fee growth accumulated inside a range at the current state, as the
    /// NFT ledger snapshots it.
    pub fn fee_growth_inside(&self, tick_lower: i32, tick_upper: i32) -> (U256, U256) {
        self.tick_manager.fee_growth_inside(
            tick_lower,
            tick_upper,
            self.tick_current,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
        )
    }

    /// Positional view used by tests and invariant checks: the sum of net
    /// liquidity at or below the current tick.
    pub fn liquidity_below_current(&self) -> i128 {
        self.tick_manager
            .iter()
            .take_while(|(index, _)| **index <= self.tick_current)
            .map(|(_, tick)| tick.liquidity_net)
            .sum()
    }

    pub fn position(&self, owner: &str, tick_lower: i32, tick_upper: i32) -> Option<&Position> {
        self.position_manager
            .get(&PositionKey::new(owner, tick_lower, tick_upper))
    }
}
