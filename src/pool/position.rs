use crate::Q128;
use crate::error::{Error, LedgerError, MathError, PoolError};
use crate::hash::FastMap;
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Identity of a pool-level position: owner plus tick range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PositionKey {
    pub fn new(owner: impl Into<String>, tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            owner: owner.into(),
            tick_lower,
            tick_upper,
        }
    }

    /// Stable textual form, used to order positions in snapshots.
    pub fn as_storage_key(&self) -> String {
        format!("{}:{}:{}", self.owner, self.tick_lower, self.tick_upper)
    }
}

/// A liquidity provision keyed by (owner, range). Persists at zero
/// liquidity for history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    pub tokens_owed_0: U256,
    pub tokens_owed_1: U256,
}

impl Position {
    /// Accrues fees against the supplied fee-growth-inside values, then
    /// applies the liquidity delta. A zero delta is a pure poke: accrual
    /// still happens.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), Error> {
        let owed_0 = mul_div(
            fee_growth_inside_0_x128.wrapping_sub(self.fee_growth_inside_0_last_x128),
            U256::from(self.liquidity),
            Q128,
        )?;
        let owed_1 = mul_div(
            fee_growth_inside_1_x128.wrapping_sub(self.fee_growth_inside_1_last_x128),
            U256::from(self.liquidity),
            Q128,
        )?;

        self.liquidity = add_delta(self.liquidity, liquidity_delta).map_err(|e| match e {
            MathError::Underflow => Error::PoolError(PoolError::LiquidityUnderflow),
            other => Error::MathError(other),
        })?;
        self.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
        self.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;

        self.tokens_owed_0 += owed_0;
        self.tokens_owed_1 += owed_1;
        Ok(())
    }

    /// Credits withdrawn principal to the owed balances (burn path).
    pub fn credit_owed(&mut self, amount_0: U256, amount_1: U256) {
        self.tokens_owed_0 += amount_0;
        self.tokens_owed_1 += amount_1;
    }

    /// Pays out up to the requested amounts, clamped at what is owed.
    pub fn collect(&mut self, amount_0_requested: U256, amount_1_requested: U256) -> (U256, U256) {
        let amount_0 = amount_0_requested.min(self.tokens_owed_0);
        let amount_1 = amount_1_requested.min(self.tokens_owed_1);

        self.tokens_owed_0 -= amount_0;
        self.tokens_owed_1 -= amount_1;

        (amount_0, amount_1)
    }
}

/// Keyed store of pool-level positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionManager {
    positions: FastMap<PositionKey, Position>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Read-only view used for the burn underflow precheck: absent
    /// positions read as zeroed.
    pub fn get_readonly(&self, key: &PositionKey) -> Position {
        self.positions.get(key).cloned().unwrap_or_default()
    }

    pub fn get_or_create(&mut self, key: PositionKey) -> &mut Position {
        self.positions.entry(key).or_default()
    }

    /// Collect on an existing position; absent positions cannot owe
    /// anything and are reported as not found.
    pub fn collect(
        &mut self,
        owner: &str,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: U256,
        amount_1_requested: U256,
    ) -> Result<(U256, U256), Error> {
        let key = PositionKey::new(owner, tick_lower, tick_upper);
        let position = self
            .positions
            .get_mut(&key)
            .ok_or_else(|| LedgerError::PositionNotFound(key.as_storage_key()))?;
        Ok(position.collect(amount_0_requested, amount_1_requested))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub(crate) fn insert(&mut self, key: PositionKey, position: Position) {
        self.positions.insert(key, position);
    }
}
