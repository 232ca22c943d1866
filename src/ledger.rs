use crate::Q128;
use crate::error::{Error, LedgerError, MathError, PoolError};
use crate::hash::{FastMap, FastSet};
use crate::math::math_helpers::mul_div;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A position held through the NFT position manager, keyed by token id.
///
/// Pool and tick range are fixed for the life of the token; only ownership,
/// liquidity, and owed balances change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPosition {
    pub token_id: u64,
    pub owner: Address,
    pub pool: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    pub tokens_owed_0: U256,
    pub tokens_owed_1: U256,
}

impl TokenPosition {
    pub fn new(
        token_id: u64,
        owner: Address,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Self {
        Self {
            token_id,
            owner,
            pool,
            tick_lower,
            tick_upper,
            liquidity: 0,
            fee_growth_inside_0_last_x128: U256::ZERO,
            fee_growth_inside_1_last_x128: U256::ZERO,
            tokens_owed_0: U256::ZERO,
            tokens_owed_1: U256::ZERO,
        }
    }

    /// Accrues fees earned since the last snapshot and records the new one.
    fn accrue(
        &mut self,
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

        self.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
        self.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;
        self.tokens_owed_0 += owed_0;
        self.tokens_owed_1 += owed_1;
        Ok(())
    }

    pub fn increase_liquidity(
        &mut self,
        liquidity_delta: u128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), Error> {
        self.accrue(fee_growth_inside_0_x128, fee_growth_inside_1_x128)?;
        self.liquidity = self
            .liquidity
            .checked_add(liquidity_delta)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Removes liquidity and credits the withdrawn principal to the owed
    /// balances.
    pub fn decrease_liquidity(
        &mut self,
        liquidity_delta: u128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
        amount0: U256,
        amount1: U256,
    ) -> Result<(), Error> {
        if liquidity_delta > self.liquidity {
            return Err(PoolError::LiquidityUnderflow.into());
        }
        self.accrue(fee_growth_inside_0_x128, fee_growth_inside_1_x128)?;
        self.liquidity -= liquidity_delta;
        self.tokens_owed_0 += amount0;
        self.tokens_owed_1 += amount1;
        Ok(())
    }

    /// Pays out up to the requested amounts, clamped at what is owed.
    pub fn collect(&mut self, amount0_requested: U256, amount1_requested: U256) -> (U256, U256) {
        let amount0 = amount0_requested.min(self.tokens_owed_0);
        let amount1 = amount1_requested.min(self.tokens_owed_1);
        self.tokens_owed_0 -= amount0;
        self.tokens_owed_1 -= amount1;
        (amount0, amount1)
    }

    pub fn is_empty(&self) -> bool {
        self.liquidity == 0 && self.tokens_owed_0.is_zero() && self.tokens_owed_1.is_zero()
    }
}

/// NFT-keyed position ledger with owner and pool lookup indices.
///
/// The indices are exact inverses of the position map; positions persist
/// indefinitely, even when emptied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPositionLedger {
    positions: FastMap<u64, TokenPosition>,
    by_owner: FastMap<Address, FastSet<u64>>,
    by_pool: FastMap<Address, FastSet<u64>>,
}

impl TokenPositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, token_id: u64) -> Option<&TokenPosition> {
        self.positions.get(&token_id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn token_ids_by_owner(&self, owner: Address) -> impl Iterator<Item = u64> + '_ {
        self.by_owner.get(&owner).into_iter().flatten().copied()
    }

    pub fn token_ids_by_pool(&self, pool: Address) -> impl Iterator<Item = u64> + '_ {
        self.by_pool.get(&pool).into_iter().flatten().copied()
    }

    pub fn positions_by_owner(&self, owner: Address) -> Vec<&TokenPosition> {
        self.token_ids_by_owner(owner)
            .filter_map(|token_id| self.positions.get(&token_id))
            .collect()
    }

    pub fn positions_by_pool(&self, pool: Address) -> Vec<&TokenPosition> {
        self.token_ids_by_pool(pool)
            .filter_map(|token_id| self.positions.get(&token_id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &TokenPosition)> {
        self.positions.iter()
    }

    fn create(
        &mut self,
        token_id: u64,
        owner: Address,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
    ) -> &mut TokenPosition {
        self.by_owner.entry(owner).or_default().insert(token_id);
        self.by_pool.entry(pool).or_default().insert(token_id);
        self.positions
            .entry(token_id)
            .or_insert_with(|| TokenPosition::new(token_id, owner, pool, tick_lower, tick_upper))
    }

    fn get_mut(&mut self, token_id: u64) -> Result<&mut TokenPosition, Error> {
        self.positions
            .get_mut(&token_id)
            .ok_or_else(|| LedgerError::PositionNotFound(token_id.to_string()).into())
    }

    /// Mint of a new token id, or a liquidity top-up when the id already
    /// exists (re-delivered streams).
    pub fn handle_mint(
        &mut self,
        token_id: u64,
        owner: Address,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), Error> {
        self.create(token_id, owner, pool, tick_lower, tick_upper)
            .increase_liquidity(amount, fee_growth_inside_0_x128, fee_growth_inside_1_x128)
    }

    pub fn handle_increase_liquidity(
        &mut self,
        token_id: u64,
        liquidity: u128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), Error> {
        self.get_mut(token_id)?.increase_liquidity(
            liquidity,
            fee_growth_inside_0_x128,
            fee_growth_inside_1_x128,
        )
    }

    pub fn handle_decrease_liquidity(
        &mut self,
        token_id: u64,
        liquidity: u128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
        amount0: U256,
        amount1: U256,
    ) -> Result<(), Error> {
        self.get_mut(token_id)?.decrease_liquidity(
            liquidity,
            fee_growth_inside_0_x128,
            fee_growth_inside_1_x128,
            amount0,
            amount1,
        )
    }

    pub fn handle_collect(
        &mut self,
        token_id: u64,
        amount0_requested: U256,
        amount1_requested: U256,
    ) -> Result<(U256, U256), Error> {
        Ok(self
            .get_mut(token_id)?
            .collect(amount0_requested, amount1_requested))
    }

    /// Ownership transfer. Transfers from or to the zero address are the
    /// mint/burn of the NFT itself and are ignored here.
    pub fn handle_transfer(&mut self, token_id: u64, from: Address, to: Address) -> Result<(), Error> {
        if from.is_zero() || to.is_zero() {
            return Ok(());
        }

        let position = self.get_mut(token_id)?;
        if position.owner != from {
            let owner = position.owner;
            return Err(LedgerError::OwnershipMismatch {
                token_id,
                owner,
                from,
            }
            .into());
        }
        position.owner = to;

        if let Some(tokens) = self.by_owner.get_mut(&from) {
            tokens.remove(&token_id);
            if tokens.is_empty() {
                self.by_owner.remove(&from);
            }
        }
        self.by_owner.entry(to).or_default().insert(token_id);
        Ok(())
    }

    pub(crate) fn insert_restored(&mut self, position: TokenPosition) {
        self.by_owner
            .entry(position.owner)
            .or_default()
            .insert(position.token_id);
        self.by_pool
            .entry(position.pool)
            .or_default()
            .insert(position.token_id);
        self.positions.insert(position.token_id, position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const OWNER_A: Address = address!("0x00000000000000000000000000000000000000aa");
    const OWNER_B: Address = address!("0x00000000000000000000000000000000000000bb");
    const POOL: Address = address!("0x1000000000000000000000000000000000000000");

    fn ledger_with_position() -> TokenPositionLedger {
        let mut ledger = TokenPositionLedger::new();
        ledger
            .handle_mint(1, OWNER_A, POOL, -60, 60, 1000, U256::ZERO, U256::ZERO)
            .unwrap();
        ledger
    }

    #[test]
    fn mint_creates_position_and_indices() {
        let ledger = ledger_with_position();

        let position = ledger.position(1).unwrap();
        assert_eq!(position.owner, OWNER_A);
        assert_eq!(position.pool, POOL);
        assert_eq!(position.liquidity, 1000);

        assert_eq!(ledger.token_ids_by_owner(OWNER_A).collect::<Vec<_>>(), [1]);
        assert_eq!(ledger.token_ids_by_pool(POOL).collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn mint_of_existing_token_tops_up() {
        let mut ledger = ledger_with_position();
        ledger
            .handle_mint(1, OWNER_A, POOL, -60, 60, 500, U256::ZERO, U256::ZERO)
            .unwrap();
        assert_eq!(ledger.position(1).unwrap().liquidity, 1500);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn increase_accrues_fees_at_snapshot() {
        let mut ledger = ledger_with_position();
        // 1000 liquidity at one full fee unit per unit of liquidity
        ledger
            .handle_increase_liquidity(1, 500, Q128, U256::ZERO)
            .unwrap();

        let position = ledger.position(1).unwrap();
        assert_eq!(position.liquidity, 1500);
        assert_eq!(position.tokens_owed_0, U256::from(1000u64));
        assert_eq!(position.fee_growth_inside_0_last_x128, Q128);
    }

    #[test]
    fn decrease_credits_principal_and_fees() {
        let mut ledger = ledger_with_position();
        ledger
            .handle_decrease_liquidity(
                1,
                400,
                Q128,
                U256::ZERO,
                U256::from(77u64),
                U256::from(88u64),
            )
            .unwrap();

        let position = ledger.position(1).unwrap();
        assert_eq!(position.liquidity, 600);
        assert_eq!(position.tokens_owed_0, U256::from(1000u64 + 77u64));
        assert_eq!(position.tokens_owed_1, U256::from(88u64));
    }

    #[test]
    fn decrease_beyond_liquidity_underflows() {
        let mut ledger = ledger_with_position();
        let result = ledger.handle_decrease_liquidity(
            1,
            2000,
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
        );
        assert_eq!(result, Err(PoolError::LiquidityUnderflow.into()));
    }

    #[test]
    fn collect_clamps_and_missing_position_errors() {
        let mut ledger = ledger_with_position();
        ledger
            .handle_decrease_liquidity(
                1,
                1000,
                U256::ZERO,
                U256::ZERO,
                U256::from(30u64),
                U256::from(10u64),
            )
            .unwrap();

        let (out0, out1) = ledger
            .handle_collect(1, U256::from(100u64), U256::from(5u64))
            .unwrap();
        assert_eq!(out0, U256::from(30u64));
        assert_eq!(out1, U256::from(5u64));

        assert!(matches!(
            ledger.handle_collect(2, U256::ZERO, U256::ZERO),
            Err(Error::LedgerError(LedgerError::PositionNotFound(_)))
        ));
    }

    #[test]
    fn transfer_moves_ownership_and_indices() {
        let mut ledger = ledger_with_position();
        ledger.handle_transfer(1, OWNER_A, OWNER_B).unwrap();

        let position = ledger.position(1).unwrap();
        assert_eq!(position.owner, OWNER_B);
        assert_eq!(position.liquidity, 1000);

        assert!(ledger.token_ids_by_owner(OWNER_A).next().is_none());
        assert_eq!(ledger.token_ids_by_owner(OWNER_B).collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn transfer_from_or_to_zero_address_is_ignored() {
        let mut ledger = ledger_with_position();
        ledger.handle_transfer(1, Address::ZERO, OWNER_B).unwrap();
        ledger.handle_transfer(1, OWNER_A, Address::ZERO).unwrap();
        assert_eq!(ledger.position(1).unwrap().owner, OWNER_A);
    }

    #[test]
    fn transfer_with_wrong_sender_is_rejected_untouched() {
        let mut ledger = ledger_with_position();
        let result = ledger.handle_transfer(1, OWNER_B, OWNER_B);
        assert!(matches!(
            result,
            Err(Error::LedgerError(LedgerError::OwnershipMismatch { .. }))
        ));
        // the failed transfer must not have moved anything
        assert_eq!(ledger.position(1).unwrap().owner, OWNER_A);
        assert_eq!(ledger.token_ids_by_owner(OWNER_A).collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn emptied_positions_persist() {
        let mut ledger = ledger_with_position();
        ledger
            .handle_decrease_liquidity(1, 1000, U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO)
            .unwrap();
        let position = ledger.position(1).unwrap();
        assert!(position.is_empty());
    }
}
