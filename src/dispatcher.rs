use crate::error::Error;
use crate::events::{Event, NftEvent, PoolEvent};
use crate::hash::FastMap;
use crate::ledger::TokenPositionLedger;
use crate::pool::core_pool::CorePool;
use crate::snapshot::{SimulationSnapshot, SnapshotSink};
use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

/// Storage key for the NFT ledger in the snapshot sink; pools are keyed by
/// their address.
const LEDGER_KEY: &str = "token-positions";

/// How the dispatcher reacts to recoverable event-application errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Log recoverable errors and keep consuming the stream. Errors that
    /// indicate a broken arithmetic invariant still surface.
    #[default]
    Tolerant,
    /// Surface every error to the caller.
    Strict,
}

/// Single-threaded consumer of the decoded event stream.
///
/// Events must arrive in canonical block/log order, with the pool-level
/// events of a transaction before its NFT-manager events: the ledger
/// snapshots pool fee growth at application time.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    pools: FastMap<Address, CorePool>,
    ledger: TokenPositionLedger,
    policy: DispatchPolicy,
}

impl EventDispatcher {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self {
            pools: FastMap::default(),
            ledger: TokenPositionLedger::new(),
            policy,
        }
    }

    /// Registers a pool so its events can be routed to it.
    pub fn register_pool(&mut self, pool: CorePool) {
        self.pools.insert(pool.address, pool);
    }

    pub fn pool(&self, address: Address) -> Option<&CorePool> {
        self.pools.get(&address)
    }

    pub fn ledger(&self) -> &TokenPositionLedger {
        &self.ledger
    }

    /// Routes one event. Under the tolerant policy, recoverable
    /// application errors are logged and the event is skipped; errors that
    /// mean the replay itself is broken always surface.
    pub fn dispatch(&mut self, event: &Event) -> Result<(), Error> {
        let result = match event {
            Event::Pool(pool_event) => self.apply_pool_event(pool_event),
            Event::Nft(nft_event) => self.apply_nft_event(nft_event),
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) if self.policy == DispatchPolicy::Tolerant && !err.is_fatal() => {
                let meta = event.meta();
                warn!(%err, block = meta.block_number, log = meta.log_index, "skipping event");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Consumes a whole stream in order.
    pub fn dispatch_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> Result<(), Error> {
        for event in events {
            self.dispatch(event)?;
        }
        Ok(())
    }

    fn apply_pool_event(&mut self, event: &PoolEvent) -> Result<(), Error> {
        let Some(pool) = self.pools.get_mut(&event.pool()) else {
            // events for pools outside the registry are not ours to replay
            warn!(pool = %event.pool(), "event for unregistered pool");
            return Ok(());
        };

        match event {
            PoolEvent::Initialize(event) => pool.initialize(event.sqrt_price_x96),
            PoolEvent::Mint(event) => pool
                .mint(
                    &event.owner,
                    event.tick_lower,
                    event.tick_upper,
                    event.amount,
                )
                .map(|_| ()),
            PoolEvent::Burn(event) => pool
                .burn(
                    &event.owner,
                    event.tick_lower,
                    event.tick_upper,
                    event.amount,
                )
                .map(|_| ()),
            PoolEvent::Collect(event) => pool
                .collect(
                    &event.owner,
                    event.tick_lower,
                    event.tick_upper,
                    event.amount0,
                    event.amount1,
                )
                .map(|_| ()),
            PoolEvent::Swap(event) => {
                let solution = pool.resolve_swap_input(event)?;
                let zero_for_one = event.amount0.is_positive();
                let result = pool.swap(
                    zero_for_one,
                    solution.amount_specified,
                    solution.sqrt_price_limit_x96,
                    false,
                )?;
                debug!(
                    pool = %event.pool,
                    amount0 = %result.amount0,
                    amount1 = %result.amount1,
                    "applied swap"
                );
                Ok(())
            }
        }
    }

    fn apply_nft_event(&mut self, event: &NftEvent) -> Result<(), Error> {
        match event {
            NftEvent::Mint(event) => {
                let Some(pool) = self.pools.get(&event.pool) else {
                    warn!(pool = %event.pool, token = event.token_id,
                        "NFT mint for unregistered pool");
                    return Ok(());
                };
                let (fee_growth_inside_0, fee_growth_inside_1) =
                    pool.fee_growth_inside(event.tick_lower, event.tick_upper);
                self.ledger.handle_mint(
                    event.token_id,
                    event.owner,
                    event.pool,
                    event.tick_lower,
                    event.tick_upper,
                    event.amount,
                    fee_growth_inside_0,
                    fee_growth_inside_1,
                )
            }
            NftEvent::IncreaseLiquidity(event) => {
                let (fee_growth_inside_0, fee_growth_inside_1) =
                    self.position_fee_growth(event.token_id)?;
                self.ledger.handle_increase_liquidity(
                    event.token_id,
                    event.liquidity,
                    fee_growth_inside_0,
                    fee_growth_inside_1,
                )
            }
            NftEvent::DecreaseLiquidity(event) => {
                let (fee_growth_inside_0, fee_growth_inside_1) =
                    self.position_fee_growth(event.token_id)?;
                self.ledger.handle_decrease_liquidity(
                    event.token_id,
                    event.liquidity,
                    fee_growth_inside_0,
                    fee_growth_inside_1,
                    event.amount0,
                    event.amount1,
                )
            }
            NftEvent::Collect(event) => self
                .ledger
                .handle_collect(event.token_id, event.amount0, event.amount1)
                .map(|_| ()),
            NftEvent::Transfer(event) => {
                self.ledger
                    .handle_transfer(event.token_id, event.from, event.to)
            }
        }
    }

    /// Current fee-growth-inside snapshot for an existing NFT position,
    /// read from its pool.
    fn position_fee_growth(&self, token_id: u64) -> Result<(U256, U256), Error> {
        let position = self
            .ledger
            .position(token_id)
            .ok_or_else(|| crate::error::LedgerError::PositionNotFound(token_id.to_string()))?;

        match self.pools.get(&position.pool) {
            Some(pool) => Ok(pool.fee_growth_inside(position.tick_lower, position.tick_upper)),
            None => {
                warn!(pool = %position.pool, token = token_id, "position pool not registered");
                Ok((U256::ZERO, U256::ZERO))
            }
        }
    }

    /// Full snapshot of every registered pool and the NFT ledger, ordered
    /// for reproducibility.
    pub fn snapshot(&self) -> SimulationSnapshot {
        let mut pools: Vec<_> = self.pools.values().map(CorePool::snapshot).collect();
        pools.sort_by_key(|snapshot| snapshot.address);

        SimulationSnapshot {
            pools,
            ledger: self.ledger.snapshot(),
        }
    }

    /// Writes the current state to the sink: one document per pool, keyed
    /// by address, plus the ledger.
    pub fn flush(&self, sink: &mut dyn SnapshotSink) -> std::io::Result<()> {
        for snapshot in self.snapshot().pools {
            let key = snapshot.address.to_string();
            let bytes = serde_json::to_vec(&snapshot)?;
            sink.put(&key, &bytes)?;
        }
        let bytes = serde_json::to_vec(&self.ledger.snapshot())?;
        sink.put(LEDGER_KEY, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use crate::events::{EventMeta, NftTransferEvent, PoolMintEvent};
    use crate::math::tick_math::get_sqrt_ratio_at_tick;
    use crate::pool::core_pool::{FeeAmount, PoolConfig};
    use alloy_primitives::address;

    const POOL: Address = address!("0x1000000000000000000000000000000000000000");

    fn dispatcher_with_pool() -> EventDispatcher {
        let config = PoolConfig::new(
            address!("0x0000000000000000000000000000000000000001"),
            address!("0x0000000000000000000000000000000000000002"),
            FeeAmount::Medium,
        );
        let mut pool = CorePool::new(POOL, config);
        pool.initialize(get_sqrt_ratio_at_tick(0).unwrap()).unwrap();

        let mut dispatcher = EventDispatcher::new(DispatchPolicy::Tolerant);
        dispatcher.register_pool(pool);
        dispatcher
    }

    fn mint_event(amount: u128) -> Event {
        Event::Pool(PoolEvent::Mint(PoolMintEvent {
            meta: EventMeta::default(),
            pool: POOL,
            owner: "a".to_owned(),
            tick_lower: -60,
            tick_upper: 60,
            amount,
            amount0: U256::ZERO,
            amount1: U256::ZERO,
        }))
    }

    #[test]
    fn routes_pool_mint() {
        let mut dispatcher = dispatcher_with_pool();
        dispatcher.dispatch(&mint_event(1_000_000)).unwrap();
        assert_eq!(dispatcher.pool(POOL).unwrap().liquidity, 1_000_000);
    }

    #[test]
    fn tolerant_policy_skips_recoverable_errors() {
        let mut dispatcher = dispatcher_with_pool();
        // zero-amount mint is invalid but recoverable
        dispatcher.dispatch(&mint_event(0)).unwrap();

        // a transfer of an unknown token is also skipped
        let transfer = Event::Nft(NftEvent::Transfer(NftTransferEvent {
            meta: EventMeta::default(),
            token_id: 99,
            from: address!("0x00000000000000000000000000000000000000aa"),
            to: address!("0x00000000000000000000000000000000000000bb"),
        }));
        dispatcher.dispatch(&transfer).unwrap();
    }

    #[test]
    fn strict_policy_surfaces_recoverable_errors() {
        let config = PoolConfig::new(
            address!("0x0000000000000000000000000000000000000001"),
            address!("0x0000000000000000000000000000000000000002"),
            FeeAmount::Medium,
        );
        let mut pool = CorePool::new(POOL, config);
        pool.initialize(get_sqrt_ratio_at_tick(0).unwrap()).unwrap();

        let mut dispatcher = EventDispatcher::new(DispatchPolicy::Strict);
        dispatcher.register_pool(pool);

        assert_eq!(
            dispatcher.dispatch(&mint_event(0)),
            Err(PoolError::TickRangeInvalid.into())
        );
    }

    #[test]
    fn events_for_unknown_pools_are_ignored() {
        let mut dispatcher = dispatcher_with_pool();
        let mut event = mint_event(1000);
        if let Event::Pool(PoolEvent::Mint(mint)) = &mut event {
            mint.pool = address!("0x2000000000000000000000000000000000000000");
        }
        dispatcher.dispatch(&event).unwrap();
        assert_eq!(dispatcher.pool(POOL).unwrap().liquidity, 0);
    }
}
