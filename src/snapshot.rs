use crate::ledger::{TokenPosition, TokenPositionLedger};
use crate::pool::core_pool::{CorePool, PoolConfig};
use crate::pool::position::{Position, PositionKey, PositionManager};
use crate::pool::tick::{Tick, TickManager};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pool-level position entry, ordered by its storage key so snapshots
/// are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub position: Position,
}

/// Serialized state of one pool. Replaying the same event stream always
/// produces a byte-identical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee_pips: u32,
    pub tick_spacing: i32,
    pub sqrt_price_x96: U256,
    pub tick_current: i32,
    pub liquidity: u128,
    pub fee_growth_global_0_x128: U256,
    pub fee_growth_global_1_x128: U256,
    pub ticks: BTreeMap<i32, Tick>,
    pub positions: Vec<PositionEntry>,
}

/// Serialized state of the NFT position ledger. The owner and pool indices
/// are derived data and are rebuilt on restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub positions: Vec<TokenPosition>,
}

/// Snapshot of everything the dispatcher tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub pools: Vec<PoolSnapshot>,
    pub ledger: LedgerSnapshot,
}

impl CorePool {
    pub fn snapshot(&self) -> PoolSnapshot {
        let mut positions: Vec<PositionEntry> = self
            .position_manager
            .iter()
            .map(|(key, position)| PositionEntry {
                owner: key.owner.clone(),
                tick_lower: key.tick_lower,
                tick_upper: key.tick_upper,
                position: position.clone(),
            })
            .collect();
        positions.sort_by(|a, b| {
            (&a.owner, a.tick_lower, a.tick_upper).cmp(&(&b.owner, b.tick_lower, b.tick_upper))
        });

        PoolSnapshot {
            address: self.address,
            token0: self.token0,
            token1: self.token1,
            fee_pips: self.fee_pips,
            tick_spacing: self.tick_spacing,
            sqrt_price_x96: self.sqrt_price_x96,
            tick_current: self.tick_current,
            liquidity: self.liquidity,
            fee_growth_global_0_x128: self.fee_growth_global_0_x128,
            fee_growth_global_1_x128: self.fee_growth_global_1_x128,
            ticks: self.tick_manager.inner().clone(),
            positions,
        }
    }

    pub fn from_snapshot(snapshot: PoolSnapshot) -> Self {
        let mut position_manager = PositionManager::new();
        for entry in snapshot.positions {
            position_manager.insert(
                PositionKey::new(entry.owner, entry.tick_lower, entry.tick_upper),
                entry.position,
            );
        }

        let mut pool = CorePool::new(
            snapshot.address,
            PoolConfig {
                token0: snapshot.token0,
                token1: snapshot.token1,
                fee_pips: snapshot.fee_pips,
                tick_spacing: snapshot.tick_spacing,
            },
        );
        pool.sqrt_price_x96 = snapshot.sqrt_price_x96;
        pool.tick_current = snapshot.tick_current;
        pool.liquidity = snapshot.liquidity;
        pool.fee_growth_global_0_x128 = snapshot.fee_growth_global_0_x128;
        pool.fee_growth_global_1_x128 = snapshot.fee_growth_global_1_x128;
        pool.tick_manager = TickManager::from_inner(snapshot.ticks);
        pool.position_manager = position_manager;
        pool
    }
}

impl TokenPositionLedger {
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut positions: Vec<TokenPosition> =
            self.iter().map(|(_, position)| position.clone()).collect();
        positions.sort_by_key(|position| position.token_id);
        LedgerSnapshot { positions }
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut ledger = TokenPositionLedger::new();
        for position in snapshot.positions {
            ledger.insert_restored(position);
        }
        ledger
    }
}

/// Opaque key-value sink for snapshots. Writes are full-state and
/// idempotent, keyed by pool address (or a well-known key for the ledger).
pub trait SnapshotSink {
    fn put(&mut self, key: &str, value: &[u8]) -> std::io::Result<()>;
}

/// In-memory sink, for tests and dry runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl SnapshotSink for MemorySink {
    fn put(&mut self, key: &str, value: &[u8]) -> std::io::Result<()> {
        self.entries.insert(key.to_owned(), value.to_vec());
        Ok(())
    }
}
