use alloy_primitives::{Address, B256, I256, U256};
use serde::{Deserialize, Serialize};

/// On-chain identity of a decoded event, used for ordering diagnostics and
/// error reporting. Decoding raw logs is a collaborator concern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub block_number: u64,
    pub log_index: u32,
    pub tx_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInitializeEvent {
    pub meta: EventMeta,
    pub pool: Address,
    pub sqrt_price_x96: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMintEvent {
    pub meta: EventMeta,
    pub pool: Address,
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount: u128,
    pub amount0: U256,
    pub amount1: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBurnEvent {
    pub meta: EventMeta,
    pub pool: Address,
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount: u128,
    pub amount0: U256,
    pub amount1: U256,
}

/// Result of an on-chain swap; the input that produced it is recovered by
/// the resolver. `liquidity` is signed because some sources emit a `-1`
/// sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSwapEvent {
    pub meta: EventMeta,
    pub pool: Address,
    pub amount0: I256,
    pub amount1: I256,
    pub sqrt_price_x96: U256,
    pub liquidity: i128,
    pub tick: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCollectEvent {
    pub meta: EventMeta,
    pub pool: Address,
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0: U256,
    pub amount1: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    Initialize(PoolInitializeEvent),
    Mint(PoolMintEvent),
    Burn(PoolBurnEvent),
    Swap(PoolSwapEvent),
    Collect(PoolCollectEvent),
}

impl PoolEvent {
    pub fn pool(&self) -> Address {
        match self {
            PoolEvent::Initialize(event) => event.pool,
            PoolEvent::Mint(event) => event.pool,
            PoolEvent::Burn(event) => event.pool,
            PoolEvent::Swap(event) => event.pool,
            PoolEvent::Collect(event) => event.pool,
        }
    }

    pub fn meta(&self) -> &EventMeta {
        match self {
            PoolEvent::Initialize(event) => &event.meta,
            PoolEvent::Mint(event) => &event.meta,
            PoolEvent::Burn(event) => &event.meta,
            PoolEvent::Swap(event) => &event.meta,
            PoolEvent::Collect(event) => &event.meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMintEvent {
    pub meta: EventMeta,
    pub token_id: u64,
    pub owner: Address,
    pub pool: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftIncreaseLiquidityEvent {
    pub meta: EventMeta,
    pub token_id: u64,
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftDecreaseLiquidityEvent {
    pub meta: EventMeta,
    pub token_id: u64,
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftCollectEvent {
    pub meta: EventMeta,
    pub token_id: u64,
    pub amount0: U256,
    pub amount1: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransferEvent {
    pub meta: EventMeta,
    pub token_id: u64,
    pub from: Address,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NftEvent {
    Mint(NftMintEvent),
    IncreaseLiquidity(NftIncreaseLiquidityEvent),
    DecreaseLiquidity(NftDecreaseLiquidityEvent),
    Collect(NftCollectEvent),
    Transfer(NftTransferEvent),
}

impl NftEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            NftEvent::Mint(event) => &event.meta,
            NftEvent::IncreaseLiquidity(event) => &event.meta,
            NftEvent::DecreaseLiquidity(event) => &event.meta,
            NftEvent::Collect(event) => &event.meta,
            NftEvent::Transfer(event) => &event.meta,
        }
    }
}

/// A fully decoded event, delivered to the dispatcher in canonical
/// block/log order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Pool(PoolEvent),
    Nft(NftEvent),
}

impl Event {
    pub fn meta(&self) -> &EventMeta {
        match self {
            Event::Pool(event) => event.meta(),
            Event::Nft(event) => event.meta(),
        }
    }
}
