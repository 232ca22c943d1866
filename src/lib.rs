use alloy_primitives::U256;

pub mod error;
mod hash;
pub mod math;

pub use hash::{FastMap, FastSet};

pub mod dispatcher;
pub mod events;
pub mod ledger;
pub mod pool;
pub mod snapshot;

pub use dispatcher::{DispatchPolicy, EventDispatcher};
pub use error::Error;
pub use ledger::{TokenPosition, TokenPositionLedger};
pub use pool::core_pool::{CorePool, FeeAmount, PoolConfig};
pub use snapshot::{MemorySink, SimulationSnapshot, SnapshotSink};

const U160_MAX: U256 = U256::from_limbs([0, 0, 4294967296, 0]);

/// Fee denominator: pool fees are expressed in hundredths of a basis point.
const PIPS: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

pub const RESOLUTION: u8 = 96;
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
pub const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);
