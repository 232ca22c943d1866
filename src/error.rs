use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - underflow")]
    Underflow,
    #[error("Math error - division by zero")]
    DivisionByZero,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("State error - sqrtPrice is 0")]
    SqrtPriceIsZero,
    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,
    #[error("State error - tick out of bounds")]
    TickOutOfBounds,
    #[error("State error - liquidity is 0")]
    LiquidityIsZero,
    #[error("State error - requested amount exceeds pool reserves")]
    InsufficientReserves,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool error - already initialized")]
    AlreadyInitialized,
    #[error("Pool error - invalid tick range or amount")]
    TickRangeInvalid,
    #[error("Pool error - liquidityGross above per-tick maximum")]
    LiquidityOverflow,
    #[error("Pool error - liquidity underflow")]
    LiquidityUnderflow,
    #[error("Pool error - price limit outside valid sqrt ratio range")]
    PriceLimitOutOfRange,
    #[error("Pool error - price limit on the wrong side of the current price")]
    PriceLimitWrongSide,
    #[error("Pool error - swap exceeded its iteration bound")]
    SwapNonTerminating,
    #[error("Pool error - tick {0} not found")]
    TickLookupFailure(i32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(
        "Resolve error - no swap input reproduces event at block {block_number} log {log_index}"
    )]
    SwapUnresolvable { block_number: u64, log_index: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger error - position {0} not found")]
    PositionNotFound(String),
    #[error("Ledger error - token {token_id} owned by {owner}, transfer claims {from}")]
    OwnershipMismatch {
        token_id: u64,
        owner: Address,
        from: Address,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] MathError),

    #[error(transparent)]
    StateError(#[from] StateError),

    #[error(transparent)]
    PoolError(#[from] PoolError),

    #[error(transparent)]
    ResolveError(#[from] ResolveError),

    #[error(transparent)]
    LedgerError(#[from] LedgerError),
}

impl Error {
    /// Whether this error indicates a broken core invariant. Fatal errors
    /// must halt replay; everything else may be skipped under a tolerant
    /// dispatch policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MathError(_)
                | Error::StateError(_)
                | Error::PoolError(PoolError::SwapNonTerminating)
        )
    }
}
