//! Closed error enumeration for the pricing and settlement core.
//!
//! Every failure the engine can report is a variant here, so call sites
//! match exhaustively instead of probing ad hoc error codes. Messages
//! explain the rejection without leaking raw pool state.

use thiserror::Error;

use super::market::MarketId;

/// All terminal outcomes a pricing or settlement call can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed request (empty ids, out-of-domain parameters).
    #[error("invalid request: {0}")]
    Validation(String),

    /// Non-positive or policy-violating amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// No market exists under the given id.
    #[error("market not found: {0}")]
    MarketNotFound(MarketId),

    /// The market exists but its liquidity pool was never initialized.
    #[error("market {0} has no initialized pool")]
    PoolNotInitialized(MarketId),

    /// The market is closed, resolved, or cancelled.
    #[error("market {0} is not accepting bets")]
    MarketNotActive(MarketId),

    /// Requester balance does not cover the gross bet amount.
    #[error("insufficient balance for bet amount")]
    InsufficientBalance,

    /// The trade would claim the entire (or a negative share of) one
    /// reserve side.
    #[error("bet would exceed pool capacity")]
    PoolExhausted,

    /// Both reserves (or the stored product) are zero; nothing to price.
    #[error("pool has no liquidity to price against")]
    DegeneratePool,

    /// Division by zero in a derived quantity.
    #[error("division by zero computing {0}")]
    DivideByZero(&'static str),

    /// Requested pool size falls outside the allowed bounds.
    #[error("pool size outside allowed bounds")]
    PoolSizeOutOfRange,

    /// The constant-product check failed beyond the relative tolerance,
    /// before or after a trade. Always fatal to the request.
    #[error("pool invariant violated beyond tolerance")]
    InvariantViolation,

    /// The market version changed between snapshot and commit. The
    /// orchestrator retries internally; callers seeing this lost the
    /// bounded retries and should resubmit.
    #[error("market state changed during settlement, retry")]
    ConcurrencyConflict,

    /// The commit batch could not be persisted. `indeterminate` marks a
    /// timeout whose outcome is unknown and must be reconciled by a
    /// read-back before reporting.
    #[error("settlement could not be persisted: {message}")]
    PersistenceFailure {
        message: String,
        indeterminate: bool,
    },
}

impl EngineError {
    /// Stable machine-readable kind for logs and caller dispatch.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::MarketNotFound(_) => "market_not_found",
            Self::PoolNotInitialized(_) => "pool_not_initialized",
            Self::MarketNotActive(_) => "market_not_active",
            Self::InsufficientBalance => "insufficient_balance",
            Self::PoolExhausted => "pool_exhausted",
            Self::DegeneratePool => "degenerate_pool",
            Self::DivideByZero(_) => "divide_by_zero",
            Self::PoolSizeOutOfRange => "pool_size_out_of_range",
            Self::InvariantViolation => "invariant_violation",
            Self::ConcurrencyConflict => "concurrency_conflict",
            Self::PersistenceFailure { .. } => "persistence_failure",
        }
    }

    /// Shorthand for a definite (non-indeterminate) persistence failure.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailure {
            message: message.into(),
            indeterminate: false,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(EngineError::InsufficientBalance.kind(), "insufficient_balance");
        assert_eq!(EngineError::PoolExhausted.kind(), "pool_exhausted");
        assert_eq!(
            EngineError::persistence("disk full").kind(),
            "persistence_failure"
        );
    }

    #[test]
    fn test_message_does_not_leak_reserves() {
        let msg = EngineError::PoolExhausted.to_string();
        assert_eq!(msg, "bet would exceed pool capacity");
    }
}
