// ============================================================================
// Exchange Errors
// ============================================================================

use crate::domain::{OrderId, OrderState, Ticker, TraderId};
use crate::numeric::{Cash, NumericError, Position};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why an order was refused before it reached the book.
///
/// Rejection is an expected outcome: the order is dropped and no book,
/// ledger or trade-log state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RejectReason {
    #[error("order quantity must be positive")]
    ZeroQuantity,

    #[error("limit price must be positive, got {0}")]
    NonPositivePrice(i64),

    #[error("security {0} is not listed")]
    UnknownSecurity(Ticker),

    #[error("trader {0} has no account")]
    UnknownTrader(TraderId),

    #[error("insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: Position, available: Position },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Cash, available: Cash },

    #[error("order {0} is already resting")]
    DuplicateOrderId(OrderId),

    #[error("order notional overflows")]
    NotionalOverflow,

    #[error("order {order_id} was already processed ({state:?})")]
    AlreadyProcessed { order_id: OrderId, state: OrderState },
}

/// Invalid exchange configuration or construction input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fee rate cannot be negative: {0} bps")]
    NegativeFeeRate(String),

    #[error("ticker cannot be empty")]
    EmptyTicker,

    #[error("security {0} is listed twice")]
    DuplicateSecurity(Ticker),

    #[error("account for {0} is opened twice")]
    DuplicateAccount(TraderId),

    #[error("position for {trader} refers to unknown {what}")]
    DanglingPosition { trader: TraderId, what: String },

    #[error("snapshot depth must be positive")]
    ZeroSnapshotDepth,

    #[error("invalid config document: {0}")]
    Parse(String),
}

/// Top-level exchange error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("order rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Internal consistency defect. The operation is aborted before any
    /// observable state changes.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("exchange service has stopped")]
    ServiceStopped,
}

impl ExchangeError {
    pub fn invariant(message: impl Into<String>) -> Self {
        ExchangeError::InvariantViolation(message.into())
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ExchangeError::Rejected(_))
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_display() {
        let err = RejectReason::InsufficientFunds {
            required: 5_000,
            available: 1_000,
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: required 5000, available 1000"
        );
    }

    #[test]
    fn test_exchange_error_from_reject() {
        let err: ExchangeError = RejectReason::ZeroQuantity.into();
        assert!(err.is_rejection());
        assert_eq!(
            err.to_string(),
            "order rejected: order quantity must be positive"
        );
    }

    #[test]
    fn test_exchange_error_from_numeric() {
        let err: ExchangeError = NumericError::Overflow.into();
        assert!(matches!(err, ExchangeError::Numeric(NumericError::Overflow)));
        assert!(!err.is_rejection());
    }
}
