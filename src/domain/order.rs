// ============================================================================
// Order Domain Model
// ============================================================================

use crate::error::{ExchangeError, ExchangeResult};
use crate::numeric::{Price, Quantity};
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registered trader identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraderId(String);

impl TraderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TraderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TraderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Security symbol, e.g. "XYZ"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Ticker {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<String> for Ticker {
    fn from(symbol: String) -> Self {
        Self(symbol)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// The side an incoming order of this side matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Whether an incoming limit on this side crosses a resting price.
    pub fn crosses(self, limit_price: Price, resting_price: Price) -> bool {
        match self {
            Side::Bid => limit_price >= resting_price,
            Side::Ask => limit_price <= resting_price,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("bid"),
            Side::Ask => f.write_str("ask"),
        }
    }
}

// ============================================================================
// Order State Machine
// ============================================================================

pub mod state {
    use crate::error::ExchangeError;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum OrderState {
        New,
        Rejected,
        Resting,
        PartiallyFilled,
        Filled,
        Cancelled,
    }

    impl OrderState {
        pub fn is_terminal(&self) -> bool {
            matches!(
                self,
                OrderState::Filled | OrderState::Cancelled | OrderState::Rejected
            )
        }

        /// Resting orders sit in a half-book awaiting a counter-order.
        pub fn is_resting(&self) -> bool {
            matches!(self, OrderState::Resting | OrderState::PartiallyFilled)
        }

        pub fn can_be_cancelled(&self) -> bool {
            self.is_resting()
        }
    }

    /// Valid state transitions for the order state machine
    #[derive(Debug, Clone, Copy)]
    pub enum OrderStateTransition {
        Reject,
        Rest,
        PartialFill,
        Fill,
        Cancel,
    }

    impl OrderState {
        pub fn transition(
            &self,
            transition: OrderStateTransition,
        ) -> Result<OrderState, ExchangeError> {
            match (self, transition) {
                (OrderState::New, OrderStateTransition::Reject) => Ok(OrderState::Rejected),
                (OrderState::New, OrderStateTransition::Rest) => Ok(OrderState::Resting),

                (
                    OrderState::New | OrderState::Resting | OrderState::PartiallyFilled,
                    OrderStateTransition::PartialFill,
                ) => Ok(OrderState::PartiallyFilled),
                (
                    OrderState::New | OrderState::Resting | OrderState::PartiallyFilled,
                    OrderStateTransition::Fill,
                ) => Ok(OrderState::Filled),

                // A partially filled incoming order keeps its state when it rests
                (OrderState::PartiallyFilled, OrderStateTransition::Rest) => {
                    Ok(OrderState::PartiallyFilled)
                },

                (
                    OrderState::Resting | OrderState::PartiallyFilled,
                    OrderStateTransition::Cancel,
                ) => Ok(OrderState::Cancelled),

                _ => Err(ExchangeError::invariant(format!(
                    "invalid transition from {:?} via {:?}",
                    self, transition
                ))),
            }
        }
    }
}

use state::{OrderState, OrderStateTransition};

// ============================================================================
// Order Entity
// ============================================================================

/// Limit order intent. Everything except the fill progress is immutable once
/// constructed; the exchange stamps arrival time and sequence on acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    pub id: OrderId,
    pub trader_id: TraderId,
    pub ticker: Ticker,
    pub side: Side,
    pub quantity: Quantity,
    pub limit_price: Price,

    timestamp: u64,
    sequence: u64,
    remaining_quantity: Quantity,
    state: OrderState,
}

impl Order {
    pub fn new(
        trader_id: impl Into<TraderId>,
        ticker: impl Into<Ticker>,
        side: Side,
        quantity: Quantity,
        limit_price: Price,
    ) -> Self {
        Self {
            id: OrderId::new(),
            trader_id: trader_id.into(),
            ticker: ticker.into(),
            side,
            quantity,
            limit_price,
            timestamp: 0,
            sequence: 0,
            remaining_quantity: quantity,
            state: OrderState::New,
        }
    }

    pub fn bid(
        trader_id: impl Into<TraderId>,
        ticker: impl Into<Ticker>,
        quantity: Quantity,
        limit_price: Price,
    ) -> Self {
        Self::new(trader_id, ticker, Side::Bid, quantity, limit_price)
    }

    pub fn ask(
        trader_id: impl Into<TraderId>,
        ticker: impl Into<Ticker>,
        quantity: Quantity,
        limit_price: Price,
    ) -> Self {
        Self::new(trader_id, ticker, Side::Ask, quantity, limit_price)
    }

    /// Replace the generated id, for callers that allocate their own.
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = id;
        self
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.quantity - self.remaining_quantity
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Time priority key; lower sorts first.
    pub fn priority(&self) -> (u64, u64) {
        (self.timestamp, self.sequence)
    }

    // ========================================================================
    // Mutations (exchange-internal)
    // ========================================================================

    pub(crate) fn stamp(&mut self, timestamp: u64, sequence: u64) {
        self.timestamp = timestamp;
        self.sequence = sequence;
    }

    /// Fill `quantity` of this order.
    ///
    /// Overfills and empty fills are invariant violations and leave the order
    /// untouched.
    pub fn fill(&mut self, quantity: Quantity) -> ExchangeResult<()> {
        if quantity == 0 || quantity > self.remaining_quantity {
            return Err(ExchangeError::invariant(format!(
                "fill of {} against order {} with {} remaining",
                quantity, self.id, self.remaining_quantity
            )));
        }

        let remaining = self.remaining_quantity - quantity;
        let transition = if remaining == 0 {
            OrderStateTransition::Fill
        } else {
            OrderStateTransition::PartialFill
        };
        self.state = self.state.transition(transition)?;
        self.remaining_quantity = remaining;
        Ok(())
    }

    pub(crate) fn apply(&mut self, transition: OrderStateTransition) -> ExchangeResult<()> {
        self.state = self.state.transition(transition)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_creation() {
        let order = Order::bid("trader-a", "XYZ", 10, 500);

        assert_eq!(order.side, Side::Bid);
        assert_eq!(order.remaining_quantity(), 10);
        assert_eq!(order.filled_quantity(), 0);
        assert_eq!(order.state(), OrderState::New);
    }

    #[test]
    fn test_fill() {
        let mut order = Order::ask("trader-b", "XYZ", 10, 500);

        order.fill(3).unwrap();
        assert_eq!(order.filled_quantity(), 3);
        assert_eq!(order.remaining_quantity(), 7);
        assert_eq!(order.state(), OrderState::PartiallyFilled);

        order.fill(7).unwrap();
        assert!(order.is_filled());
        assert_eq!(order.state(), OrderState::Filled);
    }

    #[test]
    fn test_overfill_protection() {
        let mut order = Order::bid("trader-a", "XYZ", 5, 500);

        let err = order.fill(10).unwrap_err();
        assert!(matches!(err, ExchangeError::InvariantViolation(_)));
        assert_eq!(order.remaining_quantity(), 5);
        assert_eq!(order.state(), OrderState::New);

        assert!(order.fill(0).is_err());
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(
            OrderState::New.transition(OrderStateTransition::Rest).unwrap(),
            OrderState::Resting
        );
        assert_eq!(
            OrderState::Resting.transition(OrderStateTransition::Cancel).unwrap(),
            OrderState::Cancelled
        );
        assert!(OrderState::Filled
            .transition(OrderStateTransition::Cancel)
            .is_err());
        assert!(OrderState::Rejected
            .transition(OrderStateTransition::Rest)
            .is_err());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::PartiallyFilled.can_be_cancelled());
        assert!(!OrderState::New.can_be_cancelled());
    }

    #[test]
    fn test_side_crossing() {
        assert!(Side::Bid.crosses(500, 500));
        assert!(Side::Bid.crosses(510, 500));
        assert!(!Side::Bid.crosses(490, 500));
        assert!(Side::Ask.crosses(490, 500));
        assert!(!Side::Ask.crosses(510, 500));
        assert_eq!(Side::Bid.opposite(), Side::Ask);
    }
}
