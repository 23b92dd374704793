// ============================================================================
// Account Domain Model
// ============================================================================

use super::{Ticker, TraderId};
use crate::numeric::{Cash, Position};
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A trader's cash and share holdings.
///
/// `reserved_*` amounts are held by the trader's resting orders and are not
/// available to new orders. Invariant: reserved amounts are never negative.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Account {
    pub trader_id: TraderId,
    pub balance: Cash,
    pub positions: HashMap<Ticker, Position>,
    pub reserved_cash: Cash,
    pub reserved_shares: HashMap<Ticker, Position>,
}

impl Account {
    pub fn new(trader_id: TraderId, balance: Cash) -> Self {
        Self {
            trader_id,
            balance,
            positions: HashMap::new(),
            reserved_cash: 0,
            reserved_shares: HashMap::new(),
        }
    }

    pub fn with_position(mut self, ticker: Ticker, quantity: Position) -> Self {
        self.positions.insert(ticker, quantity);
        self
    }

    /// Shares held in `ticker`; zero when never traded
    pub fn position(&self, ticker: &Ticker) -> Position {
        self.positions.get(ticker).copied().unwrap_or(0)
    }

    pub fn reserved_position(&self, ticker: &Ticker) -> Position {
        self.reserved_shares.get(ticker).copied().unwrap_or(0)
    }

    /// Balance not committed to resting bids
    pub fn available_balance(&self) -> Cash {
        self.balance.saturating_sub(self.reserved_cash)
    }

    /// Shares not committed to resting asks
    pub fn available_position(&self, ticker: &Ticker) -> Position {
        self.position(ticker)
            .saturating_sub(self.reserved_position(ticker))
    }
}
