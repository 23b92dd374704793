// ============================================================================
// Trade Domain Model
// ============================================================================

use crate::numeric::{checked_cash_add, notional, Cash, NumericResult, Price, Quantity};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{OrderId, Side, Ticker, TraderId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a matched trade between a resting and an incoming order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,

    pub ticker: Ticker,

    pub buyer_id: TraderId,
    pub seller_id: TraderId,

    /// Order ID of the passive order (resting in book)
    pub maker_order_id: OrderId,

    /// Order ID of the aggressive order (incoming)
    pub taker_order_id: OrderId,

    /// Side of the incoming order
    pub aggressor: Side,

    /// Execution price, always the resting order's limit
    pub price: Price,

    /// Executed quantity
    pub quantity: Quantity,

    /// `quantity * price`
    pub total_value: Cash,

    pub buyer_fee: Cash,
    pub seller_fee: Cash,

    /// Submission time of the incoming order that produced the trade
    pub timestamp: u64,

    /// Wall-clock execution time
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: Ticker,
        buyer_id: TraderId,
        seller_id: TraderId,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        aggressor: Side,
        price: Price,
        quantity: Quantity,
        buyer_fee: Cash,
        seller_fee: Cash,
        timestamp: u64,
    ) -> NumericResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            ticker,
            buyer_id,
            seller_id,
            maker_order_id,
            taker_order_id,
            aggressor,
            price,
            quantity,
            total_value: notional(quantity, price)?,
            buyer_fee,
            seller_fee,
            timestamp,
            executed_at: Utc::now(),
        })
    }

    /// Fees collected by the exchange on this trade
    pub fn total_fees(&self) -> NumericResult<Cash> {
        checked_cash_add(self.buyer_fee, self.seller_fee)
    }

    pub fn is_self_trade(&self) -> bool {
        self.buyer_id == self.seller_id
    }
}

// ============================================================================
// Trade Log
// ============================================================================

/// Append-only, chronologically ordered record of every trade.
#[derive(Debug, Default, Clone)]
pub struct TradeLog {
    trades: Vec<Trade>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append<I>(&mut self, trades: I)
    where
        I: IntoIterator<Item = Trade>,
    {
        self.trades.extend(trades);
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn last(&self) -> Option<&Trade> {
        self.trades.last()
    }

    /// Trades appended at or after `cursor`. A reader keeps `len()` as its
    /// cursor and resumes from there on the next call.
    pub fn since(&self, cursor: usize) -> &[Trade] {
        self.trades.get(cursor..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }
}

impl<'a> IntoIterator for &'a TradeLog {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade(quantity: Quantity, price: Price) -> Trade {
        Trade::new(
            Ticker::from("XYZ"),
            TraderId::from("buyer"),
            TraderId::from("seller"),
            OrderId::new(),
            OrderId::new(),
            Side::Ask,
            price,
            quantity,
            5,
            3,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_trade_creation() {
        let trade = sample_trade(10, 500);

        assert_eq!(trade.ticker.as_str(), "XYZ");
        assert_eq!(trade.total_value, 5_000);
        assert_eq!(trade.total_fees(), Ok(8));
        assert!(!trade.is_self_trade());
    }

    #[test]
    fn test_trade_notional_overflow() {
        let result = Trade::new(
            Ticker::from("XYZ"),
            TraderId::from("buyer"),
            TraderId::from("seller"),
            OrderId::new(),
            OrderId::new(),
            Side::Bid,
            i64::MAX,
            2,
            0,
            0,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_trade_log_cursor() {
        let mut log = TradeLog::new();
        assert!(log.is_empty());

        log.append(vec![sample_trade(1, 100), sample_trade(2, 100)]);
        let cursor = log.len();
        log.append(vec![sample_trade(3, 100)]);

        assert_eq!(log.len(), 3);
        assert_eq!(log.since(cursor).len(), 1);
        assert_eq!(log.since(cursor)[0].quantity, 3);
        assert!(log.since(10).is_empty());
        assert_eq!(log.iter().map(|t| t.quantity).sum::<u64>(), 6);
        assert_eq!(log.last().map(|t| t.quantity), Some(3));
    }
}
