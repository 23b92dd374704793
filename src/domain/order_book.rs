// ============================================================================
// Order Book Domain Model
// ============================================================================

use rust_decimal::Decimal;

use super::config::SelfTradePolicy;
use super::fees::FeeSchedule;
use super::half_book::{HalfBook, LevelSummary};
use super::outcome::{Fill, OrderOutcome};
use super::{Order, OrderId, Side, Ticker};
use crate::error::{ExchangeError, ExchangeResult};
use crate::numeric::{Price, Quantity};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Order Book
// ============================================================================

/// Bid and ask half-books for one security
#[derive(Debug, Clone)]
pub struct OrderBook {
    ticker: Ticker,
    bids: HalfBook,
    asks: HalfBook,
}

impl OrderBook {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            bids: HalfBook::new(Side::Bid),
            asks: HalfBook::new(Side::Ask),
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn bids(&self) -> &HalfBook {
        &self.bids
    }

    pub fn asks(&self) -> &HalfBook {
        &self.asks
    }

    pub fn half(&self, side: Side) -> &HalfBook {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn half_mut(&mut self, side: Side) -> &mut HalfBook {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Match the incoming order against the opposite half-book, then rest any
    /// remainder on the incoming order's own side.
    pub fn process_order(
        &mut self,
        incoming: Order,
        fees: &FeeSchedule,
        policy: SelfTradePolicy,
    ) -> ExchangeResult<OrderOutcome> {
        self.check_ticker(&incoming)?;
        let side = incoming.side;
        let outcome = self
            .half_mut(side.opposite())
            .match_order(incoming, fees, policy)?;
        self.rest(outcome.unfulfilled_order.clone())?;
        Ok(outcome)
    }

    /// Read-only match plan against the opposite side
    pub fn plan(&self, incoming: &Order, policy: SelfTradePolicy) -> ExchangeResult<Vec<Fill>> {
        self.check_ticker(incoming)?;
        self.half(incoming.side.opposite())
            .plan_match(incoming, policy)
    }

    /// Apply fills planned for an incoming order of `incoming_side`
    pub fn commit(&mut self, incoming_side: Side, fills: &[Fill]) -> ExchangeResult<()> {
        self.half_mut(incoming_side.opposite()).commit(fills)
    }

    /// Rest an order on its own side. Filled orders are ignored.
    pub fn rest(&mut self, order: Order) -> ExchangeResult<bool> {
        self.half_mut(order.side).add_order(order)
    }

    /// Remove a resting order from whichever side holds it
    pub fn cancel(&mut self, order_id: OrderId) -> Option<Order> {
        self.bids
            .remove(order_id)
            .or_else(|| self.asks.remove(order_id))
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.bids.get(order_id).or_else(|| self.asks.get(order_id))
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Get order book snapshot
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        OrderBookSnapshot::with_depth(
            self.ticker.clone(),
            self.bids.depth(depth),
            self.asks.depth(depth),
        )
    }

    fn check_ticker(&self, order: &Order) -> ExchangeResult<()> {
        if order.ticker != self.ticker {
            return Err(ExchangeError::invariant(format!(
                "order for {} routed to {} book",
                order.ticker, self.ticker
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Order Book Snapshot
// ============================================================================

/// Immutable snapshot of the order book state
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBookSnapshot {
    pub ticker: Ticker,
    /// Bid levels, best first
    pub bids: Vec<LevelSummary>,
    /// Ask levels, best first
    pub asks: Vec<LevelSummary>,
    /// Current spread (ask - bid)
    pub spread: Option<Price>,
    /// Mid price
    pub mid_price: Option<Decimal>,
}

impl OrderBookSnapshot {
    pub fn with_depth(ticker: Ticker, bids: Vec<LevelSummary>, asks: Vec<LevelSummary>) -> Self {
        let (spread, mid_price) = match (bids.first(), asks.first()) {
            (Some(bid), Some(ask)) => (
                Some(ask.price - bid.price),
                Some((Decimal::from(bid.price) + Decimal::from(ask.price)) / Decimal::from(2)),
            ),
            _ => (None, None),
        };

        Self {
            ticker,
            bids,
            asks,
            spread,
            mid_price,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    pub fn total_bid_quantity(&self) -> Quantity {
        self.bids.iter().map(|level| level.quantity).sum()
    }

    pub fn total_ask_quantity(&self) -> Quantity {
        self.asks.iter().map(|level| level.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> OrderBook {
        OrderBook::new(Ticker::from("XYZ"))
    }

    #[test]
    fn test_unfilled_bid_rests_on_bid_side() {
        let mut book = book();
        book.process_order(
            Order::ask("seller", "XYZ", 4, 500),
            &FeeSchedule::zero(),
            SelfTradePolicy::Allow,
        )
        .unwrap();

        let outcome = book
            .process_order(
                Order::bid("buyer", "XYZ", 10, 500),
                &FeeSchedule::zero(),
                SelfTradePolicy::Allow,
            )
            .unwrap();

        assert_eq!(outcome.filled_quantity(), 4);
        assert_eq!(outcome.unfulfilled_order.remaining_quantity(), 6);
        assert!(book.asks().is_empty());
        assert_eq!(book.best_bid(), Some(500));
        assert_eq!(book.bids().total_quantity(), 6);
    }

    #[test]
    fn test_filled_order_does_not_rest() {
        let mut book = book();
        book.process_order(
            Order::bid("buyer", "XYZ", 5, 500),
            &FeeSchedule::zero(),
            SelfTradePolicy::Allow,
        )
        .unwrap();

        let outcome = book
            .process_order(
                Order::ask("seller", "XYZ", 5, 490),
                &FeeSchedule::zero(),
                SelfTradePolicy::Allow,
            )
            .unwrap();

        assert!(outcome.is_fully_filled());
        assert_eq!(outcome.resulting_trades[0].price, 500);
        assert!(book.bids().is_empty());
        assert!(book.asks().is_empty());
    }

    #[test]
    fn test_wrong_ticker_is_invariant_violation() {
        let mut book = book();
        let result = book.process_order(
            Order::bid("buyer", "ABC", 5, 500),
            &FeeSchedule::zero(),
            SelfTradePolicy::Allow,
        );
        assert!(matches!(result, Err(ExchangeError::InvariantViolation(_))));
    }

    #[test]
    fn test_cancel_either_side() {
        let mut book = book();
        let bid = Order::bid("buyer", "XYZ", 5, 490);
        let ask = Order::ask("seller", "XYZ", 5, 510);
        book.rest(bid.clone()).unwrap();
        book.rest(ask.clone()).unwrap();

        assert!(book.get(ask.id).is_some());
        assert_eq!(book.cancel(ask.id).map(|o| o.id), Some(ask.id));
        assert_eq!(book.cancel(bid.id).map(|o| o.id), Some(bid.id));
        assert!(book.cancel(bid.id).is_none());
    }

    #[test]
    fn test_order_book_snapshot() {
        let mut book = book();
        book.rest(Order::bid("b1", "XYZ", 1, 500)).unwrap();
        book.rest(Order::bid("b2", "XYZ", 2, 500)).unwrap();
        book.rest(Order::ask("s1", "XYZ", 2, 501)).unwrap();

        let snapshot = book.snapshot(10);
        assert_eq!(snapshot.best_bid(), Some(500));
        assert_eq!(snapshot.best_ask(), Some(501));
        assert_eq!(snapshot.spread, Some(1));
        assert_eq!(snapshot.mid_price, Some(Decimal::new(5005, 1)));
        assert_eq!(snapshot.bids[0].order_count, 2);
        assert_eq!(snapshot.total_bid_quantity(), 3);
        assert_eq!(snapshot.total_ask_quantity(), 2);
    }
}
