// ============================================================================
// Match Results
// ============================================================================

use super::fees::{FeeSchedule, Liquidity};
use super::{Order, OrderId, Side, Trade, TraderId};
use crate::error::ExchangeResult;
use crate::numeric::{notional, Price, Quantity};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One matching step between the incoming order and a resting order,
/// before fees and settlement are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub resting_order_id: OrderId,
    pub resting_trader_id: TraderId,
    pub price: Price,
    pub quantity: Quantity,
    /// True when this fill exhausts the resting order
    pub resting_exhausted: bool,
}

/// Trades produced by a single incoming order; most orders fill against a
/// handful of resting orders at most.
pub type Trades = SmallVec<[Trade; 4]>;

/// Result of matching an incoming order against the book.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderOutcome {
    /// Trades in the order they were matched
    pub resulting_trades: Trades,

    /// The incoming order with its remaining quantity updated; zero
    /// remaining means it was fully filled
    pub unfulfilled_order: Order,
}

impl OrderOutcome {
    pub fn new(resulting_trades: Trades, unfulfilled_order: Order) -> Self {
        Self {
            resulting_trades,
            unfulfilled_order,
        }
    }

    pub fn is_fully_filled(&self) -> bool {
        self.unfulfilled_order.is_filled()
    }

    /// Nothing matched; the whole order rests
    pub fn is_passive(&self) -> bool {
        self.resulting_trades.is_empty()
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.resulting_trades.iter().map(|t| t.quantity).sum()
    }
}

/// Price a set of planned fills into trades.
///
/// The incoming order is the taker and pays the taker rate; the resting
/// order is the maker.
pub fn trades_from_fills(
    incoming: &Order,
    fills: &[Fill],
    fees: &FeeSchedule,
) -> ExchangeResult<Trades> {
    let mut trades = Trades::with_capacity(fills.len());

    for fill in fills {
        let value = notional(fill.quantity, fill.price)?;
        let maker_fee = fees.fee(value, Liquidity::Maker)?;
        let taker_fee = fees.fee(value, Liquidity::Taker)?;

        let (buyer_id, seller_id, buyer_fee, seller_fee) = match incoming.side {
            Side::Bid => (
                incoming.trader_id.clone(),
                fill.resting_trader_id.clone(),
                taker_fee,
                maker_fee,
            ),
            Side::Ask => (
                fill.resting_trader_id.clone(),
                incoming.trader_id.clone(),
                maker_fee,
                taker_fee,
            ),
        };

        trades.push(Trade::new(
            incoming.ticker.clone(),
            buyer_id,
            seller_id,
            fill.resting_order_id,
            incoming.id,
            incoming.side,
            fill.price,
            fill.quantity,
            buyer_fee,
            seller_fee,
            incoming.timestamp(),
        )?);
    }

    Ok(trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn fill(trader: &str, price: Price, quantity: Quantity) -> Fill {
        Fill {
            resting_order_id: OrderId::new(),
            resting_trader_id: TraderId::from(trader),
            price,
            quantity,
            resting_exhausted: true,
        }
    }

    #[test]
    fn test_taker_pays_taker_rate() {
        let fees = FeeSchedule::maker_taker(Decimal::from(2), Decimal::from(5));

        let bid = Order::bid("buyer", "XYZ", 100, 1_000);
        let trades = trades_from_fills(&bid, &[fill("seller", 1_000, 100)], &fees).unwrap();
        assert_eq!(trades[0].buyer_id.as_str(), "buyer");
        assert_eq!(trades[0].total_value, 100_000);
        assert_eq!(trades[0].buyer_fee, 50);
        assert_eq!(trades[0].seller_fee, 20);

        let ask = Order::ask("seller", "XYZ", 100, 1_000);
        let trades = trades_from_fills(&ask, &[fill("buyer", 1_000, 100)], &fees).unwrap();
        assert_eq!(trades[0].buyer_id.as_str(), "buyer");
        assert_eq!(trades[0].buyer_fee, 20);
        assert_eq!(trades[0].seller_fee, 50);
        assert_eq!(trades[0].aggressor, Side::Ask);
    }

    #[test]
    fn test_outcome_accessors() {
        let mut order = Order::bid("buyer", "XYZ", 10, 500);
        let trades =
            trades_from_fills(&order, &[fill("s1", 500, 4), fill("s2", 500, 6)], &FeeSchedule::zero())
                .unwrap();
        order.fill(10).unwrap();

        let outcome = OrderOutcome::new(trades, order);
        assert!(outcome.is_fully_filled());
        assert!(!outcome.is_passive());
        assert_eq!(outcome.filled_quantity(), 10);
    }
}
