// ============================================================================
// Half-Book
// One side's resting orders in price/time priority
// ============================================================================

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::config::SelfTradePolicy;
use super::fees::FeeSchedule;
use super::outcome::{trades_from_fills, Fill, OrderOutcome};
use super::state::OrderStateTransition;
use super::{Order, OrderId, Side};
use crate::error::{ExchangeError, ExchangeResult};
use crate::numeric::{Price, Quantity};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Price Level
// ============================================================================

/// Orders resting at one price, earliest first
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Price,
    orders: VecDeque<Order>,
    total_quantity: Quantity,
}

impl PriceLevel {
    fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_quantity: 0,
        }
    }

    /// Insert at the order's time-priority position. Arrivals are normally
    /// the latest, so this is almost always a push to the back.
    fn insert(&mut self, order: Order) {
        let key = order.priority();
        let position = if self.orders.back().map_or(true, |last| last.priority() <= key) {
            self.orders.len()
        } else {
            self.orders.partition_point(|o| o.priority() <= key)
        };
        self.total_quantity += order.remaining_quantity();
        self.orders.insert(position, order);
    }

    fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let position = self.orders.iter().position(|o| o.id == order_id)?;
        let order = self.orders.remove(position)?;
        self.total_quantity -= order.remaining_quantity();
        Some(order)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Aggregated view of one price level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelSummary {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

// ============================================================================
// Half-Book
// ============================================================================

/// Resting orders for one side of a security's book.
///
/// Bids rank highest price first, asks lowest price first; ties go to the
/// earliest `(timestamp, sequence)`. Every resting order has a positive
/// remaining quantity and keeps its own identity.
#[derive(Debug, Clone)]
pub struct HalfBook {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
    /// Resting order id -> level price, for cancellation lookups
    index: HashMap<OrderId, Price>,
}

impl HalfBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Add a resting order at its priority position. Fully filled orders are
    /// ignored and `Ok(false)` is returned.
    pub fn add_order(&mut self, order: Order) -> ExchangeResult<bool> {
        if order.remaining_quantity() == 0 {
            return Ok(false);
        }
        if order.side != self.side {
            return Err(ExchangeError::invariant(format!(
                "{} order {} added to {} half-book",
                order.side, order.id, self.side
            )));
        }
        if self.index.contains_key(&order.id) {
            return Err(ExchangeError::invariant(format!(
                "order {} is already resting",
                order.id
            )));
        }

        let mut order = order;
        if !order.state().is_resting() {
            order.apply(OrderStateTransition::Rest)?;
        }

        let price = order.limit_price;
        self.index.insert(order.id, price);
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .insert(order);
        Ok(true)
    }

    /// Remove a resting order by identity.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let price = self.index.remove(&order_id)?;
        let level = self.levels.get_mut(&price)?;
        let order = level.remove(order_id);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        order
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        let price = self.index.get(&order_id)?;
        self.levels
            .get(price)?
            .orders()
            .find(|o| o.id == order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Get the best (top-of-book) price
    pub fn best_price(&self) -> Option<Price> {
        self.best_level().map(|level| level.price)
    }

    /// Get the best price level
    pub fn best_level(&self) -> Option<&PriceLevel> {
        match self.side {
            // Highest bid (last in sorted order)
            Side::Bid => self.levels.values().next_back(),
            // Lowest ask (first in sorted order)
            Side::Ask => self.levels.values().next(),
        }
    }

    /// Price levels from best to worst
    pub fn levels(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Bid => Box::new(self.levels.values().rev()),
            Side::Ask => Box::new(self.levels.values()),
        }
    }

    /// Resting orders in the exact order they would be matched
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.levels().flat_map(|level| level.orders())
    }

    /// Get depth at N levels
    pub fn depth(&self, num_levels: usize) -> Vec<LevelSummary> {
        self.levels()
            .take(num_levels)
            .map(|level| LevelSummary {
                price: level.price,
                quantity: level.total_quantity(),
                order_count: level.order_count(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.levels.values().map(PriceLevel::total_quantity).sum()
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Walk the book in priority order and work out which resting orders the
    /// incoming order would fill against, without changing anything.
    ///
    /// Fills execute at the resting price. Matching stops at the first level
    /// that does not cross or once the incoming quantity is used up.
    pub fn plan_match(&self, incoming: &Order, policy: SelfTradePolicy) -> ExchangeResult<Vec<Fill>> {
        if incoming.side != self.side.opposite() {
            return Err(ExchangeError::invariant(format!(
                "{} order {} matched against {} half-book",
                incoming.side, incoming.id, self.side
            )));
        }

        let mut remaining = incoming.remaining_quantity();
        let mut fills = Vec::new();

        for level in self.levels() {
            if remaining == 0 || !incoming.side.crosses(incoming.limit_price, level.price) {
                break;
            }

            for resting in level.orders() {
                if remaining == 0 {
                    break;
                }
                if policy == SelfTradePolicy::SkipResting && resting.trader_id == incoming.trader_id
                {
                    continue;
                }

                let quantity = remaining.min(resting.remaining_quantity());
                fills.push(Fill {
                    resting_order_id: resting.id,
                    resting_trader_id: resting.trader_id.clone(),
                    price: level.price,
                    quantity,
                    resting_exhausted: quantity == resting.remaining_quantity(),
                });
                remaining -= quantity;
            }
        }

        Ok(fills)
    }

    /// Apply planned fills to the resting orders. Every fill is checked
    /// before any is applied, so a stale plan leaves the book untouched.
    pub fn commit(&mut self, fills: &[Fill]) -> ExchangeResult<()> {
        for fill in fills {
            let resting = self.get(fill.resting_order_id).ok_or_else(|| {
                ExchangeError::invariant(format!(
                    "planned fill against missing order {}",
                    fill.resting_order_id
                ))
            })?;
            if resting.limit_price != fill.price || resting.remaining_quantity() < fill.quantity {
                return Err(ExchangeError::invariant(format!(
                    "planned fill of {} @ {} no longer fits order {}",
                    fill.quantity, fill.price, fill.resting_order_id
                )));
            }
        }

        for fill in fills {
            let level = self
                .levels
                .get_mut(&fill.price)
                .ok_or_else(|| ExchangeError::invariant("price level vanished during commit"))?;
            let position = level
                .orders
                .iter()
                .position(|o| o.id == fill.resting_order_id)
                .ok_or_else(|| ExchangeError::invariant("resting order vanished during commit"))?;

            level.orders[position].fill(fill.quantity)?;
            level.total_quantity -= fill.quantity;

            if level.orders[position].is_filled() {
                level.orders.remove(position);
                self.index.remove(&fill.resting_order_id);
            }
            if level.is_empty() {
                self.levels.remove(&fill.price);
            }
        }

        Ok(())
    }

    /// Match an incoming order against this half-book and return the trades
    /// together with the incoming order's leftover.
    ///
    /// The leftover is not rested here; it belongs on the other half-book.
    pub fn match_order(
        &mut self,
        mut incoming: Order,
        fees: &FeeSchedule,
        policy: SelfTradePolicy,
    ) -> ExchangeResult<OrderOutcome> {
        let fills = self.plan_match(&incoming, policy)?;
        let trades = trades_from_fills(&incoming, &fills, fees)?;
        self.commit(&fills)?;
        for fill in &fills {
            incoming.fill(fill.quantity)?;
        }
        Ok(OrderOutcome::new(trades, incoming))
    }
}
