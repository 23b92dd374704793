// ============================================================================
// Exchange
// Validates orders, drives matching and settles trades against the ledger
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use super::ledger::{Ledger, LedgerOp};
use crate::domain::outcome::trades_from_fills;
use crate::domain::state::{OrderState, OrderStateTransition};
use crate::domain::{
    Account, ExchangeConfig, Fill, FundingCheck, Order, OrderBook, OrderBookSnapshot, OrderId,
    OrderOutcome, SecurityList, Side, Ticker, Trade, TradeLog, TraderId,
};
use crate::error::{ExchangeError, ExchangeResult, RejectReason};
use crate::interfaces::{EventHandler, OrderEvent};
use crate::numeric::{checked_cash_add, notional, quantity_as_position, Cash, Position, Quantity};

/// What a resting order holds back from its trader's account
#[derive(Debug, Clone)]
struct Reservation {
    trader: TraderId,
    ticker: Ticker,
    held: Held,
}

#[derive(Debug, Clone, Copy)]
enum Held {
    Cash(Cash),
    Shares(Quantity),
}

impl Reservation {
    fn release_op(&self, held: Held) -> LedgerOp {
        match held {
            Held::Cash(amount) => LedgerOp::ReleaseCash {
                trader: self.trader.clone(),
                amount,
            },
            Held::Shares(quantity) => LedgerOp::ReleaseShares {
                trader: self.trader.clone(),
                ticker: self.ticker.clone(),
                quantity,
            },
        }
    }

    fn release_all_op(&self) -> LedgerOp {
        self.release_op(self.held)
    }
}

/// Single-security exchange core.
///
/// All mutation goes through `&mut self`, so one submission or cancel is
/// fully applied before the next is looked at. Share it across threads with
/// [`crate::engine::sequencer::ExchangeService`].
pub struct Exchange {
    config: ExchangeConfig,
    securities: SecurityList,
    books: HashMap<Ticker, OrderBook>,
    ledger: Ledger,
    trade_log: TradeLog,
    total_fees: Cash,
    reservations: HashMap<OrderId, Reservation>,
    event_handler: Arc<dyn EventHandler>,
    sequence: u64,
}

impl Exchange {
    /// Create an exchange with one order book per listed security
    pub fn new(
        config: ExchangeConfig,
        securities: SecurityList,
        ledger: Ledger,
        event_handler: Arc<dyn EventHandler>,
    ) -> ExchangeResult<Self> {
        config.validate()?;

        let books = securities
            .iter()
            .map(|ticker| (ticker.clone(), OrderBook::new(ticker.clone())))
            .collect();

        Ok(Self {
            config,
            securities,
            books,
            ledger,
            trade_log: TradeLog::new(),
            total_fees: 0,
            reservations: HashMap::new(),
            event_handler,
            sequence: 0,
        })
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Whether the order would be accepted right now. Failures are logged.
    pub fn validate_order(&self, order: &Order) -> bool {
        match self.check_order(order) {
            Ok(()) => true,
            Err(reason) => {
                warn!(order_id = %order.id, trader = %order.trader_id, %reason, "order failed validation");
                false
            },
        }
    }

    /// Pre-trade checks against the registry and the trader's account
    pub fn check_order(&self, order: &Order) -> Result<(), RejectReason> {
        if order.state() != OrderState::New {
            return Err(RejectReason::AlreadyProcessed {
                order_id: order.id,
                state: order.state(),
            });
        }
        if order.quantity == 0 || order.remaining_quantity() == 0 {
            return Err(RejectReason::ZeroQuantity);
        }
        if order.limit_price <= 0 {
            return Err(RejectReason::NonPositivePrice(order.limit_price));
        }
        if !self.securities.contains(&order.ticker) {
            return Err(RejectReason::UnknownSecurity(order.ticker.clone()));
        }
        let account = self
            .ledger
            .get_account(&order.trader_id)
            .ok_or_else(|| RejectReason::UnknownTrader(order.trader_id.clone()))?;
        if self.order(order.id).is_some() {
            return Err(RejectReason::DuplicateOrderId(order.id));
        }

        let quantity = order.remaining_quantity();
        match order.side {
            Side::Ask => {
                let required =
                    quantity_as_position(quantity).map_err(|_| RejectReason::NotionalOverflow)?;
                let available = self.shares_available(account, &order.ticker);
                if available < required {
                    return Err(RejectReason::InsufficientShares {
                        required,
                        available,
                    });
                }
            },
            Side::Bid => {
                let required = self
                    .required_cash(quantity, order.limit_price)
                    .map_err(|_| RejectReason::NotionalOverflow)?;
                let available = self.cash_available(account);
                if available < required {
                    return Err(RejectReason::InsufficientFunds {
                        required,
                        available,
                    });
                }
            },
        }

        Ok(())
    }

    fn shares_available(&self, account: &Account, ticker: &Ticker) -> Position {
        if self.config.reserve_resting {
            account.available_position(ticker)
        } else {
            account.position(ticker)
        }
    }

    fn cash_available(&self, account: &Account) -> Cash {
        if self.config.reserve_resting {
            account.available_balance()
        } else {
            account.balance
        }
    }

    /// Cash a bid of `quantity` at `price` must be backed by
    fn required_cash(&self, quantity: Quantity, price: i64) -> ExchangeResult<Cash> {
        let value = notional(quantity, price)?;
        match self.config.funding_check {
            FundingCheck::Notional => Ok(value),
            FundingCheck::NotionalPlusFees => {
                let fee = self.config.fee_schedule.fee_bound(value, quantity)?;
                Ok(checked_cash_add(value, fee)?)
            },
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Validate, match and settle an order arriving at `timestamp`.
    ///
    /// A rejected order returns `ExchangeError::Rejected` and changes nothing.
    /// Otherwise the book, trade log, ledger and fee total are updated
    /// together; an invariant violation aborts before any of them change.
    pub fn submit_order(&mut self, order: Order, timestamp: u64) -> ExchangeResult<OrderOutcome> {
        if let Err(reason) = self.check_order(&order) {
            warn!(order_id = %order.id, trader = %order.trader_id, %reason, "order rejected");
            self.event_handler.on_event(OrderEvent::OrderRejected {
                order_id: order.id,
                trader_id: order.trader_id.clone(),
                reason: reason.clone(),
                timestamp: Utc::now(),
            });
            return Err(reason.into());
        }

        match self.execute(order, timestamp) {
            Ok((outcome, events)) => {
                self.event_handler.on_events(events);
                Ok(outcome)
            },
            Err(e) => {
                error!(error = %e, "order aborted");
                Err(e)
            },
        }
    }

    fn execute(
        &mut self,
        mut order: Order,
        timestamp: u64,
    ) -> ExchangeResult<(OrderOutcome, Vec<OrderEvent>)> {
        let sequence = self.sequence + 1;
        order.stamp(timestamp, sequence);

        let book = self
            .books
            .get(&order.ticker)
            .ok_or_else(|| ExchangeError::invariant(format!("no book for {}", order.ticker)))?;

        // Plan: nothing below mutates until every fallible step has passed
        let fills = book.plan(&order, self.config.self_trade_policy)?;
        let trades = trades_from_fills(&order, &fills, &self.config.fee_schedule)?;

        let mut residual = order;
        for fill in &fills {
            residual.fill(fill.quantity)?;
        }
        let rests = !residual.is_filled();
        if rests {
            residual.apply(OrderStateTransition::Rest)?;
        }

        let mut ops: Vec<LedgerOp> = trades.iter().flat_map(LedgerOp::settlement).collect();
        let mut reservation_updates = Vec::new();
        if self.config.reserve_resting {
            for fill in &fills {
                let (op, update) = self.release_for_fill(fill)?;
                ops.push(op);
                reservation_updates.push((fill.resting_order_id, update));
            }
            if rests {
                let reservation = self.reservation_for(&residual)?;
                ops.push(match reservation.held {
                    Held::Cash(amount) => LedgerOp::ReserveCash {
                        trader: reservation.trader.clone(),
                        amount,
                    },
                    Held::Shares(quantity) => LedgerOp::ReserveShares {
                        trader: reservation.trader.clone(),
                        ticker: reservation.ticker.clone(),
                        quantity,
                    },
                });
                reservation_updates.push((residual.id, Some(reservation)));
            }
        }

        let fees = trades
            .iter()
            .try_fold(0, |acc: Cash, trade| checked_cash_add(acc, trade.total_fees()?))?;
        let total_fees = checked_cash_add(self.total_fees, fees)?;
        let batch = self.ledger.prepare(ops)?;

        // Commit
        let book = self
            .books
            .get_mut(&residual.ticker)
            .ok_or_else(|| ExchangeError::invariant("book vanished"))?;
        book.commit(residual.side, &fills)?;
        if rests {
            book.rest(residual.clone())?;
        }
        self.ledger.commit(batch);
        self.trade_log.append(trades.iter().cloned());
        self.total_fees = total_fees;
        self.sequence = sequence;
        for (order_id, update) in reservation_updates {
            match update {
                Some(reservation) => self.reservations.insert(order_id, reservation),
                None => self.reservations.remove(&order_id),
            };
        }

        let events = self.submission_events(&residual, &fills, &trades);
        debug!(
            order_id = %residual.id,
            trades = trades.len(),
            remaining = residual.remaining_quantity(),
            "order processed"
        );

        Ok((OrderOutcome::new(trades, residual), events))
    }

    /// Release the part of a resting order's reservation used by `fill`.
    /// Returns the ledger op and the order's reservation afterwards.
    fn release_for_fill(&self, fill: &Fill) -> ExchangeResult<(LedgerOp, Option<Reservation>)> {
        let reservation = self
            .reservations
            .get(&fill.resting_order_id)
            .ok_or_else(|| {
                ExchangeError::invariant(format!(
                    "resting order {} has no reservation",
                    fill.resting_order_id
                ))
            })?;

        if fill.resting_exhausted {
            return Ok((reservation.release_all_op(), None));
        }

        let (used, left) = match reservation.held {
            Held::Cash(held) => {
                let used = self.required_cash(fill.quantity, fill.price)?.min(held);
                (Held::Cash(used), Held::Cash(held - used))
            },
            Held::Shares(held) => {
                let used = fill.quantity.min(held);
                (Held::Shares(used), Held::Shares(held - used))
            },
        };

        let mut remaining = reservation.clone();
        remaining.held = left;
        Ok((reservation.release_op(used), Some(remaining)))
    }

    fn reservation_for(&self, order: &Order) -> ExchangeResult<Reservation> {
        let held = match order.side {
            Side::Bid => Held::Cash(self.required_cash(order.remaining_quantity(), order.limit_price)?),
            Side::Ask => Held::Shares(order.remaining_quantity()),
        };
        Ok(Reservation {
            trader: order.trader_id.clone(),
            ticker: order.ticker.clone(),
            held,
        })
    }

    fn submission_events(&self, order: &Order, fills: &[Fill], trades: &[Trade]) -> Vec<OrderEvent> {
        let now = Utc::now();
        let mut events = Vec::with_capacity(trades.len() + fills.len() + 2);

        events.push(OrderEvent::OrderAccepted {
            order_id: order.id,
            trader_id: order.trader_id.clone(),
            timestamp: now,
        });
        for (fill, trade) in fills.iter().zip(trades) {
            events.push(OrderEvent::TradeExecuted {
                trade: trade.clone(),
                timestamp: now,
            });
            if fill.resting_exhausted {
                events.push(OrderEvent::OrderFilled {
                    order_id: fill.resting_order_id,
                    timestamp: now,
                });
            }
        }
        if order.is_filled() {
            events.push(OrderEvent::OrderFilled {
                order_id: order.id,
                timestamp: now,
            });
        } else {
            events.push(OrderEvent::OrderRested {
                order_id: order.id,
                side: order.side,
                price: order.limit_price,
                remaining: order.remaining_quantity(),
                timestamp: now,
            });
        }

        events
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Remove a resting order by identity and release what it held.
    ///
    /// Fails with `OrderNotFound` if the order was never resting, has
    /// already been filled or was already cancelled.
    pub fn cancel_order(&mut self, order_id: OrderId) -> ExchangeResult<Order> {
        let (ticker, state) = self
            .books
            .iter()
            .find_map(|(ticker, book)| {
                book.get(order_id)
                    .map(|order| (ticker.clone(), order.state()))
            })
            .ok_or(ExchangeError::OrderNotFound(order_id))?;
        if !state.can_be_cancelled() {
            return Err(ExchangeError::invariant(format!(
                "order {} rests in state {:?}",
                order_id, state
            )));
        }

        let batch = match self.reservations.get(&order_id) {
            Some(reservation) => Some(self.ledger.prepare([reservation.release_all_op()])?),
            None => None,
        };

        let book = self
            .books
            .get_mut(&ticker)
            .ok_or_else(|| ExchangeError::invariant("book vanished"))?;
        let mut order = book
            .cancel(order_id)
            .ok_or(ExchangeError::OrderNotFound(order_id))?;
        order.apply(OrderStateTransition::Cancel)?;

        if let Some(batch) = batch {
            self.ledger.commit(batch);
        }
        self.reservations.remove(&order_id);

        debug!(order_id = %order_id, remaining = order.remaining_quantity(), "order cancelled");
        self.event_handler.on_event(OrderEvent::OrderCancelled {
            order_id,
            remaining: order.remaining_quantity(),
            timestamp: Utc::now(),
        });

        Ok(order)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get_account(&self, trader: &TraderId) -> Option<&Account> {
        self.ledger.get_account(trader)
    }

    /// Balance a new bid can draw on
    pub fn available_balance(&self, trader: &TraderId) -> Option<Cash> {
        self.get_account(trader)
            .map(|account| self.cash_available(account))
    }

    /// Shares a new ask can draw on
    pub fn available_position(&self, trader: &TraderId, ticker: &Ticker) -> Option<Position> {
        self.get_account(trader)
            .map(|account| self.shares_available(account, ticker))
    }

    pub fn get_total_fees(&self) -> Cash {
        self.total_fees
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.trade_log
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trade_log.iter()
    }

    /// A resting order by id
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.books.values().find_map(|book| book.get(order_id))
    }

    /// A trader's resting orders, in matching priority per side
    pub fn open_orders(&self, trader: &TraderId) -> Vec<&Order> {
        self.books
            .values()
            .flat_map(|book| book.bids().orders().chain(book.asks().orders()))
            .filter(|order| &order.trader_id == trader)
            .collect()
    }

    pub fn book(&self, ticker: &Ticker) -> Option<&OrderBook> {
        self.books.get(ticker)
    }

    pub fn snapshot(&self, ticker: &Ticker, depth: usize) -> Option<OrderBookSnapshot> {
        self.book(ticker).map(|book| book.snapshot(depth))
    }

    /// Snapshot at the configured default depth
    pub fn default_snapshot(&self, ticker: &Ticker) -> Option<OrderBookSnapshot> {
        self.snapshot(ticker, self.config.snapshot_depth)
    }

    pub fn securities(&self) -> &SecurityList {
        &self.securities
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }
}
