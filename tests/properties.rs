//! Property-based tests for exchange invariants
//!
//! These run random order flow through a fully wired exchange and check the
//! properties that must hold regardless of the sequence: priority, quantity
//! conservation, solvency, settlement symmetry and side-effect-free
//! rejection.

use std::collections::HashMap;

use proptest::prelude::*;
use quickcheck::quickcheck;
use rust_decimal::Decimal;
use security_exchange::domain::Liquidity;
use security_exchange::prelude::*;

// === TEST FIXTURES ===

const TRADERS: usize = 4;
const OPENING_CASH: Cash = 100_000_000;
const OPENING_SHARES: Position = 50;

/// Enough for a few full-size bids but not all of them, so funding checks bind
const TIGHT_CASH: Cash = 150_000;

/// Prices off any round grid, so basis-point fees land between minor units
const MIN_PRICE: Price = 9_501;
const MAX_PRICE: Price = 10_499;
const MID_PRICE: Price = 10_007;

fn trader(index: usize) -> TraderId {
    TraderId::from(format!("t{}", index))
}

fn xyz() -> Ticker {
    Ticker::from("XYZ")
}

fn exchange(shares: Position) -> Exchange {
    exchange_with_cash(OPENING_CASH, shares)
}

fn exchange_with_cash(cash: Cash, shares: Position) -> Exchange {
    let mut builder = ExchangeBuilder::strict()
        .with_fee_schedule(FeeSchedule::maker_taker(Decimal::from(5), Decimal::from(10)))
        .list_security("XYZ")
        .open_account("buyer", OPENING_CASH * 10);

    for i in 0..TRADERS {
        builder = builder
            .open_account(trader(i), cash)
            .with_position(trader(i), "XYZ", shares);
    }
    builder.build().unwrap()
}

#[derive(Debug, Clone)]
enum Action {
    Submit {
        trader: usize,
        side: Side,
        quantity: Quantity,
        price: Price,
    },
    /// Cancel one of the orders submitted so far, picked by index
    Cancel(usize),
}

fn action() -> impl Strategy<Value = Action> {
    let submit = (0..TRADERS, any::<bool>(), 1u64..=20, MIN_PRICE..=MAX_PRICE).prop_map(
        |(trader, bid, quantity, price)| Action::Submit {
            trader,
            side: if bid { Side::Bid } else { Side::Ask },
            quantity,
            price,
        },
    );
    prop_oneof![
        5 => submit,
        1 => any::<usize>().prop_map(Action::Cancel),
    ]
}

/// Apply actions and return the quantity of every order that was submitted
fn run(exchange: &mut Exchange, actions: Vec<Action>) -> HashMap<OrderId, Quantity> {
    let mut submitted = HashMap::new();
    let mut ids = Vec::new();

    for (timestamp, action) in actions.into_iter().enumerate() {
        match action {
            Action::Submit {
                trader: index,
                side,
                quantity,
                price,
            } => {
                let order = Order::new(trader(index), "XYZ", side, quantity, price);
                let id = order.id;
                if exchange.submit_order(order, timestamp as u64).is_ok() {
                    submitted.insert(id, quantity);
                    ids.push(id);
                }
            },
            Action::Cancel(pick) => {
                if !ids.is_empty() {
                    let _ = exchange.cancel_order(ids[pick % ids.len()]);
                }
            },
        }
    }

    submitted
}

fn accounts(exchange: &Exchange) -> Vec<Account> {
    let mut accounts: Vec<Account> = exchange.ledger().accounts().cloned().collect();
    accounts.sort_by(|a, b| a.trader_id.cmp(&b.trader_id));
    accounts
}

// === PROPERTIES ===

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_negative_state_under_strict_config(actions in prop::collection::vec(action(), 1..80)) {
        let mut ex = exchange_with_cash(TIGHT_CASH, OPENING_SHARES);
        run(&mut ex, actions);

        for account in ex.ledger().accounts() {
            prop_assert!(account.balance >= 0, "{} balance {}", account.trader_id, account.balance);
            prop_assert!(account.reserved_cash >= 0);
            prop_assert!(account.reserved_cash <= account.balance);

            let held = account.position(&xyz());
            prop_assert!(held >= 0, "{} position {}", account.trader_id, held);
            prop_assert!(account.reserved_position(&xyz()) <= held);
        }
    }

    #[test]
    fn quantity_is_conserved(actions in prop::collection::vec(action(), 1..80)) {
        let mut ex = exchange(OPENING_SHARES);
        let submitted = run(&mut ex, actions);

        let mut traded: HashMap<OrderId, Quantity> = HashMap::new();
        for trade in ex.trade_log() {
            prop_assert!(trade.quantity > 0);
            *traded.entry(trade.maker_order_id).or_insert(0) += trade.quantity;
            *traded.entry(trade.taker_order_id).or_insert(0) += trade.quantity;
        }
        for (id, quantity) in traded {
            prop_assert!(quantity <= submitted[&id], "order {} overfilled", id);
        }

        // Whatever rests still has something left to fill
        let book = ex.book(&xyz()).unwrap();
        for order in book.bids().orders().chain(book.asks().orders()) {
            prop_assert!(order.remaining_quantity() > 0);
            prop_assert!(order.remaining_quantity() <= submitted[&order.id]);
        }
    }

    #[test]
    fn settlement_is_symmetric(actions in prop::collection::vec(action(), 1..80)) {
        let mut ex = exchange(OPENING_SHARES);
        run(&mut ex, actions);

        let fees: Cash = ex.trades().map(|t| t.total_fees().unwrap()).sum();
        prop_assert_eq!(ex.get_total_fees(), fees);

        // Cash only moves between traders and the fee pool; shares only
        // between traders
        let cash: Cash = ex.ledger().accounts().map(|a| a.balance).sum();
        prop_assert_eq!(cash + fees, OPENING_CASH * (TRADERS as Cash + 10));

        let shares: Position = ex.ledger().accounts().map(|a| a.position(&xyz())).sum();
        prop_assert_eq!(shares, OPENING_SHARES * TRADERS as Position);

        for trade in ex.trades() {
            prop_assert_eq!(trade.total_value, trade.quantity as Cash * trade.price);
            prop_assert!(!trade.is_self_trade());
        }
    }

    #[test]
    fn rejection_changes_nothing(
        actions in prop::collection::vec(action(), 0..40),
        index in 0..TRADERS,
    ) {
        let mut ex = exchange(OPENING_SHARES);
        run(&mut ex, actions);

        let before_accounts = accounts(&ex);
        let before_book = ex.snapshot(&xyz(), 100);
        let before_trades = ex.trade_log().len();
        let before_fees = ex.get_total_fees();

        let available = ex.available_position(&trader(index), &xyz()).unwrap();
        let oversold = Order::ask(trader(index), "XYZ", available as Quantity + 1, MID_PRICE);
        prop_assert!(ex.submit_order(oversold, 1_000).unwrap_err().is_rejection());

        let unknown = Order::bid("ghost", "XYZ", 1, MID_PRICE);
        prop_assert!(ex.submit_order(unknown, 1_001).unwrap_err().is_rejection());

        prop_assert_eq!(accounts(&ex), before_accounts);
        prop_assert_eq!(ex.snapshot(&xyz(), 100), before_book);
        prop_assert_eq!(ex.trade_log().len(), before_trades);
        prop_assert_eq!(ex.get_total_fees(), before_fees);
    }

    #[test]
    fn bid_sweep_follows_price_time_priority(
        asks in prop::collection::vec((1u64..=10, MIN_PRICE..=MAX_PRICE), 1..30),
    ) {
        let mut ex = exchange(1_000);
        let mut arrival = HashMap::new();

        for (timestamp, (quantity, price)) in asks.iter().enumerate() {
            let order = Order::ask(trader(timestamp % TRADERS), "XYZ", *quantity, *price);
            arrival.insert(order.id, timestamp);
            ex.submit_order(order, timestamp as u64).unwrap();
        }

        let total: Quantity = asks.iter().map(|(quantity, _)| quantity).sum();
        let outcome = ex
            .submit_order(Order::bid("buyer", "XYZ", total, MAX_PRICE), 1_000)
            .unwrap();
        prop_assert!(outcome.is_fully_filled());

        // Lowest ask first, earliest first within a level
        let keys: Vec<(Price, usize)> = outcome
            .resulting_trades
            .iter()
            .map(|t| (t.price, arrival[&t.maker_order_id]))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
        prop_assert!(ex.book(&xyz()).unwrap().asks().is_empty());
    }

    #[test]
    fn ask_sweep_follows_price_time_priority(
        bids in prop::collection::vec((1u64..=10, MIN_PRICE..=MAX_PRICE), 1..30),
    ) {
        let mut ex = exchange(1_000);
        let mut arrival = HashMap::new();
        let seller = TRADERS - 1;

        for (timestamp, (quantity, price)) in bids.iter().enumerate() {
            let order = Order::bid(trader(timestamp % seller), "XYZ", *quantity, *price);
            arrival.insert(order.id, timestamp);
            ex.submit_order(order, timestamp as u64).unwrap();
        }

        let total: Quantity = bids.iter().map(|(quantity, _)| quantity).sum();
        let outcome = ex
            .submit_order(Order::ask(trader(seller), "XYZ", total, MIN_PRICE), 1_000)
            .unwrap();
        prop_assert!(outcome.is_fully_filled());

        // Highest bid first, earliest first within a level
        let keys: Vec<(Price, usize)> = outcome
            .resulting_trades
            .iter()
            .map(|t| (-t.price, arrival[&t.maker_order_id]))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
        prop_assert!(ex.book(&xyz()).unwrap().bids().is_empty());
    }
}

// === FEE ARITHMETIC ===

quickcheck! {
    fn fee_is_never_negative(notional: u32, maker: u16, taker: u16) -> bool {
        let schedule = FeeSchedule::maker_taker(Decimal::from(maker), Decimal::from(taker));
        let notional = Cash::from(notional);
        schedule.fee(notional, Liquidity::Maker).map_or(false, |fee| fee >= 0)
            && schedule.fee(notional, Liquidity::Taker).map_or(false, |fee| fee >= 0)
    }

    fn zero_schedule_charges_nothing(notional: u32) -> bool {
        FeeSchedule::zero().fee(Cash::from(notional), Liquidity::Taker) == Ok(0)
    }

    fn fee_grows_with_notional(a: u32, b: u32, bps: u8) -> bool {
        let schedule = FeeSchedule::flat(Decimal::from(bps));
        let (low, high) = (Cash::from(a.min(b)), Cash::from(a.max(b)));
        match (schedule.fee(low, Liquidity::Maker), schedule.fee(high, Liquidity::Maker)) {
            (Ok(low), Ok(high)) => low <= high,
            _ => false,
        }
    }

    fn worst_case_covers_both_roles(notional: u32, maker: u16, taker: u16) -> bool {
        let schedule = FeeSchedule::maker_taker(Decimal::from(maker), Decimal::from(taker));
        let notional = Cash::from(notional);
        match (
            schedule.worst_case_fee(notional),
            schedule.fee(notional, Liquidity::Maker),
            schedule.fee(notional, Liquidity::Taker),
        ) {
            (Ok(worst), Ok(maker), Ok(taker)) => worst >= maker && worst >= taker,
            _ => false,
        }
    }
}
