// ============================================================================
// Basic Usage Example
// ============================================================================

use rust_decimal::Decimal;
use security_exchange::prelude::*;
use std::sync::Arc;

fn main() -> Result<(), ExchangeError> {
    #[cfg(feature = "logging")]
    security_exchange::utils::init_logging(tracing::Level::DEBUG);

    println!("=== Security Exchange Example ===\n");

    let events = Arc::new(RecordingEventHandler::new());
    let mut builder = ExchangeBuilder::new()
        .with_fee_schedule(FeeSchedule::maker_taker(Decimal::from(2), Decimal::from(5)))
        .with_event_handler(events.clone())
        .list_security("XYZ")
        .open_account("market_buyer", 1_000_000);

    for i in 0..5 {
        let seller = format!("seller_{}", i);
        builder = builder
            .open_account(seller.as_str(), 0)
            .with_position(seller.as_str(), "XYZ", 10);
        builder = builder.open_account(format!("buyer_{}", i), 100_000);
    }
    let mut exchange = builder.build()?;
    let xyz = Ticker::from("XYZ");

    println!("Listed XYZ with {} accounts\n", exchange.ledger().len());

    let mut timestamp = 0;
    let mut tick = || {
        timestamp += 1;
        timestamp
    };

    println!("Adding asks...");
    for i in 0..5 {
        let ask = Order::ask(format!("seller_{}", i), "XYZ", 1, 5_000 + i * 100);
        exchange.submit_order(ask, tick())?;
    }

    println!("Adding bids...");
    for i in 0..5 {
        let bid = Order::bid(format!("buyer_{}", i), "XYZ", 1, 4_900 - i * 100);
        exchange.submit_order(bid, tick())?;
    }

    println!("\n=== Order Book Snapshot ===");
    if let Some(snapshot) = exchange.snapshot(&xyz, 5) {
        println!("\nBids:");
        for level in &snapshot.bids {
            println!("  {} @ {} ({} orders)", level.quantity, level.price, level.order_count);
        }
        println!("\nAsks:");
        for level in &snapshot.asks {
            println!("  {} @ {} ({} orders)", level.quantity, level.price, level.order_count);
        }
        println!("\nSpread: {:?}", snapshot.spread);
        println!("Mid Price: {:?}", snapshot.mid_price);
    }

    println!("\n=== Rejected Order ===");
    let naked_short = Order::ask("market_buyer", "XYZ", 1, 5_000);
    if let Err(e) = exchange.submit_order(naked_short, tick()) {
        println!("  {}", e);
    }

    println!("\n=== Submitting Crossing Bid ===");
    events.take();
    let crossing = Order::bid("market_buyer", "XYZ", 3, 5_200);
    let outcome = exchange.submit_order(crossing, tick())?;
    println!(
        "Filled {} of 3, {} left resting",
        outcome.filled_quantity(),
        outcome.unfulfilled_order.remaining_quantity()
    );

    println!("\nEvents generated:");
    for event in events.take() {
        match event {
            OrderEvent::TradeExecuted { trade, .. } => {
                println!(
                    "  Trade: {} buys {} from {} @ {} (fees {} / {})",
                    trade.buyer_id,
                    trade.quantity,
                    trade.seller_id,
                    trade.price,
                    trade.buyer_fee,
                    trade.seller_fee
                );
            },
            OrderEvent::OrderFilled { order_id, .. } => {
                println!("  Order {} filled", order_id);
            },
            _ => {},
        }
    }

    println!("\n=== Accounts ===");
    let buyer = TraderId::from("market_buyer");
    if let Some(account) = exchange.get_account(&buyer) {
        println!(
            "market_buyer: balance {}, XYZ {}",
            account.balance,
            account.position(&xyz)
        );
    }
    println!("Total fees collected: {}", exchange.get_total_fees());

    println!("\n=== Final Order Book ===");
    if let Some(snapshot) = exchange.snapshot(&xyz, 10) {
        println!("Bids: {} levels", snapshot.bids.len());
        println!("Asks: {} levels", snapshot.asks.len());
        println!("Spread: {:?}", snapshot.spread);
    }

    Ok(())
}
