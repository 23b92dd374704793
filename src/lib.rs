// ============================================================================
// Security Exchange Library
// Price/time limit order matching with fee-aware account settlement
// ============================================================================

//! # Security Exchange
//!
//! The core of a simulated stock exchange: listed securities, trader
//! accounts, one limit order book per security and a trade log.
//!
//! ## Features
//!
//! - **Price/time priority** matching; trades execute at the resting price
//! - **Pre-trade validation**: no naked shorts, no unfunded bids
//! - **Reservations** so a trader's resting orders cannot over-commit
//! - **Maker/taker fees** in basis points, settled with every trade
//! - **All-or-nothing submissions**: matching and settlement are planned
//!   before anything is committed
//! - **Single-writer service** on its own thread (or a tokio task with the
//!   `async` feature) for concurrent producers
//!
//! ## Example
//!
//! ```rust
//! use security_exchange::prelude::*;
//! use rust_decimal::Decimal;
//!
//! let mut exchange = ExchangeBuilder::new()
//!     .with_flat_fee_bps(Decimal::from(10))
//!     .list_security("XYZ")
//!     .open_account("alice", 100_000)
//!     .open_account("bob", 0)
//!     .with_position("bob", "XYZ", 10)
//!     .build()
//!     .unwrap();
//!
//! // Nothing to match yet, so the bid rests
//! exchange.submit_order(Order::bid("alice", "XYZ", 10, 500), 1).unwrap();
//!
//! let outcome = exchange
//!     .submit_order(Order::ask("bob", "XYZ", 10, 500), 2)
//!     .unwrap();
//! assert_eq!(outcome.resulting_trades.len(), 1);
//!
//! let alice = exchange.get_account(&TraderId::from("alice")).unwrap();
//! assert_eq!(alice.position(&Ticker::from("XYZ")), 10);
//! assert_eq!(alice.balance, 100_000 - 5_000 - 5);
//! assert_eq!(exchange.get_total_fees(), 10);
//! ```

pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod numeric;
pub mod utils;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::order::state::{OrderState, OrderStateTransition};
    pub use crate::domain::{
        Account, ExchangeConfig, FeeSchedule, FundingCheck, LevelSummary, Order, OrderBook,
        OrderBookSnapshot, OrderId, OrderOutcome, SecurityList, SelfTradePolicy, Side, Ticker,
        Trade, TradeLog, TraderId,
    };
    pub use crate::engine::{
        create_from_config, Exchange, ExchangeBuilder, ExchangeHandle, ExchangeService, Ledger,
    };
    pub use crate::error::{ConfigError, ExchangeError, ExchangeResult, RejectReason};
    pub use crate::interfaces::{
        ChannelEventHandler, EventHandler, LoggingEventHandler, NoOpEventHandler, OrderEvent,
        RecordingEventHandler,
    };
    pub use crate::numeric::{Cash, Position, Price, Quantity};
}
