// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod account;
pub mod config;
pub mod fees;
pub mod half_book;
pub mod order;
pub mod order_book;
pub mod outcome;
pub mod security;
pub mod trade;

pub use account::Account;
pub use config::{ExchangeConfig, FundingCheck, SelfTradePolicy};
pub use fees::{FeeSchedule, Liquidity};
pub use half_book::{HalfBook, LevelSummary, PriceLevel};
pub use order::{Order, OrderId, Side, Ticker, TraderId};
pub use order_book::{OrderBook, OrderBookSnapshot};
pub use outcome::{Fill, OrderOutcome, Trades};
pub use security::SecurityList;
pub use trade::{Trade, TradeLog};

// Re-export state machine
pub use order::state;
pub use order::state::{OrderState, OrderStateTransition};
