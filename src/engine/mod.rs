// ============================================================================
// Engine Module
// Exchange facade, settlement ledger and the services that drive them
// ============================================================================

pub mod exchange;
pub mod factory;
pub mod ledger;
pub mod sequencer;

#[cfg(feature = "async")]
pub mod async_service;

pub use exchange::Exchange;
pub use factory::{create_from_config, ExchangeBuilder};
pub use ledger::{Ledger, LedgerOp, PreparedBatch};
pub use sequencer::{ExchangeHandle, ExchangeService};

#[cfg(feature = "async")]
pub use async_service::AsyncExchangeHandle;
