// ============================================================================
// Exchange Factory
// Assembles an exchange from configuration, listings and opening accounts
// ============================================================================

use crate::domain::{ExchangeConfig, FeeSchedule, SecurityList, Ticker, TraderId};
use crate::engine::exchange::Exchange;
use crate::engine::ledger::Ledger;
use crate::error::{ConfigError, ExchangeResult};
use crate::interfaces::{EventHandler, NoOpEventHandler};
use crate::numeric::{Cash, Position};
use std::sync::Arc;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates an exchange from configuration and a list of tickers, with no
/// accounts opened yet.
///
/// # Example
/// ```
/// use security_exchange::prelude::*;
/// use security_exchange::engine::factory::create_from_config;
/// use std::sync::Arc;
///
/// let exchange = create_from_config(
///     ExchangeConfig::default(),
///     ["XYZ"],
///     Arc::new(NoOpEventHandler),
/// )
/// .unwrap();
/// assert!(exchange.securities().contains(&Ticker::from("XYZ")));
/// ```
pub fn create_from_config<I, T>(
    config: ExchangeConfig,
    tickers: I,
    event_handler: Arc<dyn EventHandler>,
) -> ExchangeResult<Exchange>
where
    I: IntoIterator<Item = T>,
    T: Into<Ticker>,
{
    let mut securities = SecurityList::new();
    for ticker in tickers {
        securities.add(ticker.into())?;
    }
    Exchange::new(config, securities, Ledger::new(), event_handler)
}

// ============================================================================
// Builder Pattern
// ============================================================================

/// Fluent construction of an exchange with its opening state.
///
/// Construction errors (duplicate listings, positions for unknown traders)
/// surface from [`ExchangeBuilder::build`].
///
/// # Example
/// ```
/// use security_exchange::prelude::*;
/// use rust_decimal::Decimal;
///
/// let exchange = ExchangeBuilder::new()
///     .with_flat_fee_bps(Decimal::from(10))
///     .list_security("XYZ")
///     .open_account("a", 100_000)
///     .open_account("b", 0)
///     .with_position("b", "XYZ", 10)
///     .build()
///     .unwrap();
///
/// assert_eq!(exchange.available_position(&"b".into(), &"XYZ".into()), Some(10));
/// ```
pub struct ExchangeBuilder {
    config: ExchangeConfig,
    tickers: Vec<Ticker>,
    accounts: Vec<(TraderId, Cash)>,
    positions: Vec<(TraderId, Ticker, Position)>,
    event_handler: Arc<dyn EventHandler>,
}

impl Default for ExchangeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeBuilder {
    pub fn new() -> Self {
        Self {
            config: ExchangeConfig::default(),
            tickers: Vec::new(),
            accounts: Vec::new(),
            positions: Vec::new(),
            event_handler: Arc::new(NoOpEventHandler),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_fee_schedule(mut self, fee_schedule: FeeSchedule) -> Self {
        self.config.fee_schedule = fee_schedule;
        self
    }

    /// Same rate for maker and taker
    pub fn with_flat_fee_bps(mut self, bps: rust_decimal::Decimal) -> Self {
        self.config = self.config.with_flat_fee_bps(bps);
        self
    }

    pub fn with_event_handler(mut self, event_handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = event_handler;
        self
    }

    // ========================================================================
    // Opening State
    // ========================================================================

    pub fn list_security(mut self, ticker: impl Into<Ticker>) -> Self {
        self.tickers.push(ticker.into());
        self
    }

    pub fn open_account(mut self, trader: impl Into<TraderId>, balance: Cash) -> Self {
        self.accounts.push((trader.into(), balance));
        self
    }

    /// Opening share position; trader and ticker must also be registered
    pub fn with_position(
        mut self,
        trader: impl Into<TraderId>,
        ticker: impl Into<Ticker>,
        quantity: Position,
    ) -> Self {
        self.positions.push((trader.into(), ticker.into(), quantity));
        self
    }

    // ========================================================================
    // Presets
    // ========================================================================

    /// Reservations on, fees counted in the funding check
    pub fn strict() -> Self {
        Self::new().with_config(ExchangeConfig::strict())
    }

    /// No reservations, self-trades allowed
    pub fn permissive() -> Self {
        Self::new().with_config(ExchangeConfig::permissive())
    }

    // ========================================================================
    // Build
    // ========================================================================

    pub fn build(self) -> ExchangeResult<Exchange> {
        let mut securities = SecurityList::new();
        for ticker in self.tickers {
            securities.add(ticker)?;
        }

        let mut ledger = Ledger::new();
        for (trader, balance) in self.accounts {
            ledger.open_account(trader, balance)?;
        }

        for (trader, ticker, quantity) in self.positions {
            if !securities.contains(&ticker) {
                return Err(ConfigError::DanglingPosition {
                    trader,
                    what: format!("security {}", ticker),
                }
                .into());
            }
            if !ledger.contains(&trader) {
                return Err(ConfigError::DanglingPosition {
                    what: format!("trader {}", trader),
                    trader,
                }
                .into());
            }
            ledger.set_position(&trader, ticker, quantity)?;
        }

        Exchange::new(self.config, securities, ledger, self.event_handler)
    }

    /// Get the configuration without building (for inspection)
    pub fn get_config(&self) -> &ExchangeConfig {
        &self.config
    }
}
