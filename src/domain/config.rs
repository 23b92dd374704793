// ============================================================================
// Exchange Configuration
// Fee schedule, self-trade handling and pre-trade funding policy
// ============================================================================

use super::fees::FeeSchedule;
use crate::error::ConfigError;
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Self-Trade Policy
// ============================================================================

/// What happens when an incoming order would match a resting order from
/// the same trader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelfTradePolicy {
    /// Match normally; the trader trades with themself
    Allow,
    /// Leave the trader's resting order in place and continue with the next
    /// resting order in priority.
    ///
    /// A remainder that rests afterwards can sit through the skipped order,
    /// leaving the book crossed for that trader (negative spread) until one
    /// side is cancelled or matched.
    #[default]
    SkipResting,
}

// ============================================================================
// Funding Check
// ============================================================================

/// How much cash a bid must be backed by at validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FundingCheck {
    /// `quantity * limit_price`; fees are charged only on execution
    #[default]
    Notional,
    /// Notional plus an upper bound on the buyer fees of every possible split
    /// into fills, so settlement can never take a balance below zero
    NotionalPlusFees,
}

// ============================================================================
// Complete Exchange Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExchangeConfig {
    pub fee_schedule: FeeSchedule,

    pub self_trade_policy: SelfTradePolicy,

    /// Reserve cash for resting bids and shares for resting asks so a trader's
    /// resting orders cannot over-commit in aggregate
    pub reserve_resting: bool,

    pub funding_check: FundingCheck,

    /// Default number of price levels in reporting snapshots
    pub snapshot_depth: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            fee_schedule: FeeSchedule::zero(),
            self_trade_policy: SelfTradePolicy::SkipResting,
            reserve_resting: true,
            funding_check: FundingCheck::Notional,
            snapshot_depth: 10,
        }
    }
}

impl ExchangeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: Set the fee schedule
    pub fn with_fee_schedule(mut self, fee_schedule: FeeSchedule) -> Self {
        self.fee_schedule = fee_schedule;
        self
    }

    /// Builder method: Flat fee in basis points for makers and takers
    pub fn with_flat_fee_bps(mut self, bps: Decimal) -> Self {
        self.fee_schedule = FeeSchedule::flat(bps);
        self
    }

    pub fn with_self_trade_policy(mut self, policy: SelfTradePolicy) -> Self {
        self.self_trade_policy = policy;
        self
    }

    pub fn with_reservations(mut self, reserve_resting: bool) -> Self {
        self.reserve_resting = reserve_resting;
        self
    }

    pub fn with_funding_check(mut self, funding_check: FundingCheck) -> Self {
        self.funding_check = funding_check;
        self
    }

    pub fn with_snapshot_depth(mut self, depth: usize) -> Self {
        self.snapshot_depth = depth;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fee_schedule.validate()?;

        if self.snapshot_depth == 0 {
            return Err(ConfigError::ZeroSnapshotDepth);
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration document. Missing fields take
    /// their default values.
    #[cfg(feature = "serde")]
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

impl ExchangeConfig {
    /// Reservations on and bids funded for the most their fills can be
    /// charged: no validated order can ever drive a balance or position
    /// negative
    pub fn strict() -> Self {
        Self::default()
            .with_reservations(true)
            .with_funding_check(FundingCheck::NotionalPlusFees)
    }

    /// Only the immediately available balance and position are checked
    pub fn permissive() -> Self {
        Self::default()
            .with_reservations(false)
            .with_self_trade_policy(SelfTradePolicy::Allow)
    }
}
