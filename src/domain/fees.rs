// ============================================================================
// Fee Schedule
// Basis-point fees charged on executed notional
// ============================================================================

use crate::error::ConfigError;
use crate::numeric::{Cash, NumericError, NumericResult, Quantity};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a participant supplied or removed liquidity in a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liquidity {
    /// Resting order
    Maker,
    /// Incoming order
    Taker,
}

/// Maker/taker fee rates in basis points of trade notional.
///
/// Fees are never negative: rebates are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeeSchedule {
    pub maker_bps: Decimal,
    pub taker_bps: Decimal,
}

const BPS_PER_UNIT: i64 = 10_000;

impl FeeSchedule {
    pub fn zero() -> Self {
        Self::flat(Decimal::ZERO)
    }

    /// Same rate for both sides of every trade.
    pub fn flat(bps: Decimal) -> Self {
        Self::maker_taker(bps, bps)
    }

    pub fn maker_taker(maker_bps: Decimal, taker_bps: Decimal) -> Self {
        Self {
            maker_bps,
            taker_bps,
        }
    }

    pub fn rate(&self, liquidity: Liquidity) -> Decimal {
        match liquidity {
            Liquidity::Maker => self.maker_bps,
            Liquidity::Taker => self.taker_bps,
        }
    }

    /// Fee owed on `notional` by a participant with the given liquidity role.
    ///
    /// Rounds half away from zero to whole minor units.
    pub fn fee(&self, notional: Cash, liquidity: Liquidity) -> NumericResult<Cash> {
        let rate = self.rate(liquidity);
        if rate.is_zero() || notional == 0 {
            return Ok(0);
        }

        let raw = Decimal::from(notional)
            .checked_mul(rate)
            .ok_or(NumericError::Overflow)?
            / Decimal::from(BPS_PER_UNIT);

        raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(NumericError::Overflow)
    }

    /// Largest fee either role could pay on `notional`.
    pub fn worst_case_fee(&self, notional: Cash) -> NumericResult<Cash> {
        let maker = self.fee(notional, Liquidity::Maker)?;
        let taker = self.fee(notional, Liquidity::Taker)?;
        Ok(maker.max(taker))
    }

    /// Upper bound on the fees a bid of `quantity` shares worth `notional`
    /// can be charged in total, however it is split into fills.
    ///
    /// Each fill rounds its own fee, so the bound is the unrounded worst-case
    /// fee rounded up plus one minor unit for every share that could fill
    /// separately.
    pub fn fee_bound(&self, notional: Cash, quantity: Quantity) -> NumericResult<Cash> {
        let rate = self.maker_bps.max(self.taker_bps);
        let per_fill = Cash::try_from(quantity).map_err(|_| NumericError::Overflow)?;
        if rate.is_zero() || notional == 0 {
            return Ok(0);
        }

        let raw = Decimal::from(notional)
            .checked_mul(rate)
            .ok_or(NumericError::Overflow)?
            / Decimal::from(BPS_PER_UNIT);
        let ceiling = raw
            .round_dp_with_strategy(0, RoundingStrategy::AwayFromZero)
            .to_i64()
            .ok_or(NumericError::Overflow)?;

        ceiling.checked_add(per_fill).ok_or(NumericError::Overflow)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for rate in [self.maker_bps, self.taker_bps] {
            if rate.is_sign_negative() && !rate.is_zero() {
                return Err(ConfigError::NegativeFeeRate(rate.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero()
    }
}
