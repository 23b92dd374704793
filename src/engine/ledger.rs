// ============================================================================
// Account & Position Ledger
// ============================================================================

use std::collections::HashMap;

use crate::domain::{Account, Ticker, Trade, TraderId};
use crate::error::{ConfigError, ExchangeError, ExchangeResult};
use crate::numeric::{checked_cash_add, quantity_as_position, Cash, NumericError, Position, Quantity};

/// A single balance or position mutation.
///
/// Amounts are raw deltas: sufficiency is checked by the exchange before an
/// order is accepted, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    /// Subtract `amount` from the balance
    Fee { trader: TraderId, amount: Cash },
    /// Add a signed cash amount: negative for the buyer, positive for the seller
    Payment { trader: TraderId, amount: Cash },
    AddPosition { trader: TraderId, ticker: Ticker, quantity: Quantity },
    RemovePosition { trader: TraderId, ticker: Ticker, quantity: Quantity },
    ReserveCash { trader: TraderId, amount: Cash },
    ReleaseCash { trader: TraderId, amount: Cash },
    ReserveShares { trader: TraderId, ticker: Ticker, quantity: Quantity },
    ReleaseShares { trader: TraderId, ticker: Ticker, quantity: Quantity },
}

impl LedgerOp {
    fn trader(&self) -> &TraderId {
        match self {
            LedgerOp::Fee { trader, .. }
            | LedgerOp::Payment { trader, .. }
            | LedgerOp::AddPosition { trader, .. }
            | LedgerOp::RemovePosition { trader, .. }
            | LedgerOp::ReserveCash { trader, .. }
            | LedgerOp::ReleaseCash { trader, .. }
            | LedgerOp::ReserveShares { trader, .. }
            | LedgerOp::ReleaseShares { trader, .. } => trader,
        }
    }

    /// The six mutations that settle one trade, buyer first.
    pub fn settlement(trade: &Trade) -> [LedgerOp; 6] {
        [
            LedgerOp::Fee {
                trader: trade.buyer_id.clone(),
                amount: trade.buyer_fee,
            },
            LedgerOp::Payment {
                trader: trade.buyer_id.clone(),
                amount: -trade.total_value,
            },
            LedgerOp::AddPosition {
                trader: trade.buyer_id.clone(),
                ticker: trade.ticker.clone(),
                quantity: trade.quantity,
            },
            LedgerOp::Fee {
                trader: trade.seller_id.clone(),
                amount: trade.seller_fee,
            },
            LedgerOp::Payment {
                trader: trade.seller_id.clone(),
                amount: trade.total_value,
            },
            LedgerOp::RemovePosition {
                trader: trade.seller_id.clone(),
                ticker: trade.ticker.clone(),
                quantity: trade.quantity,
            },
        ]
    }
}

/// Per-trader cash balances and share positions
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: HashMap<TraderId, Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_account(&mut self, trader: TraderId, balance: Cash) -> Result<(), ConfigError> {
        if self.accounts.contains_key(&trader) {
            return Err(ConfigError::DuplicateAccount(trader));
        }
        self.accounts
            .insert(trader.clone(), Account::new(trader, balance));
        Ok(())
    }

    /// Seed a starting position. Only used while setting the exchange up.
    pub fn set_position(
        &mut self,
        trader: &TraderId,
        ticker: Ticker,
        quantity: Position,
    ) -> Result<(), ConfigError> {
        let account = self
            .accounts
            .get_mut(trader)
            .ok_or_else(|| ConfigError::DanglingPosition {
                trader: trader.clone(),
                what: "trader".to_string(),
            })?;
        account.positions.insert(ticker, quantity);
        Ok(())
    }

    pub fn get_account(&self, trader: &TraderId) -> Option<&Account> {
        self.accounts.get(trader)
    }

    pub fn contains(&self, trader: &TraderId) -> bool {
        self.accounts.contains_key(trader)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    // ========================================================================
    // Single mutations
    // ========================================================================

    pub fn apply_fee(&mut self, trader: &TraderId, amount: Cash) -> ExchangeResult<()> {
        self.apply(vec![LedgerOp::Fee {
            trader: trader.clone(),
            amount,
        }])
    }

    pub fn apply_trade_payment(&mut self, trader: &TraderId, amount: Cash) -> ExchangeResult<()> {
        self.apply(vec![LedgerOp::Payment {
            trader: trader.clone(),
            amount,
        }])
    }

    pub fn add_position(
        &mut self,
        trader: &TraderId,
        ticker: &Ticker,
        quantity: Quantity,
    ) -> ExchangeResult<()> {
        self.apply(vec![LedgerOp::AddPosition {
            trader: trader.clone(),
            ticker: ticker.clone(),
            quantity,
        }])
    }

    pub fn remove_position(
        &mut self,
        trader: &TraderId,
        ticker: &Ticker,
        quantity: Quantity,
    ) -> ExchangeResult<()> {
        self.apply(vec![LedgerOp::RemovePosition {
            trader: trader.clone(),
            ticker: ticker.clone(),
            quantity,
        }])
    }

    /// Settle a batch of trades as one unit
    pub fn settle<'a, I>(&mut self, trades: I) -> ExchangeResult<()>
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        self.apply(trades.into_iter().flat_map(LedgerOp::settlement))
    }

    // ========================================================================
    // Batches
    // ========================================================================

    /// Apply every operation or none.
    pub fn apply<I>(&mut self, ops: I) -> ExchangeResult<()>
    where
        I: IntoIterator<Item = LedgerOp>,
    {
        let batch = self.prepare(ops)?;
        self.commit(batch);
        Ok(())
    }

    /// Run operations against scratch copies of the affected accounts.
    ///
    /// Nothing is visible until the returned batch is committed, so a caller
    /// can prepare settlement, finish its own fallible work, then commit.
    pub fn prepare<I>(&self, ops: I) -> ExchangeResult<PreparedBatch>
    where
        I: IntoIterator<Item = LedgerOp>,
    {
        let mut scratch: HashMap<TraderId, Account> = HashMap::new();

        for op in ops {
            let trader = op.trader();
            if !scratch.contains_key(trader) {
                let account = self.accounts.get(trader).ok_or_else(|| {
                    ExchangeError::invariant(format!("ledger has no account for {}", trader))
                })?;
                scratch.insert(trader.clone(), account.clone());
            }
            let account = scratch
                .get_mut(op.trader())
                .ok_or_else(|| ExchangeError::invariant("scratch account missing"))?;
            apply_op(account, &op)?;
        }

        Ok(PreparedBatch { accounts: scratch })
    }

    /// Install a prepared batch
    pub fn commit(&mut self, batch: PreparedBatch) {
        self.accounts.extend(batch.accounts);
    }
}

/// Account states produced by [`Ledger::prepare`], not yet visible
#[derive(Debug)]
#[must_use = "a prepared batch does nothing until committed"]
pub struct PreparedBatch {
    accounts: HashMap<TraderId, Account>,
}

impl PreparedBatch {
    pub fn account(&self, trader: &TraderId) -> Option<&Account> {
        self.accounts.get(trader)
    }
}

fn apply_op(account: &mut Account, op: &LedgerOp) -> ExchangeResult<()> {
    match op {
        LedgerOp::Fee { amount, .. } => {
            account.balance = checked_cash_add(account.balance, negate(*amount)?)?;
        },
        LedgerOp::Payment { amount, .. } => {
            account.balance = checked_cash_add(account.balance, *amount)?;
        },
        LedgerOp::AddPosition {
            ticker, quantity, ..
        } => {
            let held = account.positions.entry(ticker.clone()).or_insert(0);
            *held = checked_cash_add(*held, quantity_as_position(*quantity)?)?;
        },
        LedgerOp::RemovePosition {
            ticker, quantity, ..
        } => {
            let held = account.positions.entry(ticker.clone()).or_insert(0);
            *held = checked_cash_add(*held, negate(quantity_as_position(*quantity)?)?)?;
        },
        LedgerOp::ReserveCash { amount, .. } => {
            account.reserved_cash = checked_cash_add(account.reserved_cash, *amount)?;
        },
        LedgerOp::ReleaseCash { amount, .. } => {
            if *amount > account.reserved_cash {
                return Err(ExchangeError::invariant(format!(
                    "releasing {} cash for {} with {} reserved",
                    amount, account.trader_id, account.reserved_cash
                )));
            }
            account.reserved_cash -= amount;
        },
        LedgerOp::ReserveShares {
            ticker, quantity, ..
        } => {
            let reserved = account.reserved_shares.entry(ticker.clone()).or_insert(0);
            *reserved = checked_cash_add(*reserved, quantity_as_position(*quantity)?)?;
        },
        LedgerOp::ReleaseShares {
            ticker, quantity, ..
        } => {
            let quantity = quantity_as_position(*quantity)?;
            let reserved = account.reserved_shares.entry(ticker.clone()).or_insert(0);
            if quantity > *reserved {
                return Err(ExchangeError::invariant(format!(
                    "releasing {} {} shares for {} with {} reserved",
                    quantity, ticker, account.trader_id, reserved
                )));
            }
            *reserved -= quantity;
            if *reserved == 0 {
                account.reserved_shares.remove(ticker);
            }
        },
    }
    Ok(())
}

fn negate(amount: Cash) -> Result<Cash, NumericError> {
    amount.checked_neg().ok_or(NumericError::Overflow)
}
