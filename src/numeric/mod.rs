// ============================================================================
// Numeric Module
// Integer minor-unit arithmetic for prices, cash and share quantities
// ============================================================================
//
// This module provides:
// - Price/Quantity/Cash/Position type aliases
// - Checked notional and cash arithmetic
// - NumericError: Error types for arithmetic operations
//
// Design principles:
// - No floating-point operations
// - All arithmetic returns Result (no panics)
// - Prices and cash are minor currency units (cents)

mod errors;
mod money;

pub use errors::{NumericError, NumericResult};
pub use money::{checked_cash_add, notional, quantity_as_position, Cash, Position, Price, Quantity};
