// ============================================================================
// Money and Share Arithmetic
// ============================================================================

use super::errors::{NumericError, NumericResult};

/// Limit or execution price in minor currency units (e.g. cents).
pub type Price = i64;

/// Share count of an order or fill.
pub type Quantity = u64;

/// Cash amount in minor currency units. Signed so deltas can be expressed.
pub type Cash = i64;

/// Shares held in one security.
pub type Position = i64;

/// Notional value of `quantity` shares at `price`.
///
/// # Errors
/// Returns `InvalidInput` if the quantity does not fit an i64 and `Overflow`
/// or `Underflow` if the product is out of range.
#[inline]
pub fn notional(quantity: Quantity, price: Price) -> NumericResult<Cash> {
    let quantity = quantity_as_position(quantity)?;
    quantity.checked_mul(price).ok_or(if price < 0 {
        NumericError::Underflow
    } else {
        NumericError::Overflow
    })
}

/// Checked signed cash addition.
#[inline]
pub fn checked_cash_add(lhs: Cash, rhs: Cash) -> NumericResult<Cash> {
    lhs.checked_add(rhs).ok_or(if rhs > 0 {
        NumericError::Overflow
    } else {
        NumericError::Underflow
    })
}

/// Convert an unsigned order quantity into a signed position delta.
#[inline]
pub fn quantity_as_position(quantity: Quantity) -> NumericResult<Position> {
    Position::try_from(quantity).map_err(|_| NumericError::InvalidInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notional() {
        assert_eq!(notional(10, 500), Ok(5_000));
        assert_eq!(notional(0, 500), Ok(0));
    }

    #[test]
    fn test_notional_overflow() {
        assert_eq!(notional(u64::MAX, 1), Err(NumericError::InvalidInput));
        assert_eq!(notional(i64::MAX as u64, 2), Err(NumericError::Overflow));
    }

    #[test]
    fn test_checked_cash_add() {
        assert_eq!(checked_cash_add(100, -250), Ok(-150));
        assert_eq!(checked_cash_add(i64::MAX, 1), Err(NumericError::Overflow));
        assert_eq!(checked_cash_add(i64::MIN, -1), Err(NumericError::Underflow));
    }
}
