// ============================================================================
// Security Registry
// ============================================================================

use super::Ticker;
use crate::error::ConfigError;
use std::collections::HashSet;

/// The set of tradable tickers. Membership is its only semantic.
#[derive(Debug, Clone, Default)]
pub struct SecurityList {
    tickers: HashSet<Ticker>,
}

impl SecurityList {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a new security.
    pub fn add(&mut self, ticker: Ticker) -> Result<(), ConfigError> {
        if ticker.is_empty() {
            return Err(ConfigError::EmptyTicker);
        }
        if self.tickers.contains(&ticker) {
            return Err(ConfigError::DuplicateSecurity(ticker));
        }
        self.tickers.insert(ticker);
        Ok(())
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.tickers.contains(ticker)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticker> {
        self.tickers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let mut securities = SecurityList::new();
        securities.add(Ticker::from("XYZ")).unwrap();

        assert!(securities.contains(&Ticker::from("XYZ")));
        assert!(!securities.contains(&Ticker::from("ABC")));
        assert_eq!(securities.len(), 1);
    }

    #[test]
    fn test_rejects_empty_and_duplicate() {
        let mut securities = SecurityList::new();

        assert_eq!(securities.add(Ticker::from("")), Err(ConfigError::EmptyTicker));
        securities.add(Ticker::from("XYZ")).unwrap();
        assert_eq!(
            securities.add(Ticker::from("XYZ")),
            Err(ConfigError::DuplicateSecurity(Ticker::from("XYZ")))
        );
    }
}
