//! Exchange-rate source
//!
//! Abstraction over the external service that quotes currency rates against
//! the base currency, plus the production client for the Bank of Russia
//! daily feed.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

mod cbr;

pub use cbr::CbrClient;

/// One quoted currency: display name and rate relative to the base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub name: String,
    pub value: Decimal,
}

/// The full rate table returned by one fetch.
///
/// The base currency is never present; callers pin it at rate 1.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    quotes: HashMap<String, RateQuote>,
}

impl RateTable {
    pub fn new(quotes: HashMap<String, RateQuote>) -> Self {
        Self { quotes }
    }

    pub fn get(&self, char_code: &str) -> Option<&RateQuote> {
        self.quotes.get(char_code)
    }

    pub fn contains(&self, char_code: &str) -> bool {
        self.quotes.contains_key(char_code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RateQuote)> {
        self.quotes.iter()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Errors from fetching the external rate table
#[derive(Debug, thiserror::Error)]
pub enum RateSourceError {
    #[error("Rate source request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed rate source response: {0}")]
    Malformed(String),
}

/// A read-only source of currency quotes.
///
/// The production implementation is [`CbrClient`]; tests substitute a fixed
/// table. Any failure aborts the calling operation without partial writes.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self) -> Result<RateTable, RateSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_table_lookup() {
        let mut quotes = HashMap::new();
        quotes.insert(
            "USD".to_string(),
            RateQuote {
                name: "US Dollar".to_string(),
                value: dec!(75.5),
            },
        );

        let table = RateTable::new(quotes);
        assert!(table.contains("USD"));
        assert!(!table.contains("EUR"));
        assert_eq!(table.get("USD").unwrap().value, dec!(75.5));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_rate_table() {
        let table = RateTable::default();
        assert!(table.is_empty());
        assert!(table.get("USD").is_none());
    }
}
