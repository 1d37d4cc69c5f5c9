//! Bank of Russia daily rates client
//!
//! Fetches the daily JSON feed: a `Valute` map keyed by char code, each
//! entry carrying at least `Name` and `Value`. `Value` quotes the currency
//! in rubles; the base currency itself never appears in the feed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{RateQuote, RateSource, RateSourceError, RateTable};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Bank of Russia daily-rates endpoint
#[derive(Debug, Clone)]
pub struct CbrClient {
    client: reqwest::Client,
    url: String,
}

/// Top-level daily feed document
#[derive(Debug, Deserialize)]
struct CbrResponse {
    #[serde(rename = "Valute")]
    valute: HashMap<String, CbrQuote>,
}

/// One quoted currency from the feed
#[derive(Debug, Deserialize)]
struct CbrQuote {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: Decimal,
}

impl CbrClient {
    pub fn new(url: impl Into<String>) -> Result<Self, RateSourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RateSource for CbrClient {
    async fn fetch(&self) -> Result<RateTable, RateSourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;

        let body: CbrResponse = response.json().await?;

        if body.valute.is_empty() {
            return Err(RateSourceError::Malformed(
                "rate table contains no currencies".to_string(),
            ));
        }

        let quotes = body
            .valute
            .into_iter()
            .map(|(code, quote)| {
                (
                    code,
                    RateQuote {
                        name: quote.name,
                        value: quote.value,
                    },
                )
            })
            .collect();

        Ok(RateTable::new(quotes))
    }
}
