//! Currency repository
//!
//! Currencies enter the system by explicit creation against the external
//! rate table and are never deleted. Rates move only through `create` and
//! `refresh`.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{Currency, BASE_CURRENCY, BASE_CURRENCY_NAME};
use crate::error::AppError;
use crate::rates::RateSource;

/// Repository for currency records
#[derive(Debug, Clone)]
pub struct CurrencyRepository {
    pool: PgPool,
}

impl CurrencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a currency, taking its name and rate from the external source.
    ///
    /// The base currency never appears in the external table; it is pinned
    /// at rate 1. Creating an already-stored code re-applies the freshly
    /// fetched name and rate.
    pub async fn create(
        &self,
        source: &dyn RateSource,
        char_code: &str,
    ) -> Result<Currency, AppError> {
        let table = source.fetch().await?;

        let (name, rate) = if char_code == BASE_CURRENCY {
            (BASE_CURRENCY_NAME.to_string(), Decimal::ONE)
        } else if let Some(quote) = table.get(char_code) {
            (quote.name.clone(), quote.value)
        } else {
            return Err(AppError::InvalidCurrency(char_code.to_string()));
        };

        let currency: Currency = sqlx::query_as(
            r#"
            INSERT INTO currencies (char_code, name, rate)
            VALUES ($1, $2, $3)
            ON CONFLICT (char_code) DO UPDATE SET name = EXCLUDED.name, rate = EXCLUDED.rate
            RETURNING char_code, name, rate
            "#,
        )
        .bind(char_code)
        .bind(&name)
        .bind(rate)
        .fetch_one(&self.pool)
        .await?;

        Ok(currency)
    }

    /// Get a stored currency by char code.
    pub async fn get(&self, char_code: &str) -> Result<Currency, AppError> {
        let currency: Option<Currency> = sqlx::query_as(
            "SELECT char_code, name, rate FROM currencies WHERE char_code = $1",
        )
        .bind(char_code)
        .fetch_optional(&self.pool)
        .await?;

        currency.ok_or_else(|| AppError::CurrencyNotFound(char_code.to_string()))
    }

    /// List all stored currencies.
    pub async fn list(&self) -> Result<Vec<Currency>, AppError> {
        let currencies: Vec<Currency> = sqlx::query_as(
            "SELECT char_code, name, rate FROM currencies ORDER BY char_code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(currencies)
    }

    /// Overwrite the rate of every stored currency present in the freshly
    /// fetched table. Currencies absent from the response keep their rate.
    ///
    /// Returns the number of currencies updated.
    pub async fn refresh(&self, source: &dyn RateSource) -> Result<u64, AppError> {
        let table = source.fetch().await?;

        let mut updated = 0u64;
        for currency in self.list().await? {
            let Some(quote) = table.get(&currency.char_code) else {
                continue;
            };

            let result = sqlx::query("UPDATE currencies SET rate = $2 WHERE char_code = $1")
                .bind(&currency.char_code)
                .bind(quote.value)
                .execute(&self.pool)
                .await?;

            updated += result.rows_affected();
        }

        if updated > 0 {
            tracing::info!(updated = updated, "Refreshed currency rates");
        }

        Ok(updated)
    }
}
