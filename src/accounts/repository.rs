//! Account repository
//!
//! Ownership checks are folded into the WHERE clause: an account that
//! exists but belongs to someone else is indistinguishable from a missing
//! one, so both surface as not-found.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::currencies::CurrencyRepository;
use crate::domain::Account;
use crate::error::AppError;

/// Repository for account records
#[derive(Debug, Clone)]
pub struct AccountRepository {
    currencies: CurrencyRepository,
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            currencies: CurrencyRepository::new(pool.clone()),
            pool,
        }
    }

    /// Open a new account.
    ///
    /// The currency must already be stored, the initial balance must not be
    /// negative, and the owner must not already hold an account in this
    /// currency.
    pub async fn create(
        &self,
        owner: Uuid,
        currency_code: &str,
        initial_balance: Decimal,
    ) -> Result<Account, AppError> {
        self.currencies.get(currency_code).await?;

        if initial_balance < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "Initial balance must not be negative".to_string(),
            ));
        }

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM accounts WHERE user_id = $1 AND currency_code = $2",
        )
        .bind(owner)
        .bind(currency_code)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Err(AppError::DuplicateAccount);
        }

        let account: Account = sqlx::query_as(
            r#"
            INSERT INTO accounts (id, user_id, currency_code, balance)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, currency_code, balance
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(currency_code)
        .bind(initial_balance)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    /// Get an account by id; with `owner` supplied, also check ownership.
    pub async fn get(&self, account_id: Uuid, owner: Option<Uuid>) -> Result<Account, AppError> {
        let account: Option<Account> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency_code, balance
            FROM accounts
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            "#,
        )
        .bind(account_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        account.ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))
    }

    /// All accounts of one owner.
    pub async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Account>, AppError> {
        let accounts: Vec<Account> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency_code, balance
            FROM accounts
            WHERE user_id = $1
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Close an account. Hard delete; the account's operations go with it.
    pub async fn close(&self, account_id: Uuid, owner: Uuid) -> Result<Uuid, AppError> {
        let deleted: Option<Uuid> = sqlx::query_scalar(
            r#"
            DELETE FROM accounts
            WHERE id = $1 AND user_id = $2
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        deleted.ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))
    }
}
