//! Ledger repository
//!
//! Every append pairs two writes — the immutable operation row and the
//! relative balance update — inside one database transaction. Either both
//! take effect or neither does.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::Operation;
use crate::error::AppError;

const OPERATION_COLUMNS: &str = "id, account_id, amount_diff, created_at, description";

/// Append-only ledger over the account_operations table
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: PgPool,
}

impl Ledger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an operation and apply its delta to the account balance.
    pub async fn append(
        &self,
        account_id: Uuid,
        amount_diff: Decimal,
        description: Option<String>,
    ) -> Result<Operation, AppError> {
        let mut tx = self.pool.begin().await?;
        let operation = Self::append_in_tx(&mut tx, account_id, amount_diff, description).await?;
        tx.commit().await?;

        Ok(operation)
    }

    /// Same as [`append`](Self::append), against a caller-owned transaction.
    ///
    /// A multi-leg transfer calls this once per leg so that all legs commit
    /// as a single unit.
    pub async fn append_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        amount_diff: Decimal,
        description: Option<String>,
    ) -> Result<Operation, AppError> {
        // Balance first: zero rows affected means the account is gone, and
        // catching it here keeps the operation insert from tripping the
        // foreign key instead.
        let updated = sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE id = $1")
            .bind(account_id)
            .bind(amount_diff)
            .execute(&mut **tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::AccountNotFound(account_id.to_string()));
        }

        let operation: Operation = sqlx::query_as(&format!(
            r#"
            INSERT INTO account_operations (id, account_id, amount_diff, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {OPERATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(amount_diff)
        .bind(description)
        .fetch_one(&mut **tx)
        .await?;

        Ok(operation)
    }

    /// Operations of one account, oldest first. Equal timestamps keep
    /// insertion order.
    pub async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Operation>, AppError> {
        let operations: Vec<Operation> = sqlx::query_as(&format!(
            r#"
            SELECT {OPERATION_COLUMNS}
            FROM account_operations
            WHERE account_id = $1
            ORDER BY created_at, seq
            "#
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(operations)
    }

    /// Ordered operation lists for every account of one owner, keyed by
    /// account id. Accounts without operations map to an empty list.
    pub async fn list_by_owner(
        &self,
        owner: Uuid,
    ) -> Result<HashMap<Uuid, Vec<Operation>>, AppError> {
        let account_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE user_id = $1")
                .bind(owner)
                .fetch_all(&self.pool)
                .await?;

        let mut by_account: HashMap<Uuid, Vec<Operation>> =
            account_ids.into_iter().map(|id| (id, Vec::new())).collect();

        let operations: Vec<Operation> = sqlx::query_as(
            r#"
            SELECT o.id, o.account_id, o.amount_diff, o.created_at, o.description
            FROM account_operations o
            JOIN accounts a ON a.id = o.account_id
            WHERE a.user_id = $1
            ORDER BY o.created_at, o.seq
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        for operation in operations {
            if let Some(list) = by_account.get_mut(&operation.account_id) {
                list.push(operation);
            }
        }

        Ok(by_account)
    }
}
