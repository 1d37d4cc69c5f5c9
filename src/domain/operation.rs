//! Ledger operation type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// An immutable ledger entry recording a balance delta on one account.
///
/// Operations are ordered by timestamp per account; the ledger breaks ties
/// between equal timestamps by insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Operation {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount_diff: Decimal,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}
