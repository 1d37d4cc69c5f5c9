//! Account type.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A per-user, per-currency account.
///
/// At most one account exists per (user, currency) pair. The balance is not
/// constrained to be non-negative at the storage level; only the initial
/// balance is validated at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency_code: String,
    pub balance: Decimal,
}
