//! Command definitions
//!
//! Commands represent intentions to change the system state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command to apply an operation to an account.
///
/// Without a recipient this is a plain deposit/withdrawal; with one it is a
/// cross-account transfer with currency conversion, where `amount_diff` is
/// the (negative) delta applied to the sender's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCommand {
    pub account_id: Uuid,
    pub amount_diff: Decimal,
    pub description: Option<String>,
    pub recipient_account: Option<Uuid>,
}

impl OperationCommand {
    pub fn new(account_id: Uuid, amount_diff: Decimal) -> Self {
        Self {
            account_id,
            amount_diff,
            description: None,
            recipient_account: None,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_recipient(mut self, recipient_account: Uuid) -> Self {
        self.recipient_account = Some(recipient_account);
        self
    }
}

/// Result of a successfully applied operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation_id: Uuid,
    pub account_id: Uuid,
    pub amount_diff: Decimal,
    pub recipient_operation_id: Option<Uuid>,
    pub recipient_amount_diff: Option<Decimal>,
}
