//! Operation Handler
//!
//! Executes account operations: plain deposits/withdrawals on one account,
//! and cross-account transfers with currency conversion.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::AccountRepository;
use crate::currencies::CurrencyRepository;
use crate::domain::{Account, User};
use crate::error::AppError;
use crate::ledger::Ledger;
use crate::users::UserRepository;

use super::{OperationCommand, OperationResult};

/// Handler for account operations
pub struct OperationHandler {
    accounts: AccountRepository,
    currencies: CurrencyRepository,
    users: UserRepository,
    ledger: Ledger,
    pool: PgPool,
}

impl OperationHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            currencies: CurrencyRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            ledger: Ledger::new(pool.clone()),
            pool,
        }
    }

    /// Execute the operation command on behalf of `owner`.
    ///
    /// The source account must belong to the owner. A recipient account may
    /// belong to anyone.
    pub async fn execute(
        &self,
        command: OperationCommand,
        owner: &User,
    ) -> Result<OperationResult, AppError> {
        let account = self.accounts.get(command.account_id, Some(owner.id)).await?;

        match command.recipient_account {
            Some(recipient_id) => {
                self.transfer(&account, recipient_id, command.amount_diff, owner)
                    .await
            }
            None => {
                let operation = self
                    .ledger
                    .append(account.id, command.amount_diff, command.description)
                    .await?;

                Ok(OperationResult {
                    operation_id: operation.id,
                    account_id: account.id,
                    amount_diff: operation.amount_diff,
                    recipient_operation_id: None,
                    recipient_amount_diff: None,
                })
            }
        }
    }

    /// Move value between two accounts, converting between their currencies
    /// at the current stored rates.
    async fn transfer(
        &self,
        sender: &Account,
        recipient_id: Uuid,
        amount_diff: Decimal,
        owner: &User,
    ) -> Result<OperationResult, AppError> {
        let sender_currency = self.currencies.get(&sender.currency_code).await?;
        let recipient = self.accounts.get(recipient_id, None).await?;
        let recipient_user = self
            .users
            .find(Some(recipient.user_id), None, None)
            .await?
            .ok_or_else(|| AppError::UserNotFound(recipient.user_id.to_string()))?;
        let recipient_currency = self.currencies.get(&recipient.currency_code).await?;

        // The monetary value of the sender's delta at current spot rates,
        // sign inverted: an outgoing (negative) delta credits the recipient.
        let recipient_diff = -sender_currency.convert(amount_diff, &recipient_currency);

        let sender_description = format!(
            "Transfer of {} {}. Recipient: {}.",
            amount_diff.abs(),
            sender_currency.char_code,
            recipient_user.full_name(),
        );
        let recipient_description = format!(
            "Transfer of {} {}. Sender: {}.",
            recipient_diff.abs(),
            recipient_currency.char_code,
            owner.full_name(),
        );

        // Both legs cover four row mutations; they commit together or not
        // at all.
        let mut tx = self.pool.begin().await?;

        let debit =
            Ledger::append_in_tx(&mut tx, sender.id, amount_diff, Some(sender_description))
                .await?;
        let credit = Ledger::append_in_tx(
            &mut tx,
            recipient.id,
            recipient_diff,
            Some(recipient_description),
        )
        .await?;

        tx.commit().await?;

        Ok(OperationResult {
            operation_id: debit.id,
            account_id: sender.id,
            amount_diff: debit.amount_diff,
            recipient_operation_id: Some(credit.id),
            recipient_amount_diff: Some(credit.amount_diff),
        })
    }
}
