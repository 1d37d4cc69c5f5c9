//! Ledger and transfer integration tests

use rust_decimal_macros::dec;
use uuid::Uuid;

use multibank::accounts::AccountRepository;
use multibank::handlers::{OperationCommand, OperationHandler};
use multibank::ledger::Ledger;
use multibank::AppError;

mod common;

#[tokio::test]
async fn test_append_accumulates_balance() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let user = common::seed_user(&pool, "ledger@test.com", "89000000001").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;

    let accounts = AccountRepository::new(pool.clone());
    let account = accounts.create(user.id, "RUB", dec!(1000)).await.unwrap();

    let ledger = Ledger::new(pool.clone());
    ledger
        .append(account.id, dec!(250), Some("Deposit".to_string()))
        .await
        .unwrap();
    ledger
        .append(account.id, dec!(-100), Some("Cash withdrawal".to_string()))
        .await
        .unwrap();

    let account = accounts.get(account.id, None).await.unwrap();
    assert_eq!(account.balance, dec!(1000) + dec!(250) + dec!(-100));

    // The second append comes back last
    let operations = ledger.list_by_account(account.id).await.unwrap();
    assert_eq!(operations.len(), 2);
    assert_eq!(operations[0].amount_diff, dec!(250));
    assert_eq!(operations.last().unwrap().amount_diff, dec!(-100));
}

#[tokio::test]
async fn test_cross_currency_transfer() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let sender = common::seed_user(&pool, "sender@test.com", "89000000002").await;
    let recipient = common::seed_user(&pool, "recipient@test.com", "89000000003").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;
    common::seed_currency(&pool, "USD", dec!(75)).await;

    let accounts = AccountRepository::new(pool.clone());
    let sender_account = accounts.create(sender.id, "RUB", dec!(1000)).await.unwrap();
    let recipient_account = accounts.create(recipient.id, "USD", dec!(0)).await.unwrap();

    let handler = OperationHandler::new(pool.clone());
    let command = OperationCommand::new(sender_account.id, dec!(-100))
        .with_recipient(recipient_account.id);
    let result = handler.execute(command, &sender).await.unwrap();

    let expected_credit = dec!(100) / dec!(75);
    assert_eq!(result.amount_diff, dec!(-100));
    assert_eq!(result.recipient_amount_diff, Some(expected_credit));

    let sender_account = accounts.get(sender_account.id, None).await.unwrap();
    let recipient_account = accounts.get(recipient_account.id, None).await.unwrap();
    assert_eq!(sender_account.balance, dec!(900));
    assert_eq!(recipient_account.balance, expected_credit);

    // Each side got one operation with a description naming the other party
    let ledger = Ledger::new(pool.clone());
    let debit_ops = ledger.list_by_account(sender_account.id).await.unwrap();
    let credit_ops = ledger.list_by_account(recipient_account.id).await.unwrap();
    assert_eq!(debit_ops.len(), 1);
    assert_eq!(credit_ops.len(), 1);
    assert_eq!(debit_ops[0].amount_diff, dec!(-100));
    assert_eq!(credit_ops[0].amount_diff, expected_credit);
    assert!(debit_ops[0]
        .description
        .as_deref()
        .unwrap()
        .contains("Recipient:"));
    assert!(credit_ops[0]
        .description
        .as_deref()
        .unwrap()
        .contains("Sender:"));

    // Value conservation in base-currency terms
    let conserved = debit_ops[0].amount_diff * dec!(1) + credit_ops[0].amount_diff * dec!(75);
    assert_eq!(conserved, dec!(0));
}

#[tokio::test]
async fn test_transfer_rolls_back_when_second_leg_fails() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let user = common::seed_user(&pool, "rollback@test.com", "89000000004").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;

    let accounts = AccountRepository::new(pool.clone());
    let account = accounts.create(user.id, "RUB", dec!(1000)).await.unwrap();

    // First leg lands, second leg hits an account that does not exist.
    let mut tx = pool.begin().await.unwrap();
    Ledger::append_in_tx(&mut tx, account.id, dec!(-100), Some("Transfer".to_string()))
        .await
        .unwrap();
    let err = Ledger::append_in_tx(&mut tx, Uuid::new_v4(), dec!(100), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));
    drop(tx);

    // Neither the balance change nor the operation row survived
    let account = accounts.get(account.id, None).await.unwrap();
    assert_eq!(account.balance, dec!(1000));

    let ledger = Ledger::new(pool.clone());
    let operations = ledger.list_by_account(account.id).await.unwrap();
    assert!(operations.is_empty());
}

#[tokio::test]
async fn test_transfer_to_missing_recipient_leaves_sender_untouched() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let sender = common::seed_user(&pool, "solo@test.com", "89000000005").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;

    let accounts = AccountRepository::new(pool.clone());
    let account = accounts.create(sender.id, "RUB", dec!(500)).await.unwrap();

    let handler = OperationHandler::new(pool.clone());
    let command = OperationCommand::new(account.id, dec!(-100)).with_recipient(Uuid::new_v4());
    let err = handler.execute(command, &sender).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    let account = accounts.get(account.id, None).await.unwrap();
    assert_eq!(account.balance, dec!(500));

    let ledger = Ledger::new(pool.clone());
    assert!(ledger.list_by_account(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_account_rejected() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let user = common::seed_user(&pool, "dup@test.com", "89000000006").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;
    common::seed_currency(&pool, "USD", dec!(75)).await;

    let accounts = AccountRepository::new(pool.clone());
    accounts.create(user.id, "RUB", dec!(0)).await.unwrap();

    let err = accounts.create(user.id, "RUB", dec!(0)).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateAccount));

    // A different currency is fine
    accounts.create(user.id, "USD", dec!(0)).await.unwrap();
}

#[tokio::test]
async fn test_negative_initial_balance_rejected() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let user = common::seed_user(&pool, "negative@test.com", "89000000007").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;

    let accounts = AccountRepository::new(pool.clone());
    let err = accounts.create(user.id, "RUB", dec!(-1)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_account_in_unknown_currency_rejected() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let user = common::seed_user(&pool, "nocurrency@test.com", "89000000008").await;

    let accounts = AccountRepository::new(pool.clone());
    let err = accounts.create(user.id, "USD", dec!(0)).await.unwrap_err();
    assert!(matches!(err, AppError::CurrencyNotFound(_)));
}

#[tokio::test]
async fn test_ownership_checked_on_get_and_close() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let owner = common::seed_user(&pool, "owner@test.com", "89000000009").await;
    let stranger = common::seed_user(&pool, "stranger@test.com", "89000000010").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;

    let accounts = AccountRepository::new(pool.clone());
    let account = accounts.create(owner.id, "RUB", dec!(100)).await.unwrap();

    // Someone else's account looks like a missing one
    let err = accounts.get(account.id, Some(stranger.id)).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    let err = accounts.close(account.id, stranger.id).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    // The owner can still close it
    accounts.close(account.id, owner.id).await.unwrap();
}

#[tokio::test]
async fn test_close_account_cascades_operations() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let user = common::seed_user(&pool, "cascade@test.com", "89000000011").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;

    let accounts = AccountRepository::new(pool.clone());
    let account = accounts.create(user.id, "RUB", dec!(100)).await.unwrap();

    let ledger = Ledger::new(pool.clone());
    ledger
        .append(account.id, dec!(50), Some("Deposit".to_string()))
        .await
        .unwrap();

    accounts.close(account.id, user.id).await.unwrap();

    let orphaned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM account_operations WHERE account_id = $1")
            .bind(account.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(orphaned, 0);

    let err = accounts.get(account.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));
}

#[tokio::test]
async fn test_list_by_owner_covers_every_account() {
    let _guard = common::lock_db().await;
    let pool = common::setup_test_db().await;
    let user = common::seed_user(&pool, "history@test.com", "89000000012").await;
    common::seed_currency(&pool, "RUB", dec!(1)).await;
    common::seed_currency(&pool, "USD", dec!(75)).await;

    let accounts = AccountRepository::new(pool.clone());
    let rub = accounts.create(user.id, "RUB", dec!(100)).await.unwrap();
    let usd = accounts.create(user.id, "USD", dec!(0)).await.unwrap();

    let ledger = Ledger::new(pool.clone());
    ledger
        .append(rub.id, dec!(10), None)
        .await
        .unwrap();
    ledger
        .append(rub.id, dec!(20), None)
        .await
        .unwrap();

    let by_account = ledger.list_by_owner(user.id).await.unwrap();
    assert_eq!(by_account.len(), 2);
    assert_eq!(by_account[&rub.id].len(), 2);
    assert_eq!(by_account[&rub.id][0].amount_diff, dec!(10));
    assert_eq!(by_account[&rub.id][1].amount_diff, dec!(20));
    assert!(by_account[&usd.id].is_empty());
}
