//! Common test utilities

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use multibank::api::{self, AppState};
use multibank::auth::{hash_password, SessionAuthProvider};
use multibank::notify::{Notifier, NotifyError};
use multibank::rates::{RateQuote, RateSource, RateSourceError, RateTable};
use multibank::User;

// Tests in one binary share the database; the lock keeps their
// truncate-and-seed phases from interleaving.
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Serialize database access within a test binary.
pub async fn lock_db() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

/// Setup test database - connect and truncate all tables
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::query(
        "TRUNCATE TABLE account_operations, accounts, currencies, sessions, update_requests, users CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to clean up DB");

    pool
}

/// Rate source returning a fixed in-memory table
#[derive(Debug, Clone)]
pub struct FixedRates {
    quotes: HashMap<String, RateQuote>,
}

impl FixedRates {
    pub fn new(quotes: impl IntoIterator<Item = (&'static str, &'static str, rust_decimal::Decimal)>) -> Self {
        let quotes = quotes
            .into_iter()
            .map(|(code, name, value)| {
                (
                    code.to_string(),
                    RateQuote {
                        name: name.to_string(),
                        value,
                    },
                )
            })
            .collect();

        Self { quotes }
    }
}

#[async_trait]
impl RateSource for FixedRates {
    async fn fetch(&self) -> Result<RateTable, RateSourceError> {
        Ok(RateTable::new(self.quotes.clone()))
    }
}

/// Rate source that always fails, simulating an unreachable endpoint
#[derive(Debug, Clone, Default)]
pub struct UnreachableRates;

#[async_trait]
impl RateSource for UnreachableRates {
    async fn fetch(&self) -> Result<RateTable, RateSourceError> {
        Err(RateSourceError::Malformed(
            "rate source unreachable".to_string(),
        ))
    }
}

/// The default table used by most tests: USD at 75, EUR at 90
pub fn default_rates() -> FixedRates {
    FixedRates::new([
        ("USD", "US Dollar", dec!(75)),
        ("EUR", "Euro", dec!(90)),
    ])
}

/// Notifier that records every delivered code for later inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    codes: Arc<Mutex<Vec<SentCode>>>,
}

#[derive(Debug, Clone)]
pub struct SentCode {
    pub recipient: String,
    pub subject: String,
    pub code: String,
}

impl RecordingNotifier {
    pub fn last_code(&self) -> Option<String> {
        self.codes.lock().unwrap().last().map(|sent| sent.code.clone())
    }

    pub fn sent(&self) -> Vec<SentCode> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_code(
        &self,
        recipient: &str,
        subject: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        self.codes.lock().unwrap().push(SentCode {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }
}

/// Build application state wired to test doubles.
pub fn test_state(
    pool: PgPool,
    rates: Arc<dyn RateSource>,
    notifier: Arc<dyn Notifier>,
) -> AppState {
    AppState {
        auth: Arc::new(SessionAuthProvider::new(pool.clone(), 30)),
        pool,
        notifier,
        rates,
    }
}

/// Build the API router for router-level tests.
pub fn test_app(state: AppState) -> Router {
    api::create_router(state)
}

/// Insert a confirmed user directly, bypassing the registration flow.
pub async fn seed_user(pool: &PgPool, email: &str, phone: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        first_name: Some("Ivan".to_string()),
        last_name: Some("Ivanov".to_string()),
        middle_name: None,
        email: email.to_string(),
        password_hash: hash_password("Str0ngPassword").unwrap(),
        phone: phone.to_string(),
        confirmation_code: None,
    };

    sqlx::query(
        r#"
        INSERT INTO users (
            id, first_name, last_name, middle_name,
            email, password_hash, phone, confirmation_code
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(user.id)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.middle_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.phone)
    .bind(&user.confirmation_code)
    .execute(pool)
    .await
    .expect("Failed to seed user");

    user
}

/// Insert a currency directly with the given rate.
pub async fn seed_currency(pool: &PgPool, char_code: &str, rate: rust_decimal::Decimal) {
    sqlx::query(
        r#"
        INSERT INTO currencies (char_code, name, rate)
        VALUES ($1, $1, $2)
        ON CONFLICT (char_code) DO UPDATE SET rate = EXCLUDED.rate
        "#,
    )
    .bind(char_code)
    .bind(rate)
    .execute(pool)
    .await
    .expect("Failed to seed currency");
}
