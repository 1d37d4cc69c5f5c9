//! Authentication
//!
//! Password hashing plus the [`AuthProvider`] seam for issuing and
//! validating bearer tokens. The shipped provider backs tokens with a
//! sessions table: a token is 32 random bytes, and only its sha256 hash is
//! stored.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::User;
use crate::error::AppError;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Hash a bearer token the way the sessions table stores it.
fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generate a fresh opaque bearer token.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues and validates identity tokens.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Issue a new token for a user.
    async fn issue(&self, user_id: Uuid) -> Result<String, AppError>;

    /// Resolve a token to its user, or `None` for unknown/expired tokens.
    async fn authenticate(&self, token: &str) -> Result<Option<User>, AppError>;
}

/// Database-backed session tokens with a fixed TTL.
#[derive(Debug, Clone)]
pub struct SessionAuthProvider {
    pool: PgPool,
    ttl: Duration,
}

impl SessionAuthProvider {
    pub fn new(pool: PgPool, ttl_minutes: i64) -> Self {
        Self {
            pool,
            ttl: Duration::minutes(ttl_minutes),
        }
    }
}

#[async_trait]
impl AuthProvider for SessionAuthProvider {
    async fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_token();
        let expires_at = Utc::now() + self.ttl;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash(&token))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    async fn authenticate(&self, token: &str) -> Result<Option<User>, AppError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.middle_name,
                   u.email, u.password_hash, u.phone, u.confirmation_code
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token_hash(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
