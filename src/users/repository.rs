//! User repository
//!
//! All reads and writes against the users and update_requests tables.
//! Email/phone changes go through a two-step flow: a pending update request
//! holding a 6-digit code, applied only on confirmation.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::domain::User;
use crate::error::AppError;
use crate::notify::Notifier;

const USER_COLUMNS: &str =
    "id, first_name, last_name, middle_name, email, password_hash, phone, confirmation_code";

/// Data for registering a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Pending changes stored in an update request
#[derive(Debug, Deserialize)]
struct UpdateConditions {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

/// Repository for user records
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by any combination of id, email, and phone.
    pub async fn find(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let user: Option<User> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::uuid IS NULL OR id = $1)
              AND ($2::text IS NULL OR email = $2)
              AND ($3::text IS NULL OR phone = $3)
            "#
        ))
        .bind(user_id)
        .bind(email)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Register a new user and deliver their email confirmation code.
    pub async fn register(
        &self,
        data: NewUser,
        notifier: &dyn Notifier,
    ) -> Result<Uuid, AppError> {
        validate_password(&data.password)?;
        validate_email(&data.email)?;

        if self.find(None, Some(&data.email), None).await?.is_some() {
            return Err(AppError::InvalidRequest(
                "Email is already in use".to_string(),
            ));
        }
        if self.find(None, None, Some(&data.phone)).await?.is_some() {
            return Err(AppError::InvalidRequest(
                "Phone number is already in use".to_string(),
            ));
        }

        let user_id = Uuid::new_v4();
        let confirmation_code = registration_code();
        let password_hash = hash_password(&data.password)?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, last_name, middle_name,
                email, password_hash, phone, confirmation_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.middle_name)
        .bind(&data.email)
        .bind(&password_hash)
        .bind(&data.phone)
        .bind(&confirmation_code)
        .execute(&self.pool)
        .await?;

        notifier
            .send_code(&data.email, "Email confirmation", &confirmation_code)
            .await?;

        Ok(user_id)
    }

    /// Authenticate by email or phone plus password.
    ///
    /// Unconfirmed users are rejected even with correct credentials.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user: Option<User> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1 OR phone = $1
            "#
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match user {
            Some(user) if verify_password(password, &user.password_hash) => {
                if user.is_confirmed() {
                    Ok(user)
                } else {
                    Err(AppError::Unauthorized(
                        "User email not confirmed yet".to_string(),
                    ))
                }
            }
            _ => Err(AppError::Unauthorized(
                "Incorrect username or password".to_string(),
            )),
        }
    }

    /// Confirm a registration code; returns the confirmed user id.
    pub async fn confirm_email(&self, confirmation_code: &str) -> Result<Option<Uuid>, AppError> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET confirmation_code = NULL
            WHERE confirmation_code = $1
            RETURNING id
            "#,
        )
        .bind(confirmation_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }

    /// Change a password after verifying the old one.
    pub async fn update_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<Uuid, AppError> {
        if !verify_password(old_password, &user.password_hash) {
            return Err(AppError::Unauthorized("Incorrect password".to_string()));
        }

        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&password_hash)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        Ok(user.id)
    }

    /// Create a pending email change and deliver its confirmation code.
    pub async fn request_email_update(
        &self,
        user: &User,
        email: &str,
        notifier: &dyn Notifier,
    ) -> Result<(), AppError> {
        validate_email(email)?;
        self.insert_update_request(
            user,
            serde_json::json!({ "email": email }),
            "Email changing",
            notifier,
        )
        .await
    }

    /// Create a pending phone change and deliver its confirmation code.
    pub async fn request_phone_update(
        &self,
        user: &User,
        phone: &str,
        notifier: &dyn Notifier,
    ) -> Result<(), AppError> {
        self.insert_update_request(
            user,
            serde_json::json!({ "phone": phone }),
            "Phone changing",
            notifier,
        )
        .await
    }

    async fn insert_update_request(
        &self,
        user: &User,
        conditions: serde_json::Value,
        subject: &str,
        notifier: &dyn Notifier,
    ) -> Result<(), AppError> {
        let confirmation_code = digit_code();

        sqlx::query(
            r#"
            INSERT INTO update_requests (id, user_id, conditions, confirmation_code)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(&conditions)
        .bind(&confirmation_code)
        .execute(&self.pool)
        .await?;

        notifier
            .send_code(&user.email, subject, &confirmation_code)
            .await?;

        Ok(())
    }

    /// Apply a pending email/phone change matching the given code.
    pub async fn confirm_update(
        &self,
        user: &User,
        confirmation_code: &str,
    ) -> Result<Option<Uuid>, AppError> {
        let conditions: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            DELETE FROM update_requests
            WHERE user_id = $1 AND confirmation_code = $2
            RETURNING conditions
            "#,
        )
        .bind(user.id)
        .bind(confirmation_code)
        .fetch_optional(&self.pool)
        .await?;

        let Some(conditions) = conditions else {
            return Ok(None);
        };

        let conditions: UpdateConditions = serde_json::from_value(conditions)
            .map_err(|e| AppError::Internal(format!("Corrupt update request: {}", e)))?;

        let user_id: Uuid = sqlx::query_scalar(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                phone = COALESCE($3, phone)
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(&conditions.email)
        .bind(&conditions.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(user_id))
    }

    /// Update the name fields.
    pub async fn update_name(
        &self,
        user_id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
        middle_name: Option<&str>,
    ) -> Result<Uuid, AppError> {
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, middle_name = $4
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(middle_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_id)
    }
}

/// Password policy: at least 8 characters, one uppercase letter, one digit.
fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::InvalidRequest(
            "Password must be at least 8 characters long".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(AppError::InvalidRequest(
            "Password must contain at least one uppercase character".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidRequest(
            "Password must contain at least one number".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "Invalid email address".to_string(),
        ))
    }
}

/// 6-character alphanumeric registration code.
fn registration_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

/// 6-digit code for update requests.
fn digit_code() -> String {
    let mut rng = rand::thread_rng();
    (0..6).map(|_| char::from(b'0' + rng.gen_range(0u8..10))).collect()
}
