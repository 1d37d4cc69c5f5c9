//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Form, Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::accounts::AccountRepository;
use crate::currencies::CurrencyRepository;
use crate::domain::{Account, Currency, User};
use crate::error::AppError;
use crate::handlers::{OperationCommand, OperationHandler, OperationResult};
use crate::ledger::Ledger;
use crate::users::{NewUser, UserRepository};

use super::middleware::{auth_middleware, logging_middleware, CurrentUser};
use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub email: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterUserResponse {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub confirmation_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub email: String,
    pub phone: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            middle_name: user.middle_name,
            email: user.email,
            phone: user.phone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateNameRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePhoneRequest {
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub currency_code: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    #[serde(default)]
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperationRequest {
    pub account_id: Uuid,
    pub amount_diff: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recipient_account: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCurrencyRequest {
    pub char_code: String,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the full API router.
///
/// Registration, email confirmation, and login stay public; everything else
/// requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/users", post(register_user))
        .route("/users/email_confirmation", post(confirm_email))
        .route("/token", post(login));

    let protected = Router::new()
        .route("/users/me", get(me))
        .route("/users/me/update", post(update_name))
        .route("/users/me/update/password", post(update_password))
        .route("/users/me/update/email", post(request_email_update))
        .route("/users/me/update/phone", post(request_phone_update))
        .route("/users/me/update/confirmation", post(confirm_update))
        .route("/accounts", post(create_account).get(get_accounts))
        .route("/accounts/:account_id", delete(close_account))
        .route(
            "/accounts/operations",
            post(create_operation).get(get_operations),
        )
        .route("/currencies", post(create_currency).get(list_currencies))
        .route("/currencies/refresh", post(refresh_currencies))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    public
        .merge(protected)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

// =========================================================================
// POST /users
// =========================================================================

/// Register a new user and send their email confirmation code.
async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<RegisterUserResponse>), AppError> {
    let users = UserRepository::new(state.pool.clone());

    let user_id = users
        .register(
            NewUser {
                first_name: request.first_name,
                last_name: request.last_name,
                middle_name: request.middle_name,
                email: request.email,
                password: request.password,
                phone: request.phone,
            },
            state.notifier.as_ref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RegisterUserResponse { user_id })))
}

// =========================================================================
// POST /users/email_confirmation
// =========================================================================

/// Confirm a registration code.
async fn confirm_email(
    State(state): State<AppState>,
    Json(request): Json<ConfirmationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = UserRepository::new(state.pool.clone());

    let user_id = users
        .confirm_email(&request.confirmation_code)
        .await?
        .ok_or_else(|| AppError::InvalidRequest("Incorrect confirmation code".to_string()))?;

    Ok(Json(json!({ "user_id": user_id })))
}

// =========================================================================
// POST /token
// =========================================================================

/// Log in with email or phone plus password; returns a bearer token.
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let users = UserRepository::new(state.pool.clone());

    let user = users.authenticate(&form.username, &form.password).await?;
    let access_token = state.auth.issue(user.id).await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

// =========================================================================
// GET /users/me
// =========================================================================

/// Current user profile.
async fn me(Extension(current): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(current.user.into())
}

// =========================================================================
// POST /users/me/update
// =========================================================================

/// Update the current user's name fields.
async fn update_name(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdateNameRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = UserRepository::new(state.pool.clone());

    let user_id = users
        .update_name(
            current.user.id,
            request.first_name.as_deref(),
            request.last_name.as_deref(),
            request.middle_name.as_deref(),
        )
        .await?;

    Ok(Json(json!({ "user_id": user_id })))
}

// =========================================================================
// POST /users/me/update/password
// =========================================================================

/// Change the current user's password.
async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = UserRepository::new(state.pool.clone());

    let user_id = users
        .update_password(&current.user, &request.old_password, &request.new_password)
        .await?;

    Ok(Json(json!({ "user_id": user_id })))
}

// =========================================================================
// POST /users/me/update/email
// =========================================================================

/// Request an email change; the code goes to the current address.
async fn request_email_update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdateEmailRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = UserRepository::new(state.pool.clone());

    users
        .request_email_update(&current.user, &request.email, state.notifier.as_ref())
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}

// =========================================================================
// POST /users/me/update/phone
// =========================================================================

/// Request a phone change; the code goes to the user's email.
async fn request_phone_update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdatePhoneRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = UserRepository::new(state.pool.clone());

    users
        .request_phone_update(&current.user, &request.phone, state.notifier.as_ref())
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}

// =========================================================================
// POST /users/me/update/confirmation
// =========================================================================

/// Apply a pending email/phone change by its confirmation code.
async fn confirm_update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<ConfirmationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let users = UserRepository::new(state.pool.clone());

    let user_id = users
        .confirm_update(&current.user, &request.confirmation_code)
        .await?
        .ok_or_else(|| AppError::InvalidRequest("Incorrect confirmation code".to_string()))?;

    Ok(Json(json!({ "user_id": user_id })))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open an account in a stored currency.
async fn create_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let accounts = AccountRepository::new(state.pool.clone());

    let account = accounts
        .create(current.user.id, &request.currency_code, request.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

// =========================================================================
// GET /accounts
// =========================================================================

/// One account by id, or all accounts of the current user.
async fn get_accounts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<AccountQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let accounts = AccountRepository::new(state.pool.clone());

    let body = match query.account_id {
        Some(account_id) => {
            let account = accounts.get(account_id, Some(current.user.id)).await?;
            serde_json::to_value(account)
        }
        None => {
            let all = accounts.list_by_owner(current.user.id).await?;
            serde_json::to_value(all)
        }
    }
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(body))
}

// =========================================================================
// DELETE /accounts/:account_id
// =========================================================================

/// Close an account. Its operation history goes with it.
async fn close_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let accounts = AccountRepository::new(state.pool.clone());

    accounts.close(account_id, current.user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// POST /accounts/operations
// =========================================================================

/// Deposit, withdraw, or transfer to another account.
async fn create_operation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<OperationRequest>,
) -> Result<(StatusCode, Json<OperationResult>), AppError> {
    let handler = OperationHandler::new(state.pool.clone());

    let mut command = OperationCommand::new(request.account_id, request.amount_diff);
    if let Some(description) = request.description {
        command = command.with_description(description);
    }
    if let Some(recipient) = request.recipient_account {
        command = command.with_recipient(recipient);
    }

    let result = handler.execute(command, &current.user).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

// =========================================================================
// GET /accounts/operations
// =========================================================================

/// Operation history for one account, or for all accounts of the user.
async fn get_operations(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<AccountQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let accounts = AccountRepository::new(state.pool.clone());
    let ledger = Ledger::new(state.pool.clone());

    let body = match query.account_id {
        Some(account_id) => {
            accounts.get(account_id, Some(current.user.id)).await?;
            let operations = ledger.list_by_account(account_id).await?;
            serde_json::to_value(operations)
        }
        None => {
            let by_account = ledger.list_by_owner(current.user.id).await?;
            serde_json::to_value(by_account)
        }
    }
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(body))
}

// =========================================================================
// POST /currencies
// =========================================================================

/// Add a currency from the external rate table.
async fn create_currency(
    State(state): State<AppState>,
    Json(request): Json<CreateCurrencyRequest>,
) -> Result<(StatusCode, Json<Currency>), AppError> {
    let currencies = CurrencyRepository::new(state.pool.clone());

    let currency = currencies
        .create(state.rates.as_ref(), &request.char_code)
        .await?;

    Ok((StatusCode::CREATED, Json(currency)))
}

// =========================================================================
// GET /currencies
// =========================================================================

/// List stored currencies with their current rates.
async fn list_currencies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Currency>>, AppError> {
    let currencies = CurrencyRepository::new(state.pool.clone());
    Ok(Json(currencies.list().await?))
}

// =========================================================================
// POST /currencies/refresh
// =========================================================================

/// Refresh stored rates from the external source without waiting for the
/// scheduled job.
async fn refresh_currencies(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let currencies = CurrencyRepository::new(state.pool.clone());

    let updated = currencies.refresh(state.rates.as_ref()).await?;

    Ok(Json(json!({ "status": "ok", "updated": updated })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_deserialize() {
        let json = r#"{
            "email": "ivan@example.com",
            "password": "Str0ngPassword",
            "phone": "89000000000"
        }"#;

        let request: RegisterUserRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.email, "ivan@example.com");
        assert!(request.first_name.is_none());
    }

    #[test]
    fn test_operation_request_deserialize() {
        let json = r#"{
            "account_id": "66a5eabf-e55f-46b9-b6c7-bf01bc998ca3",
            "amount_diff": "-100000.00",
            "description": "Cash withdrawal"
        }"#;

        let request: OperationRequest = serde_json::from_str(json).unwrap();
        assert!(request.amount_diff.is_sign_negative());
        assert!(request.recipient_account.is_none());
    }

    #[test]
    fn test_account_query_defaults() {
        let query: AccountQuery = serde_json::from_str("{}").unwrap();
        assert!(query.account_id.is_none());
    }
}
