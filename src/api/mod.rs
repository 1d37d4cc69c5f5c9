//! API module
//!
//! HTTP routes, middleware, and shared state.

pub mod middleware;
pub mod routes;

pub use routes::create_router;

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::AuthProvider;
use crate::notify::Notifier;
use crate::rates::RateSource;

/// Shared application state for the API layer.
///
/// The trait objects are the injection points: tests and alternative
/// deployments swap them without touching the routes.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: Arc<dyn AuthProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub rates: Arc<dyn RateSource>,
}
