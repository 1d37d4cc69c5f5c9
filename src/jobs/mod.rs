//! Scheduled Jobs
//!
//! Background jobs running alongside request handling: the periodic
//! exchange-rate refresh and session-table maintenance.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::time::interval;

use crate::currencies::CurrencyRepository;
use crate::error::AppError;
use crate::rates::RateSource;

// =========================================================================
// Currency Rate Refresh Job
// =========================================================================

/// Refresh stored exchange rates from the external source.
/// Currencies absent from the fetched table keep their current rate.
pub async fn refresh_currency_rates(
    pool: &PgPool,
    source: &dyn RateSource,
) -> Result<u64, AppError> {
    CurrencyRepository::new(pool.clone()).refresh(source).await
}

// =========================================================================
// Expired Session Cleanup Job
// =========================================================================

/// Delete sessions past their expiry time.
pub async fn cleanup_expired_sessions(pool: &PgPool) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
        .execute(pool)
        .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(rows_deleted = rows_deleted, "Deleted expired sessions");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval between rate refreshes (default: 24 hours)
    pub rates_refresh_interval: Duration,
    /// Interval between session cleanups (default: 1 hour)
    pub session_cleanup_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            rates_refresh_interval: Duration::from_secs(86400),
            session_cleanup_interval: Duration::from_secs(3600),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    rates: Arc<dyn RateSource>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool, rates: Arc<dyn RateSource>) -> Self {
        Self {
            pool,
            rates,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(
        pool: PgPool,
        rates: Arc<dyn RateSource>,
        config: JobSchedulerConfig,
    ) -> Self {
        Self { pool, rates, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut rates_interval = interval(self.config.rates_refresh_interval);
        let mut session_interval = interval(self.config.session_cleanup_interval);

        loop {
            tokio::select! {
                _ = rates_interval.tick() => {
                    if let Err(e) = refresh_currency_rates(&self.pool, self.rates.as_ref()).await {
                        tracing::error!(error = %e, "Currency rate refresh failed");
                    }
                }
                _ = session_interval.tick() => {
                    if let Err(e) = cleanup_expired_sessions(&self.pool).await {
                        tracing::error!(error = %e, "Session cleanup failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match refresh_currency_rates(&self.pool, self.rates.as_ref()).await {
            Ok(count) => report.rates_updated = count,
            Err(e) => report.errors.push(format!("Rate refresh: {}", e)),
        }

        match cleanup_expired_sessions(&self.pool).await {
            Ok(count) => report.sessions_deleted = count,
            Err(e) => report.errors.push(format!("Session cleanup: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub rates_updated: u64,
    pub sessions_deleted: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

// =========================================================================
// Tests
// =========================================================================
