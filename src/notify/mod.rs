//! Confirmation-code delivery
//!
//! The core never talks to a mail server directly; it hands codes to a
//! [`Notifier`]. The shipped implementation records them in the log, which
//! is enough for development and tests.

use async_trait::async_trait;

/// Errors from delivering a notification
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Sends confirmation codes to users over an arbitrary channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_code(
        &self,
        recipient: &str,
        subject: &str,
        code: &str,
    ) -> Result<(), NotifyError>;
}

/// Notifier that writes codes to the application log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_code(
        &self,
        recipient: &str,
        subject: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %recipient,
            subject = %subject,
            code = %code,
            "Confirmation code issued"
        );
        Ok(())
    }
}
