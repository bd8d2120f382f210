//! Mail delivery adapters.

use async_trait::async_trait;
use tracing::info;

use crate::application::email::{MailError, Mailer};

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        info!(
            target_module = "infra::mail",
            to,
            subject,
            body_len = html_body.len(),
            "Mail delivery skipped; logged only"
        );
        Ok(())
    }
}
