//! Registration code mails.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::application::error::AppError;
use crate::application::repos::EmailTemplatesRepo;
use crate::cache::codes::VerificationCodes;
use crate::domain::entities::{CODE_PLACEHOLDER, REGISTER_CODE_TEMPLATE};

pub const REGISTER_CODE_SUBJECT: &str = "Your registration code";

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct EmailService {
    templates: Arc<dyn EmailTemplatesRepo>,
    codes: VerificationCodes,
    mailer: Arc<dyn Mailer>,
}

impl EmailService {
    pub fn new(
        templates: Arc<dyn EmailTemplatesRepo>,
        codes: VerificationCodes,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            templates,
            codes,
            mailer,
        }
    }

    /// Generate a code for `email`, store it and mail it out.
    ///
    /// The code is saved before delivery, so a failed send can be retried
    /// by requesting a new code.
    pub async fn send_register_code(&self, email: &str) -> Result<(), AppError> {
        let template = self
            .templates
            .find_template(REGISTER_CODE_TEMPLATE)
            .await
            .map_err(|err| AppError::from_repo("email template", err))?
            .ok_or(AppError::NotFound {
                entity: "email template",
            })?;

        let code = VerificationCodes::generate();
        self.codes.save(email, &code).await?;

        let body = template.content.replace(CODE_PLACEHOLDER, &code);
        self.mailer
            .send(email, REGISTER_CODE_SUBJECT, &body)
            .await
            .map_err(|err| AppError::unavailable(err.to_string()))?;

        info!(target_module = "application::email", email, "Registration code sent");
        Ok(())
    }
}
