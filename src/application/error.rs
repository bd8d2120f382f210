use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::repos::RepoError,
    domain::{error::DomainError, types::ConflictField},
    infra::error::InfraError,
    session::SessionError,
};

/// Flattened error chain, ready to be logged by an outer layer.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn joined(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{} already taken", field.as_str())]
    Conflict { field: ConflictField },
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("verification code is missing or does not match")]
    InvalidVerificationCode,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("backing service unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Translate a store error raised while working on `entity`.
    pub fn from_repo(entity: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound { entity },
            RepoError::ReferenceNotFound { entity } => Self::NotFound { entity },
            RepoError::Duplicate { constraint } => match ConflictField::from_constraint(&constraint)
            {
                Some(field) => Self::Conflict { field },
                None => Self::Internal(format!(
                    "unexpected unique constraint `{constraint}` on {entity}"
                )),
            },
            RepoError::Persistence(message) => Self::Unavailable(message),
            RepoError::Timeout => Self::Unavailable("database timeout".to_string()),
            RepoError::InvalidInput { message } => Self::Validation(message),
            RepoError::Integrity { message } => Self::Internal(message),
        }
    }

    /// Message that is safe to show to an end user.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "Resource not found",
            AppError::Conflict { field } => match field {
                ConflictField::UserName => "Name already taken",
                ConflictField::UserEmail => "Email already registered",
                ConflictField::CategoryName => "Category already exists",
            },
            AppError::InvalidCredentials => "Invalid name or password",
            AppError::InvalidVerificationCode => "Verification code is invalid",
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                "Request could not be processed"
            }
            AppError::Session(SessionError::Missing) => "Not logged in",
            AppError::Session(SessionError::Expired) => "Session expired",
            AppError::Session(SessionError::Revoked) | AppError::Session(SessionError::Invalid) => {
                "Session is not valid"
            }
            AppError::Session(SessionError::Unavailable(_))
            | AppError::Infra(InfraError::Database { .. })
            | AppError::Infra(InfraError::Cache { .. })
            | AppError::Unavailable(_) => "Service temporarily unavailable",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Session(SessionError::Signing(_))
            | AppError::Session(SessionError::EmptySecret)
            | AppError::Domain(DomainError::Invariant { .. })
            | AppError::Internal(_) => "Unexpected error occurred",
        }
    }
}
