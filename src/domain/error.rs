use thiserror::Error;

/// Violations detected while building domain values from raw input or rows.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid value: {message}")]
    Validation { message: String },
    #[error("stored record violates a domain invariant: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
