//! Short-lived email verification codes.
//!
//! Codes have no store fallback, so transport failures are reported to the
//! caller instead of being absorbed.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::application::error::AppError;

use super::backend::{CacheError, KeyValueCache};
use super::keys::CacheNamespace;

pub const CODE_TTL: Duration = Duration::from_secs(300);
pub const CODE_DIGITS: usize = 6;

#[derive(Clone)]
pub struct VerificationCodes {
    cache: Arc<dyn KeyValueCache>,
    keys: CacheNamespace,
}

impl VerificationCodes {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self {
            cache,
            keys: CacheNamespace::emails(),
        }
    }

    /// Random zero-padded numeric code.
    pub fn generate() -> String {
        let value = rand::thread_rng().gen_range(0..10u32.pow(CODE_DIGITS as u32));
        format!("{value:0width$}", width = CODE_DIGITS)
    }

    pub async fn save(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.cache
            .set(&self.keys.code(email), code.as_bytes().to_vec(), Some(CODE_TTL))
            .await
            .map_err(unavailable)
    }

    pub async fn get(&self, email: &str) -> Result<Option<String>, AppError> {
        let bytes = self
            .cache
            .get(&self.keys.code(email))
            .await
            .map_err(unavailable)?;
        Ok(bytes.and_then(|bytes| String::from_utf8(bytes).ok()))
    }

    pub async fn invalidate(&self, email: &str) -> Result<(), AppError> {
        self.cache
            .delete(&[self.keys.code(email)])
            .await
            .map_err(unavailable)
    }
}

fn unavailable(err: CacheError) -> AppError {
    AppError::unavailable(err.to_string())
}
