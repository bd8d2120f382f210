use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::backend::KeyValueCache;
use crate::cache::keys::revocation_set;
use crate::config::SessionSettings;
use crate::domain::types::Role;

use super::{Clock, SessionClaims, SessionError, SystemClock};

const SOURCE: &str = "session::manager";

/// What a revocation check does when the cache cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationCheckPolicy {
    /// Treat the token as not revoked and log a warning.
    #[default]
    FailOpen,
    /// Reject the request with `SessionError::Unavailable`.
    FailClosed,
}

impl RevocationCheckPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailOpen => "fail_open",
            Self::FailClosed => "fail_closed",
        }
    }
}

/// Issues HS256 session tokens and tracks revoked ones in the key-value cache.
pub struct SessionTokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
    policy: RevocationCheckPolicy,
    revocation_set: String,
    cache: Arc<dyn KeyValueCache>,
    clock: Arc<dyn Clock>,
}

impl SessionTokenManager {
    pub fn new(
        settings: &SessionSettings,
        server_name: &str,
        cache: Arc<dyn KeyValueCache>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SessionError> {
        if settings.secret.is_empty() {
            return Err(SessionError::EmptySecret);
        }

        let secret = settings.secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the injected clock instead.
        validation.validate_exp = false;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds: i64::try_from(settings.ttl.as_secs()).unwrap_or(i64::MAX),
            policy: settings.revocation_check,
            revocation_set: revocation_set(server_name),
            cache,
            clock,
        })
    }

    pub fn with_system_clock(
        settings: &SessionSettings,
        server_name: &str,
        cache: Arc<dyn KeyValueCache>,
    ) -> Result<Self, SessionError> {
        Self::new(settings, server_name, cache, Arc::new(SystemClock))
    }

    pub fn revocation_set(&self) -> &str {
        &self.revocation_set
    }

    /// Sign a token for `subject_id` valid for the configured lifetime.
    pub fn create(&self, subject_id: i64, role: Role) -> Result<String, SessionError> {
        let iat = self.clock.now();
        let claims = SessionClaims {
            subject_id,
            role: role.code(),
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| SessionError::Signing(err.to_string()))
    }

    /// Verify signature and structure only; expiry and revocation are not checked.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!(target_module = SOURCE, error = %err, "Rejected session token");
                SessionError::Invalid
            })
    }

    pub async fn validate(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let claims = self.decode(token)?;
        if claims.is_expired_at(self.clock.now()) {
            return Err(SessionError::Expired);
        }

        match self.cache.sorted_score(&self.revocation_set, token).await {
            Ok(Some(_)) => Err(SessionError::Revoked),
            Ok(None) => Ok(claims),
            Err(err) => match self.policy {
                RevocationCheckPolicy::FailOpen => {
                    warn!(
                        target_module = SOURCE,
                        subject_id = claims.subject_id,
                        policy = self.policy.as_str(),
                        error = %err,
                        "Revocation check failed; accepting token"
                    );
                    Ok(claims)
                }
                RevocationCheckPolicy::FailClosed => Err(SessionError::Unavailable(err.to_string())),
            },
        }
    }

    /// Validate an optional token; `None` means the caller never logged in.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<SessionClaims, SessionError> {
        match token {
            Some(token) if !token.is_empty() => self.validate(token).await,
            _ => Err(SessionError::Missing),
        }
    }

    /// Add `token` to the revocation list until its own expiry.
    ///
    /// Entries that already expired are pruned first. Tokens that are invalid
    /// or already expired need no entry and are ignored.
    ///
    /// Pruning runs before the token is decoded, so revoking an unusable
    /// token still clears expired entries.
    pub async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let now = self.clock.now();
        if let Err(err) = self.prune_until(now).await {
            warn!(
                target_module = SOURCE,
                error = %err,
                "Failed to prune revocation list"
            );
        }

        let claims = match self.decode(token) {
            Ok(claims) if !claims.is_expired_at(now) => claims,
            _ => {
                debug!(target_module = SOURCE, "Skipping revocation of unusable token");
                return Ok(());
            }
        };

        self.cache
            .sorted_add(&self.revocation_set, token, claims.exp)
            .await
            .map_err(|err| SessionError::Unavailable(err.to_string()))
    }

    /// Drop revocation entries whose token has expired by now.
    pub async fn prune(&self) -> Result<u64, SessionError> {
        self.prune_until(self.clock.now()).await
    }

    async fn prune_until(&self, now: i64) -> Result<u64, SessionError> {
        let removed = self
            .cache
            .sorted_remove_by_score(&self.revocation_set, 0, now)
            .await
            .map_err(|err| SessionError::Unavailable(err.to_string()))?;
        if removed > 0 {
            debug!(target_module = SOURCE, removed, "Pruned revocation list");
        }
        Ok(removed)
    }
}
