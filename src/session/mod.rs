//! Signed session tokens and the revocation list that backs logout.
//!
//! A token moves from issued to valid, and ends either expired or revoked.
//! Revoked tokens are kept in one score-ordered cache collection, scored by
//! their own expiry so that stale entries can be pruned by range.

mod claims;
mod clock;
mod manager;

pub use claims::SessionClaims;
pub use clock::{Clock, SystemClock};
pub use manager::{RevocationCheckPolicy, SessionTokenManager};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session token supplied")]
    Missing,
    #[error("session token is malformed or carries a bad signature")]
    Invalid,
    #[error("session token has expired")]
    Expired,
    #[error("session token has been revoked")]
    Revoked,
    #[error("revocation list unavailable: {0}")]
    Unavailable(String),
    #[error("failed to sign session token: {0}")]
    Signing(String),
    #[error("session secret must not be empty")]
    EmptySecret,
}
