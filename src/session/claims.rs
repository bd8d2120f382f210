use serde::{Deserialize, Serialize};

use crate::domain::types::Role;

/// Payload carried by every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "subjectId")]
    pub subject_id: i64,
    /// Numeric role code, see [`Role::code`].
    pub role: i32,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn role(&self) -> Option<Role> {
        Role::from_code(self.role)
    }

    /// Whether the token grants at least `minimum`.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum.code()
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
