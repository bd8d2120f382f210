//! Cache key definitions.
//!
//! Every entity cache owns a [`CacheNamespace`] and derives its keys from it, so
//! the textual layout lives in exactly one place.

use std::fmt;

pub const USER_PREFIX: &str = "user";
pub const ARTICLE_PREFIX: &str = "article";
pub const EMAIL_PREFIX: &str = "email";

/// Key prefix shared by all entries of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheNamespace {
    prefix: String,
}

impl CacheNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn users() -> Self {
        Self::new(USER_PREFIX)
    }

    pub fn articles() -> Self {
        Self::new(ARTICLE_PREFIX)
    }

    pub fn emails() -> Self {
        Self::new(EMAIL_PREFIX)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Primary entry: `<prefix>:id#<id>`.
    pub fn id(&self, id: i64) -> String {
        format!("{}:id#{id}", self.prefix)
    }

    pub fn name(&self, name: &str) -> String {
        format!("{}:name#{name}", self.prefix)
    }

    pub fn email(&self, email: &str) -> String {
        format!("{}:email#{email}", self.prefix)
    }

    pub fn sum(&self) -> String {
        format!("{}:sum", self.prefix)
    }

    pub fn sum_by_category(&self, category_id: i64) -> String {
        format!("{}:sum:categoryId#{category_id}", self.prefix)
    }

    /// Verification code entry: `<prefix>:code#<email>`.
    pub fn code(&self, email: &str) -> String {
        format!("{}:code#{email}", self.prefix)
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// Server-wide revocation collection: `<server>:token:blacklist`.
pub fn revocation_set(server_name: &str) -> String {
    format!("{server_name}:token:blacklist")
}
