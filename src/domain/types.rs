//! Shared domain enumerations aligned with persisted smallint columns.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Soft-delete marker for articles (`articles.state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ArticleState {
    #[default]
    Active = 0,
    Deleted = 1,
}

impl ArticleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl TryFrom<i16> for ArticleState {
    type Error = DomainError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Active),
            1 => Ok(Self::Deleted),
            other => Err(DomainError::invariant(format!(
                "unknown article state code {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum Gender {
    #[default]
    Secret = 1,
    Male = 5,
    Female = 10,
}

impl TryFrom<i16> for Gender {
    type Error = DomainError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Secret),
            5 => Ok(Self::Male),
            10 => Ok(Self::Female),
            other => Err(DomainError::validation(format!(
                "gender code must be one of 1, 5, 10 (got {other})"
            ))),
        }
    }
}

/// Authorization level carried inside session tokens.
///
/// Codes are ordered so a collaborator can compare against a minimum role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Normal,
    Admin,
}

impl Role {
    pub const fn code(self) -> i32 {
        match self {
            Self::Normal => 1,
            Self::Admin => 10,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Normal),
            10 => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Columns of a unique index whose violation is reported as a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictField {
    UserName,
    UserEmail,
    CategoryName,
}

pub const USER_NAME_INDEX: &str = "uidx_user_name";
pub const USER_EMAIL_INDEX: &str = "uidx_user_email";
pub const CATEGORY_NAME_INDEX: &str = "uidx_category_name";

impl ConflictField {
    /// Map a unique index name reported by the store to the field it guards.
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            USER_NAME_INDEX => Some(Self::UserName),
            USER_EMAIL_INDEX => Some(Self::UserEmail),
            CATEGORY_NAME_INDEX => Some(Self::CategoryName),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserName => "name",
            Self::UserEmail => "email",
            Self::CategoryName => "category name",
        }
    }
}
