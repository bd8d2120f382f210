//! Domain entities mirrored from persistent storage.
//!
//! Timestamps are unix seconds, matching the columns the records are loaded from.

use serde::{Deserialize, Serialize};

use crate::domain::types::{ArticleState, Gender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub password: String,
    pub salt: String,
    pub gender: Gender,
    pub introduce: String,
    pub github: String,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub login_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    /// Home-page ranking; zero keeps the article off the featured list.
    pub weight: i64,
    pub category_id: i64,
    pub title: String,
    pub views: i64,
    pub preview: String,
    pub content: String,
    pub picture: String,
    pub sentence: String,
    pub state: ArticleState,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Listing projection of an article, enriched with its category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub title: String,
    pub preview: String,
    pub views: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Article together with the name of its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: ArticleRecord,
    pub category_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    /// Number of non-deleted articles referencing this category.
    pub article_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecord {
    pub id: i64,
    pub name: String,
    pub password: String,
    pub salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplateRecord {
    pub id: i64,
    pub name: String,
    pub content: String,
}

/// Template used for registration verification mails.
pub const REGISTER_CODE_TEMPLATE: &str = "register_code";
/// Placeholder replaced by the generated code inside the template body.
pub const CODE_PLACEHOLDER: &str = "${{code}}";
