//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    AdminRecord, ArticleRecord, CategoryRecord, EmailTemplateRecord, UserRecord,
};
use crate::domain::types::Gender;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("referenced {entity} does not exist")]
    ReferenceNotFound { entity: &'static str },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// User columns that may be written by a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Name,
    Password,
    Salt,
    Gender,
    Introduce,
    Github,
    Email,
    LoginAt,
}

impl UserField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Password => "password",
            Self::Salt => "salt",
            Self::Gender => "gender",
            Self::Introduce => "introduce",
            Self::Github => "github",
            Self::Email => "email",
            Self::LoginAt => "login_at",
        }
    }
}

/// Article columns that may be written by a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleField {
    Weight,
    CategoryId,
    Title,
    Preview,
    Content,
    Picture,
    Sentence,
    State,
}

impl ArticleField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::CategoryId => "category_id",
            Self::Title => "title",
            Self::Preview => "preview",
            Self::Content => "content",
            Self::Picture => "picture",
            Self::Sentence => "sentence",
            Self::State => "state",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub password: String,
    pub salt: String,
    pub gender: Gender,
    pub introduce: String,
    pub github: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub weight: i64,
    pub category_id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub picture: String,
    pub sentence: String,
}

/// Article row as returned by listing queries (no body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleListRecord {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub preview: String,
    pub views: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_id_by_name(&self, name: &str) -> Result<Option<i64>, RepoError>;

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    /// Write only the listed columns of `user`; `RepoError::NotFound` when no row matched.
    async fn update_user_fields(
        &self,
        user: &UserRecord,
        fields: &[UserField],
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// Active articles only.
    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;

    /// Insert the article and bump its category's count in one transaction.
    ///
    /// Fails with `RepoError::ReferenceNotFound { entity: "category" }` and leaves no
    /// row behind when the category does not exist.
    async fn create_article(&self, params: CreateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    async fn update_article_fields(
        &self,
        article: &ArticleRecord,
        fields: &[ArticleField],
    ) -> Result<(), RepoError>;

    /// Write the listed columns and move one unit of `article_count` from
    /// `from_category` to `article.category_id`, all in one transaction.
    ///
    /// Fails with `RepoError::ReferenceNotFound { entity: "category" }` and
    /// changes nothing when the target category does not exist.
    async fn move_article(
        &self,
        article: &ArticleRecord,
        from_category: i64,
        fields: &[ArticleField],
    ) -> Result<(), RepoError>;

    /// Flip an active article to deleted and decrement its category count in
    /// one transaction. Returns the category id, or `None` when no active row
    /// matched.
    async fn soft_delete_article(&self, id: i64) -> Result<Option<i64>, RepoError>;

    async fn increment_views(&self, id: i64) -> Result<(), RepoError>;

    async fn count_articles(&self) -> Result<u64, RepoError>;

    async fn count_articles_in_category(&self, category_id: i64) -> Result<u64, RepoError>;

    /// Newest first.
    async fn list_articles(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError>;

    async fn list_articles_in_category(
        &self,
        category_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError>;

    /// Articles with positive weight, heaviest then newest first.
    async fn list_featured_articles(
        &self,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// All categories ordered by id.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category_by_name(&self, name: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn create_category(&self, name: &str) -> Result<CategoryRecord, RepoError>;

    async fn rename_category(&self, id: i64, name: &str) -> Result<(), RepoError>;

    async fn delete_category(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait AdminsRepo: Send + Sync {
    async fn find_admin_by_name(&self, name: &str) -> Result<Option<AdminRecord>, RepoError>;
}

#[async_trait]
pub trait EmailTemplatesRepo: Send + Sync {
    async fn find_template(&self, name: &str)
    -> Result<Option<EmailTemplateRecord>, RepoError>;
}
