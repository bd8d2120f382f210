use tracing::warn;

use crate::application::error::AppError;
use crate::application::pagination::{PageRequest, Paged};
use crate::application::repos::{ArticleField, CreateArticleParams};
use crate::cache::articles::CachedArticles;
use crate::domain::entities::{ArticleRecord, ArticleSummary, ArticleView};

const SOURCE: &str = "application::articles";

/// Number of articles shown on the home page.
pub const HOME_LIST_SIZE: u64 = 5;

#[derive(Debug, Clone)]
pub struct CreateArticleCommand {
    pub weight: i64,
    pub category_id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub picture: String,
    pub sentence: String,
}

#[derive(Debug, Clone)]
pub struct UpdateArticleInfoCommand {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
}

#[derive(Clone)]
pub struct ArticleService {
    articles: CachedArticles,
}

impl ArticleService {
    pub fn new(articles: CachedArticles) -> Self {
        Self { articles }
    }

    pub async fn create(&self, command: CreateArticleCommand) -> Result<ArticleRecord, AppError> {
        if command.title.trim().is_empty() {
            return Err(AppError::validation("article title must not be empty"));
        }

        self.articles
            .create(CreateArticleParams {
                weight: command.weight.max(0),
                category_id: command.category_id,
                title: command.title,
                preview: command.preview,
                content: command.content,
                picture: command.picture,
                sentence: command.sentence,
            })
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.articles.delete(id).await
    }

    pub async fn update_info(&self, command: UpdateArticleInfoCommand) -> Result<(), AppError> {
        let mut article = self.articles.get(command.id).await?;
        let previous_category = article.category_id;
        article.category_id = command.category_id;
        article.title = command.title;
        article.preview = command.preview;
        article.content = command.content;

        self.articles
            .update(
                &article,
                previous_category,
                &[
                    ArticleField::CategoryId,
                    ArticleField::Title,
                    ArticleField::Preview,
                    ArticleField::Content,
                ],
            )
            .await
    }

    pub async fn update_weight(&self, id: i64, weight: i64) -> Result<(), AppError> {
        if weight < 0 {
            return Err(AppError::validation("weight must not be negative"));
        }
        let mut article = self.articles.get(id).await?;
        article.weight = weight;
        self.articles
            .update(&article, article.category_id, &[ArticleField::Weight])
            .await
    }

    /// Article with its category name; counts one view.
    pub async fn get(&self, id: i64) -> Result<ArticleView, AppError> {
        let article = self.articles.get(id).await?;
        let category_name = self.articles.category_name(article.category_id).await?;

        if let Err(err) = self.articles.increment_view(id).await {
            warn!(
                target_module = SOURCE,
                article_id = id,
                error = %err,
                "Failed to count article view"
            );
        }

        Ok(ArticleView {
            article,
            category_name,
        })
    }

    pub async fn list(&self, page: PageRequest) -> Result<Paged<ArticleSummary>, AppError> {
        let items = self.articles.list(page).await?;
        let total = self.articles.sum().await?;
        Ok(Paged { items, total })
    }

    pub async fn list_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> Result<Paged<ArticleSummary>, AppError> {
        let items = self.articles.list_by_category(category_id, page).await?;
        let total = self.articles.sum_by_category(category_id).await?;
        Ok(Paged { items, total })
    }

    pub async fn list_home(&self) -> Result<Vec<ArticleSummary>, AppError> {
        self.articles.list_featured(HOME_LIST_SIZE).await
    }
}
