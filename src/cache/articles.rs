//! Read-through article cache, aggregate counters and enriched listings.

use std::sync::Arc;
use std::time::Duration;

use crate::application::error::AppError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{
    ArticleField, ArticleListRecord, ArticlesRepo, CreateArticleParams, RepoError,
};
use crate::domain::entities::{ArticleRecord, ArticleSummary};

use super::backend::KeyValueCache;
use super::categories::{CategoryCollectionCache, CategorySnapshot};
use super::keys::CacheNamespace;
use super::read_through::ReadThrough;

const ENTITY: &str = "article";

#[derive(Clone)]
pub struct CachedArticles {
    repo: Arc<dyn ArticlesRepo>,
    categories: Arc<CategoryCollectionCache>,
    cache: ReadThrough,
    keys: CacheNamespace,
}

impl CachedArticles {
    pub fn new(
        repo: Arc<dyn ArticlesRepo>,
        categories: Arc<CategoryCollectionCache>,
        cache: Arc<dyn KeyValueCache>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            repo,
            categories,
            cache: ReadThrough::new(cache, ttl, ENTITY),
            keys: CacheNamespace::articles(),
        }
    }

    pub fn keys(&self) -> &CacheNamespace {
        &self.keys
    }

    /// Active article by id.
    pub async fn get(&self, id: i64) -> Result<ArticleRecord, AppError> {
        let key = self.keys.id(id);
        self.cache
            .fetch(&key, || self.repo.find_article(id))
            .await
            .map_err(repo_error)?
            .ok_or(AppError::NotFound { entity: ENTITY })
    }

    /// Insert the article and bump its category count atomically.
    ///
    /// A missing category yields `NotFound { entity: "category" }` and leaves
    /// nothing behind. Aggregates are evicted only after the commit.
    pub async fn create(&self, params: CreateArticleParams) -> Result<ArticleRecord, AppError> {
        let article = self
            .repo
            .create_article(params)
            .await
            .map_err(repo_error)?;

        self.invalidate_aggregates(&[article.category_id]).await;
        Ok(article)
    }

    /// Write the listed columns and evict the primary entry.
    ///
    /// When `article.category_id` differs from `previous_category`, the row
    /// moves and both category counts are adjusted in the same transaction.
    /// The aggregates of both categories are then evicted.
    pub async fn update(
        &self,
        article: &ArticleRecord,
        previous_category: i64,
        fields: &[ArticleField],
    ) -> Result<(), AppError> {
        let moved = previous_category != article.category_id;
        if moved {
            self.repo
                .move_article(article, previous_category, fields)
                .await
                .map_err(repo_error)?;
        } else {
            self.repo
                .update_article_fields(article, fields)
                .await
                .map_err(repo_error)?;
        }

        self.cache.invalidate(&[self.keys.id(article.id)]).await;
        if moved {
            self.invalidate_aggregates(&[previous_category, article.category_id])
                .await;
        }
        Ok(())
    }

    /// Soft delete. Only an active row is flipped, and its category count is
    /// decremented in the same transaction.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let deleted = self.repo.soft_delete_article(id).await.map_err(repo_error)?;
        self.cache.invalidate(&[self.keys.id(id)]).await;

        let Some(category_id) = deleted else {
            return Err(AppError::NotFound { entity: ENTITY });
        };
        self.invalidate_aggregates(&[category_id]).await;
        Ok(())
    }

    /// Bump the view counter. The cached entry is left alone, so readers may
    /// see a stale count until it expires.
    pub async fn increment_view(&self, id: i64) -> Result<(), AppError> {
        self.repo.increment_views(id).await.map_err(repo_error)
    }

    /// Number of articles.
    pub async fn sum(&self) -> Result<u64, AppError> {
        let key = self.keys.sum();
        let total = self
            .cache
            .fetch(&key, || async { self.repo.count_articles().await.map(Some) })
            .await
            .map_err(repo_error)?;
        Ok(total.unwrap_or_default())
    }

    pub async fn sum_by_category(&self, category_id: i64) -> Result<u64, AppError> {
        let key = self.keys.sum_by_category(category_id);
        let total = self
            .cache
            .fetch(&key, || async {
                self.repo
                    .count_articles_in_category(category_id)
                    .await
                    .map(Some)
            })
            .await
            .map_err(repo_error)?;
        Ok(total.unwrap_or_default())
    }

    /// Newest articles first, enriched with category names.
    pub async fn list(&self, page: PageRequest) -> Result<Vec<ArticleSummary>, AppError> {
        let rows = self
            .repo
            .list_articles(page.offset(), page.limit())
            .await
            .map_err(repo_error)?;
        self.enrich(rows).await
    }

    pub async fn list_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> Result<Vec<ArticleSummary>, AppError> {
        let rows = self
            .repo
            .list_articles_in_category(category_id, page.offset(), page.limit())
            .await
            .map_err(repo_error)?;
        self.enrich(rows).await
    }

    /// Positively weighted articles, heaviest first.
    pub async fn list_featured(&self, limit: u64) -> Result<Vec<ArticleSummary>, AppError> {
        let rows = self
            .repo
            .list_featured_articles(limit)
            .await
            .map_err(repo_error)?;
        self.enrich(rows).await
    }

    /// Name of category `category_id`, empty when unknown.
    pub async fn category_name(&self, category_id: i64) -> Result<String, AppError> {
        let snapshot = self.category_snapshot().await?;
        Ok(snapshot.name_of(category_id).to_string())
    }

    async fn enrich(&self, rows: Vec<ArticleListRecord>) -> Result<Vec<ArticleSummary>, AppError> {
        let snapshot = self.category_snapshot().await?;
        Ok(rows
            .into_iter()
            .map(|row| ArticleSummary {
                category_name: snapshot.name_of(row.category_id).to_string(),
                id: row.id,
                category_id: row.category_id,
                title: row.title,
                preview: row.preview,
                views: row.views,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn category_snapshot(&self) -> Result<Arc<CategorySnapshot>, AppError> {
        self.categories
            .map()
            .await
            .map_err(|err| AppError::from_repo("category", err))
    }

    async fn invalidate_aggregates(&self, category_ids: &[i64]) {
        let mut keys = vec![self.keys.sum()];
        keys.extend(category_ids.iter().map(|&id| self.keys.sum_by_category(id)));
        self.cache.invalidate(&keys).await;
        self.categories.invalidate();
    }
}

fn repo_error(err: RepoError) -> AppError {
    AppError::from_repo(ENTITY, err)
}
