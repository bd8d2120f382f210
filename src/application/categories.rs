use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::pagination::{PageRequest, Paged};
use crate::application::repos::{CategoriesRepo, RepoError};
use crate::cache::categories::CategoryCollectionCache;
use crate::domain::entities::CategoryRecord;
use crate::domain::types::ConflictField;

const ENTITY: &str = "category";

/// Category writes go to the store and invalidate the shared collection cache.
#[derive(Clone)]
pub struct CategoryService {
    repo: Arc<dyn CategoriesRepo>,
    collection: Arc<CategoryCollectionCache>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoriesRepo>, collection: Arc<CategoryCollectionCache>) -> Self {
        Self { repo, collection }
    }

    pub async fn create(&self, name: &str) -> Result<CategoryRecord, AppError> {
        let name = normalize_name(name)?;
        if self.find_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict {
                field: ConflictField::CategoryName,
            });
        }

        // The unique index still backs the pre-check against concurrent creates.
        let category = self
            .repo
            .create_category(&name)
            .await
            .map_err(repo_error)?;
        self.collection.invalidate();
        Ok(category)
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<(), AppError> {
        let name = normalize_name(name)?;
        if let Some(existing) = self.find_by_name(&name).await?
            && existing.id != id
        {
            return Err(AppError::Conflict {
                field: ConflictField::CategoryName,
            });
        }

        self.repo
            .rename_category(id, &name)
            .await
            .map_err(repo_error)?;
        self.collection.invalidate();
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.repo.delete_category(id).await.map_err(repo_error)?;
        self.collection.invalidate();
        Ok(())
    }

    pub async fn list(&self, page: PageRequest) -> Result<Paged<CategoryRecord>, AppError> {
        let items = self.collection.list(page).await.map_err(repo_error)?;
        let total = self.collection.sum().await.map_err(repo_error)?;
        Ok(Paged { items, total })
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRecord>, AppError> {
        self.repo
            .find_category_by_name(name)
            .await
            .map_err(repo_error)
    }
}

fn normalize_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("category name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn repo_error(err: RepoError) -> AppError {
    AppError::from_repo(ENTITY, err)
}
