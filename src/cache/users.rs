//! Read-through user cache with name and email secondary indexes.
//!
//! Index entries (`user:name#..`, `user:email#..`) map to ids and expire on
//! their own schedule; renaming a user does not evict the old index entry.

use std::sync::Arc;
use std::time::Duration;

use crate::application::error::AppError;
use crate::application::repos::{CreateUserParams, RepoError, UserField, UsersRepo};
use crate::domain::entities::UserRecord;

use super::backend::KeyValueCache;
use super::keys::CacheNamespace;
use super::read_through::ReadThrough;

const ENTITY: &str = "user";

/// Whether a successful update evicts the primary cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invalidation {
    #[default]
    Invalidate,
    /// Leave the cached entry in place; used for housekeeping writes such as
    /// the last-login timestamp.
    Skip,
}

#[derive(Clone)]
pub struct CachedUsers {
    repo: Arc<dyn UsersRepo>,
    cache: ReadThrough,
    keys: CacheNamespace,
}

impl CachedUsers {
    pub fn new(
        repo: Arc<dyn UsersRepo>,
        cache: Arc<dyn KeyValueCache>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            repo,
            cache: ReadThrough::new(cache, ttl, ENTITY),
            keys: CacheNamespace::users(),
        }
    }

    pub fn keys(&self) -> &CacheNamespace {
        &self.keys
    }

    pub async fn get(&self, id: i64) -> Result<UserRecord, AppError> {
        let key = self.keys.id(id);
        self.cache
            .fetch(&key, || self.repo.find_user(id))
            .await
            .map_err(repo_error)?
            .ok_or(AppError::NotFound { entity: ENTITY })
    }

    pub async fn get_by_name(&self, name: &str) -> Result<UserRecord, AppError> {
        let key = self.keys.name(name);
        let id = self
            .cache
            .fetch(&key, || self.repo.find_user_id_by_name(name))
            .await
            .map_err(repo_error)?
            .ok_or(AppError::NotFound { entity: ENTITY })?;
        self.get(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<UserRecord, AppError> {
        let key = self.keys.email(email);
        let id = self
            .cache
            .fetch(&key, || self.repo.find_user_id_by_email(email))
            .await
            .map_err(repo_error)?
            .ok_or(AppError::NotFound { entity: ENTITY })?;
        self.get(id).await
    }

    /// Insert a user. Unique-index violations surface as `AppError::Conflict`.
    pub async fn create(&self, params: CreateUserParams) -> Result<UserRecord, AppError> {
        self.repo.create_user(params).await.map_err(repo_error)
    }

    /// Write the listed columns of `user`, then evict its primary entry unless
    /// told to skip.
    pub async fn update(
        &self,
        user: &UserRecord,
        fields: &[UserField],
        invalidation: Invalidation,
    ) -> Result<(), AppError> {
        self.repo
            .update_user_fields(user, fields)
            .await
            .map_err(repo_error)?;

        if invalidation == Invalidation::Invalidate {
            self.cache.invalidate(&[self.keys.id(user.id)]).await;
        }
        Ok(())
    }
}

fn repo_error(err: RepoError) -> AppError {
    AppError::from_repo(ENTITY, err)
}
