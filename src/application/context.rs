//! Wiring of stores, caches and services into one handle for an outer layer.

use std::sync::Arc;

use crate::application::{
    admins::AdminService,
    articles::ArticleService,
    categories::CategoryService,
    email::{EmailService, Mailer},
    error::AppError,
    repos::{AdminsRepo, ArticlesRepo, CategoriesRepo, EmailTemplatesRepo, UsersRepo},
    users::UserService,
};
use crate::cache::{
    CachedArticles, CachedUsers, CategoryCollectionCache, KeyValueCache, VerificationCodes,
};
use crate::config::Settings;
use crate::infra::db::PostgresRepositories;
use crate::session::{Clock, SessionTokenManager};

/// Store adapters, one per record family.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepo>,
    pub articles: Arc<dyn ArticlesRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub admins: Arc<dyn AdminsRepo>,
    pub templates: Arc<dyn EmailTemplatesRepo>,
}

impl Repositories {
    pub fn postgres(repositories: Arc<PostgresRepositories>) -> Self {
        Self {
            users: repositories.clone(),
            articles: repositories.clone(),
            categories: repositories.clone(),
            admins: repositories.clone(),
            templates: repositories,
        }
    }
}

#[derive(Clone)]
pub struct ApplicationContext {
    pub users: UserService,
    pub admins: AdminService,
    pub categories: CategoryService,
    pub articles: ArticleService,
    pub email: EmailService,
    pub sessions: Arc<SessionTokenManager>,
    pub category_cache: Arc<CategoryCollectionCache>,
}

impl ApplicationContext {
    pub fn build(
        repositories: Repositories,
        cache: Arc<dyn KeyValueCache>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: &Settings,
    ) -> Result<Self, AppError> {
        let sessions = Arc::new(SessionTokenManager::new(
            &settings.session,
            &settings.server.name,
            cache.clone(),
            clock.clone(),
        )?);

        let entity_ttl = settings.cache.entity_ttl;
        let category_cache = Arc::new(CategoryCollectionCache::new(
            repositories.categories.clone(),
        ));
        let codes = VerificationCodes::new(cache.clone());

        let cached_users = CachedUsers::new(repositories.users, cache.clone(), entity_ttl);
        let cached_articles = CachedArticles::new(
            repositories.articles,
            category_cache.clone(),
            cache,
            entity_ttl,
        );

        Ok(Self {
            users: UserService::new(cached_users, codes.clone(), sessions.clone(), clock),
            admins: AdminService::new(repositories.admins, sessions.clone()),
            categories: CategoryService::new(repositories.categories, category_cache.clone()),
            articles: ArticleService::new(cached_articles),
            email: EmailService::new(repositories.templates, codes, mailer),
            sessions,
            category_cache,
        })
    }
}
