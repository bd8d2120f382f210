//! In-memory stores and cache doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quire::application::context::{ApplicationContext, Repositories};
use quire::application::email::{MailError, Mailer};
use quire::application::repos::{
    AdminsRepo, ArticleField, ArticleListRecord, ArticlesRepo, CategoriesRepo,
    CreateArticleParams, CreateUserParams, EmailTemplatesRepo, RepoError, UserField, UsersRepo,
};
use quire::cache::{CacheError, KeyValueCache, MemoryCache};
use quire::config::{
    CacheBackendKind, CacheSettings, DatabaseSettings, LogFormat, LoggingSettings, ServerSettings,
    SessionSettings, Settings,
};
use quire::domain::entities::{
    AdminRecord, ArticleRecord, CategoryRecord, EmailTemplateRecord, UserRecord,
};
use quire::domain::password::hash_password;
use quire::domain::types::{
    ArticleState, CATEGORY_NAME_INDEX, USER_EMAIL_INDEX, USER_NAME_INDEX,
};
use quire::session::{Clock, RevocationCheckPolicy};
use tokio::sync::Semaphore;
use tracing::level_filters::LevelFilter;

pub const NOW: i64 = 1_700_000_000;
pub const SECRET: &str = "integration-secret";

pub fn settings(policy: RevocationCheckPolicy) -> Settings {
    Settings {
        server: ServerSettings {
            name: "blog".to_string(),
        },
        logging: LoggingSettings {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        },
        database: DatabaseSettings {
            url: None,
            max_connections: NonZeroU32::MIN,
            acquire_timeout: Duration::from_secs(1),
        },
        cache: CacheSettings {
            backend: CacheBackendKind::Memory,
            redis_url: None,
            pool_size: 1,
            timeout: Duration::from_secs(1),
            entity_ttl: Some(Duration::from_secs(3_600)),
        },
        session: SessionSettings {
            secret: SECRET.to_string(),
            ttl: Duration::from_secs(72 * 3_600),
            revocation_check: policy,
        },
    }
}

pub fn repositories(store: &Arc<InMemoryStore>) -> Repositories {
    Repositories {
        users: store.clone(),
        articles: store.clone(),
        categories: store.clone(),
        admins: store.clone(),
        templates: store.clone(),
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<FlakyCache>,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<RecordingMailer>,
    pub app: ApplicationContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(RevocationCheckPolicy::FailOpen)
    }

    pub fn with_policy(policy: RevocationCheckPolicy) -> Self {
        let store = InMemoryStore::new();
        let cache = FlakyCache::new();
        let clock = ManualClock::new(NOW);
        let mailer = RecordingMailer::new();
        let app = ApplicationContext::build(
            repositories(&store),
            cache.clone(),
            mailer.clone(),
            clock.clone(),
            &settings(policy),
        )
        .expect("application context");
        Self {
            store,
            cache,
            clock,
            mailer,
            app,
        }
    }
}

/// Clock the tests move by hand.
#[derive(Debug)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wraps a [`MemoryCache`] and fails every call while the switch is on.
#[derive(Debug, Default)]
pub struct FlakyCache {
    inner: MemoryCache,
    failing: AtomicBool,
}

impl FlakyCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryCache {
        &self.inner
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueCache for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        self.check()?;
        self.inner.delete(keys).await
    }

    async fn sorted_add(&self, set: &str, member: &str, score: i64) -> Result<(), CacheError> {
        self.check()?;
        self.inner.sorted_add(set, member, score).await
    }

    async fn sorted_remove_by_score(
        &self,
        set: &str,
        min: i64,
        max: i64,
    ) -> Result<u64, CacheError> {
        self.check()?;
        self.inner.sorted_remove_by_score(set, min, max).await
    }

    async fn sorted_score(&self, set: &str, member: &str) -> Result<Option<i64>, CacheError> {
        self.check()?;
        self.inner.sorted_score(set, member).await
    }
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: i64,
    users: BTreeMap<i64, UserRecord>,
    articles: BTreeMap<i64, ArticleRecord>,
    categories: BTreeMap<i64, CategoryRecord>,
    admins: Vec<AdminRecord>,
    templates: Vec<EmailTemplateRecord>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn listing(&self, filter: impl Fn(&ArticleRecord) -> bool) -> Vec<ArticleListRecord> {
        let mut rows: Vec<&ArticleRecord> = self
            .articles
            .values()
            .filter(|article| article.state.is_active() && filter(article))
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows.into_iter().map(list_record).collect()
    }
}

/// Relational store double with the same unique indexes as the schema.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    pub user_loads: AtomicUsize,
    pub article_loads: AtomicUsize,
    pub count_loads: AtomicUsize,
    pub category_loads: AtomicUsize,
    category_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("store state lock")
    }

    /// Hold every category reload until the returned semaphore gets a permit.
    pub fn gate_category_loads(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.category_gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }

    pub fn seed_category(&self, name: &str) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.categories.insert(
            id,
            CategoryRecord {
                id,
                name: name.to_string(),
                article_count: 0,
            },
        );
        id
    }

    pub fn seed_user(&self, name: &str, email: &str, password: &str) -> i64 {
        let salted = hash_password(password);
        let mut state = self.state();
        let id = state.next_id();
        state.users.insert(
            id,
            UserRecord {
                id,
                name: name.to_string(),
                password: salted.digest,
                salt: salted.salt,
                gender: Default::default(),
                introduce: String::new(),
                github: String::new(),
                email: email.to_string(),
                created_at: NOW,
                updated_at: NOW,
                login_at: 0,
            },
        );
        id
    }

    pub fn seed_admin(&self, name: &str, password: &str) -> i64 {
        let salted = hash_password(password);
        let mut state = self.state();
        let id = state.next_id();
        state.admins.push(AdminRecord {
            id,
            name: name.to_string(),
            password: salted.digest,
            salt: salted.salt,
        });
        id
    }

    pub fn seed_template(&self, name: &str, content: &str) {
        let mut state = self.state();
        let id = state.next_id();
        state.templates.push(EmailTemplateRecord {
            id,
            name: name.to_string(),
            content: content.to_string(),
        });
    }

    /// Row as stored, bypassing every cache.
    pub fn user_row(&self, id: i64) -> Option<UserRecord> {
        self.state().users.get(&id).cloned()
    }

    pub fn article_row(&self, id: i64) -> Option<ArticleRecord> {
        self.state().articles.get(&id).cloned()
    }

    pub fn article_rows(&self) -> usize {
        self.state().articles.len()
    }

    pub fn category_row(&self, id: i64) -> Option<CategoryRecord> {
        self.state().categories.get(&id).cloned()
    }

    /// Change a user row directly, as another process would.
    pub fn rewrite_user(&self, id: i64, change: impl FnOnce(&mut UserRecord)) {
        if let Some(user) = self.state().users.get_mut(&id) {
            change(user);
        }
    }
}

fn list_record(article: &ArticleRecord) -> ArticleListRecord {
    ArticleListRecord {
        id: article.id,
        category_id: article.category_id,
        title: article.title.clone(),
        preview: article.preview.clone(),
        views: article.views,
        created_at: article.created_at,
        updated_at: article.updated_at,
    }
}

fn page(rows: Vec<ArticleListRecord>, offset: u64, limit: u64) -> Vec<ArticleListRecord> {
    let rows = rows.into_iter().skip(offset as usize);
    if limit == 0 {
        rows.collect()
    } else {
        rows.take(limit as usize).collect()
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        self.user_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state().users.get(&id).cloned())
    }

    async fn find_user_id_by_name(&self, name: &str) -> Result<Option<i64>, RepoError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| user.name == name)
            .map(|user| user.id))
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>, RepoError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| user.email == email)
            .map(|user| user.id))
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state();
        if state.users.values().any(|user| user.name == params.name) {
            return Err(RepoError::Duplicate {
                constraint: USER_NAME_INDEX.to_string(),
            });
        }
        if state.users.values().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: USER_EMAIL_INDEX.to_string(),
            });
        }

        let id = state.next_id();
        let user = UserRecord {
            id,
            name: params.name,
            password: params.password,
            salt: params.salt,
            gender: params.gender,
            introduce: params.introduce,
            github: params.github,
            email: params.email,
            created_at: NOW,
            updated_at: NOW,
            login_at: 0,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user_fields(
        &self,
        user: &UserRecord,
        fields: &[UserField],
    ) -> Result<(), RepoError> {
        let mut state = self.state();
        let row = state.users.get_mut(&user.id).ok_or(RepoError::NotFound)?;
        for field in fields {
            match field {
                UserField::Name => row.name = user.name.clone(),
                UserField::Password => row.password = user.password.clone(),
                UserField::Salt => row.salt = user.salt.clone(),
                UserField::Gender => row.gender = user.gender,
                UserField::Introduce => row.introduce = user.introduce.clone(),
                UserField::Github => row.github = user.github.clone(),
                UserField::Email => row.email = user.email.clone(),
                UserField::LoginAt => row.login_at = user.login_at,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ArticlesRepo for InMemoryStore {
    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        self.article_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state()
            .articles
            .get(&id)
            .filter(|article| article.state.is_active())
            .cloned())
    }

    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state();
        if !state.categories.contains_key(&params.category_id) {
            return Err(RepoError::ReferenceNotFound { entity: "category" });
        }

        let id = state.next_id();
        let article = ArticleRecord {
            id,
            weight: params.weight,
            category_id: params.category_id,
            title: params.title,
            views: 0,
            preview: params.preview,
            content: params.content,
            picture: params.picture,
            sentence: params.sentence,
            state: ArticleState::Active,
            created_at: NOW + id,
            updated_at: NOW + id,
        };
        state.articles.insert(id, article.clone());
        if let Some(category) = state.categories.get_mut(&params.category_id) {
            category.article_count += 1;
        }
        Ok(article)
    }

    async fn update_article_fields(
        &self,
        article: &ArticleRecord,
        fields: &[ArticleField],
    ) -> Result<(), RepoError> {
        let mut state = self.state();
        let row = state
            .articles
            .get_mut(&article.id)
            .ok_or(RepoError::NotFound)?;
        for field in fields {
            match field {
                ArticleField::Weight => row.weight = article.weight,
                ArticleField::CategoryId => row.category_id = article.category_id,
                ArticleField::Title => row.title = article.title.clone(),
                ArticleField::Preview => row.preview = article.preview.clone(),
                ArticleField::Content => row.content = article.content.clone(),
                ArticleField::Picture => row.picture = article.picture.clone(),
                ArticleField::Sentence => row.sentence = article.sentence.clone(),
                ArticleField::State => row.state = article.state,
            }
        }
        Ok(())
    }

    async fn move_article(
        &self,
        article: &ArticleRecord,
        from_category: i64,
        fields: &[ArticleField],
    ) -> Result<(), RepoError> {
        {
            let state = self.state();
            if !state.categories.contains_key(&article.category_id) {
                return Err(RepoError::ReferenceNotFound { entity: "category" });
            }
            if !state.articles.contains_key(&article.id) {
                return Err(RepoError::NotFound);
            }
        }
        self.update_article_fields(article, fields).await?;

        let mut state = self.state();
        if let Some(from) = state.categories.get_mut(&from_category) {
            from.article_count = (from.article_count - 1).max(0);
        }
        if let Some(to) = state.categories.get_mut(&article.category_id) {
            to.article_count += 1;
        }
        Ok(())
    }

    async fn soft_delete_article(&self, id: i64) -> Result<Option<i64>, RepoError> {
        let mut state = self.state();
        let Some(row) = state
            .articles
            .get_mut(&id)
            .filter(|row| row.state.is_active())
        else {
            return Ok(None);
        };
        row.state = ArticleState::Deleted;
        let category_id = row.category_id;
        if let Some(category) = state.categories.get_mut(&category_id) {
            category.article_count = (category.article_count - 1).max(0);
        }
        Ok(Some(category_id))
    }

    async fn increment_views(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state();
        let row = state.articles.get_mut(&id).ok_or(RepoError::NotFound)?;
        row.views += 1;
        Ok(())
    }

    async fn count_articles(&self) -> Result<u64, RepoError> {
        self.count_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state()
            .articles
            .values()
            .filter(|article| article.state.is_active())
            .count() as u64)
    }

    async fn count_articles_in_category(&self, category_id: i64) -> Result<u64, RepoError> {
        self.count_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state()
            .articles
            .values()
            .filter(|article| article.state.is_active() && article.category_id == category_id)
            .count() as u64)
    }

    async fn list_articles(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError> {
        Ok(page(self.state().listing(|_| true), offset, limit))
    }

    async fn list_articles_in_category(
        &self,
        category_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError> {
        let rows = self
            .state()
            .listing(|article| article.category_id == category_id);
        Ok(page(rows, offset, limit))
    }

    async fn list_featured_articles(
        &self,
        limit: u64,
    ) -> Result<Vec<ArticleListRecord>, RepoError> {
        let state = self.state();
        let mut rows: Vec<&ArticleRecord> = state
            .articles
            .values()
            .filter(|article| article.state.is_active() && article.weight > 0)
            .collect();
        rows.sort_by(|a, b| (b.weight, b.created_at).cmp(&(a.weight, a.created_at)));
        Ok(page(rows.into_iter().map(list_record).collect(), 0, limit))
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryStore {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.category_loads.fetch_add(1, Ordering::SeqCst);
        let gate = self.category_gate.lock().expect("gate lock").clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(RepoError::from_persistence)?
                .forget();
        }
        Ok(self.state().categories.values().cloned().collect())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .state()
            .categories
            .values()
            .find(|category| category.name == name)
            .cloned())
    }

    async fn create_category(&self, name: &str) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state();
        if state.categories.values().any(|category| category.name == name) {
            return Err(RepoError::Duplicate {
                constraint: CATEGORY_NAME_INDEX.to_string(),
            });
        }
        let id = state.next_id();
        let category = CategoryRecord {
            id,
            name: name.to_string(),
            article_count: 0,
        };
        state.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn rename_category(&self, id: i64, name: &str) -> Result<(), RepoError> {
        let mut state = self.state();
        let category = state.categories.get_mut(&id).ok_or(RepoError::NotFound)?;
        category.name = name.to_string();
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> Result<(), RepoError> {
        self.state()
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl AdminsRepo for InMemoryStore {
    async fn find_admin_by_name(&self, name: &str) -> Result<Option<AdminRecord>, RepoError> {
        Ok(self
            .state()
            .admins
            .iter()
            .find(|admin| admin.name == name)
            .cloned())
    }
}

#[async_trait]
impl EmailTemplatesRepo for InMemoryStore {
    async fn find_template(
        &self,
        name: &str,
    ) -> Result<Option<EmailTemplateRecord>, RepoError> {
        Ok(self
            .state()
            .templates
            .iter()
            .find(|template| template.name == name)
            .cloned())
    }
}

/// Mailer that keeps every message it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        self.sent.lock().expect("mailer lock").push((
            to.to_string(),
            subject.to_string(),
            html_body.to_string(),
        ));
        Ok(())
    }
}
