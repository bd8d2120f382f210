//! Whole-collection category cache with single-flight reloads.
//!
//! The full category table is small and read on nearly every article listing,
//! so it is held in memory as one immutable snapshot. Writes elsewhere call
//! [`CategoryCollectionCache::invalidate`]; the next reader reloads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use metrics::counter;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::pagination::PageRequest;
use crate::application::repos::{CategoriesRepo, RepoError};
use crate::domain::entities::CategoryRecord;
use crate::infra::telemetry::CATEGORY_RELOAD_TOTAL;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::categories";

/// Ordered collection and id index built from the same load.
#[derive(Debug, Default)]
pub struct CategorySnapshot {
    collection: Vec<CategoryRecord>,
    index: HashMap<i64, CategoryRecord>,
}

impl CategorySnapshot {
    fn build(collection: Vec<CategoryRecord>) -> Self {
        let index = collection
            .iter()
            .map(|category| (category.id, category.clone()))
            .collect();
        Self { collection, index }
    }

    pub fn categories(&self) -> &[CategoryRecord] {
        &self.collection
    }

    pub fn get(&self, id: i64) -> Option<&CategoryRecord> {
        self.index.get(&id)
    }

    /// Name of category `id`, empty when unknown.
    pub fn name_of(&self, id: i64) -> &str {
        self.get(id).map_or("", |category| category.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}

#[derive(Default)]
struct ReloadState {
    last: Option<Arc<CategorySnapshot>>,
}

pub struct CategoryCollectionCache {
    repo: Arc<dyn CategoriesRepo>,
    snapshot: RwLock<Option<Arc<CategorySnapshot>>>,
    reload: Mutex<ReloadState>,
    generation: AtomicU64,
    completed_loads: AtomicU64,
}

impl CategoryCollectionCache {
    pub fn new(repo: Arc<dyn CategoriesRepo>) -> Self {
        Self {
            repo,
            snapshot: RwLock::new(None),
            reload: Mutex::new(ReloadState::default()),
            generation: AtomicU64::new(0),
            completed_loads: AtomicU64::new(0),
        }
    }

    /// One page of categories ordered by id; `page_size == 0` returns all of them.
    pub async fn list(&self, page: PageRequest) -> Result<Vec<CategoryRecord>, RepoError> {
        let snapshot = self.ensure_loaded().await?;
        Ok(page.slice(snapshot.categories()).to_vec())
    }

    /// Snapshot indexed by category id.
    pub async fn map(&self) -> Result<Arc<CategorySnapshot>, RepoError> {
        self.ensure_loaded().await
    }

    pub async fn sum(&self) -> Result<u64, RepoError> {
        let snapshot = self.ensure_loaded().await?;
        Ok(snapshot.len() as u64)
    }

    /// Drop the current snapshot; nothing is reloaded until the next read.
    pub fn invalidate(&self) {
        let mut guard = rw_write(&self.snapshot, SOURCE, "invalidate");
        self.generation.fetch_add(1, Ordering::AcqRel);
        *guard = None;
        debug!(target_module = SOURCE, "Category collection invalidated");
    }

    pub fn is_loaded(&self) -> bool {
        rw_read(&self.snapshot, SOURCE, "is_loaded").is_some()
    }

    fn current(&self) -> Option<Arc<CategorySnapshot>> {
        rw_read(&self.snapshot, SOURCE, "current").clone()
    }

    async fn ensure_loaded(&self) -> Result<Arc<CategorySnapshot>, RepoError> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let ticket = self.completed_loads.load(Ordering::Acquire);
        let mut state = self.reload.lock().await;

        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        // A load finished while this caller queued; share its result even if a
        // racing invalidation kept it from being installed.
        if self.completed_loads.load(Ordering::Acquire) != ticket
            && let Some(snapshot) = state.last.clone()
        {
            return Ok(snapshot);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let categories = self.repo.list_categories().await?;
        let snapshot = Arc::new(CategorySnapshot::build(categories));
        counter!(CATEGORY_RELOAD_TOTAL).increment(1);

        {
            let mut guard = rw_write(&self.snapshot, SOURCE, "install");
            if self.generation.load(Ordering::Acquire) == generation {
                *guard = Some(snapshot.clone());
            } else {
                debug!(
                    target_module = SOURCE,
                    "Category reload raced with invalidation; result not installed"
                );
            }
        }

        state.last = Some(snapshot.clone());
        self.completed_loads.fetch_add(1, Ordering::AcqRel);
        Ok(snapshot)
    }
}
