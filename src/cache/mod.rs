//! Caching layer: key-value backends, read-through entity caches and the
//! in-memory category collection.

pub mod articles;
pub mod backend;
pub mod categories;
pub mod codes;
pub mod keys;
mod lock;
pub mod memory;
pub mod read_through;
pub mod users;

pub use articles::CachedArticles;
pub use backend::{CacheError, KeyValueCache};
pub use categories::{CategoryCollectionCache, CategorySnapshot};
pub use codes::VerificationCodes;
pub use keys::CacheNamespace;
pub use memory::MemoryCache;
pub use read_through::ReadThrough;
pub use users::{CachedUsers, Invalidation};
