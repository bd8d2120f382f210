//! Application services: use cases built on the repositories and caches.

pub mod admins;
pub mod articles;
pub mod categories;
pub mod context;
pub mod email;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod users;
