//! Caching and session-revocation core of a blog back-end.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod session;
