//! Core types and shared functionality for critsheet.
//!
//! This crate provides:
//! - Content-addressed stylesheet cache with file, memory and SQLite backends
//! - Unified error types
//! - Configuration structures and per-pass optimization options
//! - The stylesheet reference data model

pub mod cache;
pub mod config;
pub mod error;
pub mod style;

pub use cache::{CacheEntry, CacheStore, FileStore, Fingerprint, MemoryStore, SqliteStore};
pub use config::{AppConfig, CacheBackend, ConfigError, OptimizationOptions};
pub use error::Error;
pub use style::StyleReference;
