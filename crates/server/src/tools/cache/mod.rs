//! Cache-related MCP tools.
//!
//! This module provides tools for reading and maintaining the stylesheet cache.

pub mod get;
pub mod sweep;

pub use get::{CacheGetParams, get_impl};
pub use sweep::{CacheSweepParams, sweep_impl};
