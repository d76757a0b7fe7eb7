//! Client code for critsheet.
//!
//! This crate provides the stylesheet pipeline shared by the server:
//! source resolution (local disk first, then HTTP), the grammar-free CSS
//! engine, and the per-pass delivery planner.

pub mod css;
pub mod fetch;
pub mod plan;
pub mod resolve;

pub use css::{CssRule, Partition, RuleKind, Scanner, optimize_stylesheet, render, split, transform};
pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use plan::{
    BundleHandle, DeliveryPlan, DeliveryPlanner, StylesheetReport, StylesheetStatus, custom_css_markup,
};
pub use resolve::{ResolvedSource, ResolverConfig, SourceFetcher, SourceOrigin, SourceResolver};
