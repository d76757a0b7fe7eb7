//! Delivery planning for one render pass.
//!
//! For each queued stylesheet, in queue order:
//!
//! 1. exclusion policy ([`skip_reason`])
//! 2. cache lookup by [`Fingerprint::for_transformed`], fresh under the
//!    pass's own `cache_ttl_seconds`
//! 3. on miss: resolve, scan, transform, rebase URLs, store
//! 4. critical split
//!
//! Stylesheets are processed concurrently (bounded by `max_concurrency`) and
//! reassembled in queue order. The deferred remainder of every stylesheet is
//! concatenated into one content-addressed bundle that is written to the
//! store only when absent.

pub mod exclusion;
pub mod markup;

use std::sync::Arc;
use std::time::Duration;

use critsheet_core::{AppConfig, CacheStore, Error, Fingerprint, OptimizationOptions, StyleReference};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

pub use exclusion::skip_reason;
pub use markup::{bundle_markup, critical_markup, custom_css_markup};

use crate::css::{CssRule, RuleKind, Scanner, optimize_stylesheet, render, split};
use crate::resolve::{ResolverConfig, SourceFetcher, SourceResolver};

/// How a stylesheet was handled in this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StylesheetStatus {
    /// Served from a fresh cache entry.
    Cached,
    /// Resolved and transformed in this pass.
    Optimized,
    /// Left to the host by exclusion policy.
    Skipped,
    /// Source could not be resolved; left to the host.
    Unavailable,
}

/// Per-stylesheet outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StylesheetReport {
    pub handle: String,
    pub status: StylesheetStatus,
    /// Rules inlined as critical CSS.
    pub critical_rules: usize,
    /// Rules deferred to the bundle.
    pub deferred_rules: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StylesheetReport {
    fn without_rules(handle: &str, status: StylesheetStatus, detail: String) -> Self {
        Self { handle: handle.to_string(), status, critical_rules: 0, deferred_rules: 0, detail: Some(detail) }
    }
}

/// Reference to the persisted deferred bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BundleHandle {
    pub fingerprint: Fingerprint,
    /// `<fingerprint>.css`
    pub file_name: String,
    /// `file_name` joined onto the cache URL, or the bare file name.
    pub href: String,
}

impl BundleHandle {
    fn new(fingerprint: Fingerprint, base: Option<&Url>) -> Self {
        let file_name = fingerprint.file_name();
        let href = base
            .and_then(|b| b.join(&file_name).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| file_name.clone());
        Self { fingerprint, file_name, href }
    }

    /// Preload + `<noscript>` link markup.
    pub fn markup(&self) -> String {
        bundle_markup(&self.href)
    }
}

/// Everything the host needs to emit for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeliveryPlan {
    /// Critical rules of every stylesheet, in queue order.
    pub critical_css: String,
    pub bundle: Option<BundleHandle>,
    pub stylesheets: Vec<StylesheetReport>,
}

impl DeliveryPlan {
    /// Handles the planner took over; the host dequeues exactly these.
    pub fn handled(&self) -> impl Iterator<Item = &str> {
        self.stylesheets
            .iter()
            .filter(|s| matches!(s.status, StylesheetStatus::Cached | StylesheetStatus::Optimized))
            .map(|s| s.handle.as_str())
    }

    pub fn critical_markup(&self) -> String {
        critical_markup(&self.critical_css)
    }

    /// Critical `<style>` followed by the bundle link, ready for `<head>`.
    pub fn head_markup(&self) -> String {
        let mut out = self.critical_markup();
        if let Some(bundle) = &self.bundle {
            out.push_str(&bundle.markup());
        }
        out
    }
}

/// Plans stylesheet delivery against a shared cache store.
#[derive(Clone)]
pub struct DeliveryPlanner {
    resolver: Arc<SourceResolver>,
    store: Arc<dyn CacheStore>,
    bundle_base_url: Option<Url>,
    max_concurrency: usize,
}

impl DeliveryPlanner {
    pub fn new(resolver: Arc<SourceResolver>, store: Arc<dyn CacheStore>) -> Self {
        Self { resolver, store, bundle_base_url: None, max_concurrency: 4 }
    }

    /// Planner wired from application configuration.
    pub fn from_app(
        config: &AppConfig, store: Arc<dyn CacheStore>, fetcher: Arc<dyn SourceFetcher>,
    ) -> Result<Self, Error> {
        let resolver = SourceResolver::new(ResolverConfig::from_app(config)?, fetcher);
        let bundle_base_url = config.cache_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self::new(Arc::new(resolver), store)
            .with_bundle_base_url(bundle_base_url)
            .with_max_concurrency(config.max_concurrency))
    }

    pub fn with_bundle_base_url(mut self, base: Option<Url>) -> Self {
        self.bundle_base_url = base;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Plan one pass. Never fails: unresolvable stylesheets are reported and
    /// left to the host, cache faults degrade to uncached output.
    pub async fn plan(&self, queue: &[StyleReference], options: &OptimizationOptions) -> DeliveryPlan {
        if !options.enabled {
            tracing::debug!("optimization disabled; returning empty plan");
            return DeliveryPlan::default();
        }

        let options = Arc::new(options.clone());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();

        for (index, style) in queue.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let resolver = self.resolver.clone();
            let store = self.store.clone();
            let options = options.clone();

            join_set.spawn(async move {
                // Hold permit for task duration to enforce concurrency limit
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = process_stylesheet(&resolver, store.as_ref(), &style, &options).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<SheetOutcome>> = vec![None; queue.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => tracing::error!(error = %e, "stylesheet task failed"),
            }
        }

        let mut critical_parts = Vec::new();
        let mut deferred_parts = Vec::new();
        let mut stylesheets = Vec::with_capacity(queue.len());

        for (style, outcome) in queue.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| SheetOutcome::report_only(StylesheetReport::without_rules(
                &style.handle,
                StylesheetStatus::Unavailable,
                "processing task aborted".to_string(),
            )));

            if !outcome.critical.is_empty() {
                critical_parts.push(outcome.critical);
            }
            if !outcome.deferred.is_empty() {
                deferred_parts.push(outcome.deferred);
            }
            stylesheets.push(outcome.report);
        }

        let mut critical_css = critical_parts.join("\n");
        let bundle_css = deferred_parts.join("\n");

        let bundle = if bundle_css.is_empty() {
            None
        } else {
            match self.persist_bundle(&bundle_css, options.cache_ttl()).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "bundle not persisted; serving deferred CSS inline");
                    if !critical_css.is_empty() {
                        critical_css.push('\n');
                    }
                    critical_css.push_str(&bundle_css);
                    None
                }
            }
        };

        tracing::info!(
            stylesheets = stylesheets.len(),
            critical_bytes = critical_css.len(),
            bundle = bundle.as_ref().map(|b| b.file_name.as_str()),
            "planned stylesheet delivery"
        );

        DeliveryPlan { critical_css, bundle, stylesheets }
    }

    /// Write the bundle under its content fingerprint unless a fresh copy exists.
    async fn persist_bundle(&self, css: &str, ttl: Duration) -> Result<BundleHandle, Error> {
        let fingerprint = Fingerprint::for_content(css.as_bytes());
        let present = match self.store.get_fresh(&fingerprint, ttl).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(%fingerprint, error = %e, "bundle lookup failed; rewriting");
                false
            }
        };
        if !present {
            self.store.set(&fingerprint, css.as_bytes()).await?;
            tracing::debug!(%fingerprint, bytes = css.len(), "wrote bundle");
        }
        Ok(BundleHandle::new(fingerprint, self.bundle_base_url.as_ref()))
    }
}

#[derive(Debug, Clone)]
struct SheetOutcome {
    report: StylesheetReport,
    critical: String,
    deferred: String,
}

impl SheetOutcome {
    fn report_only(report: StylesheetReport) -> Self {
        Self { report, critical: String::new(), deferred: String::new() }
    }
}

async fn process_stylesheet(
    resolver: &SourceResolver, store: &dyn CacheStore, style: &StyleReference, options: &OptimizationOptions,
) -> SheetOutcome {
    if let Some(reason) = skip_reason(style, options) {
        tracing::debug!(handle = %style.handle, %reason, "skipping stylesheet");
        return SheetOutcome::report_only(StylesheetReport::without_rules(
            &style.handle,
            StylesheetStatus::Skipped,
            reason,
        ));
    }

    let key = Fingerprint::for_transformed(style, options);
    let (rules, status) = match cached_rules(store, &key, &style.handle, options.cache_ttl()).await {
        Some(rules) => (rules, StylesheetStatus::Cached),
        None => match resolver.resolve(style).await {
            Ok(source) => {
                let rules = optimize_stylesheet(&source.text, &source.url, options);
                if let [only] = rules.as_slice()
                    && only.kind == RuleKind::Verbatim
                {
                    tracing::warn!(handle = %style.handle, "no rule boundaries found; passing content through");
                }
                if let Err(e) = store.set(&key, render(&rules).as_bytes()).await {
                    tracing::warn!(handle = %style.handle, error = %e, "cache write failed; serving uncached");
                }
                (rules, StylesheetStatus::Optimized)
            }
            Err(e) => {
                tracing::warn!(handle = %style.handle, error = %e, "stylesheet unavailable");
                return SheetOutcome::report_only(StylesheetReport::without_rules(
                    &style.handle,
                    StylesheetStatus::Unavailable,
                    e.to_string(),
                ));
            }
        },
    };

    let partition = split(rules.clone(), &options.critical_selectors);
    let critical = render(&partition.critical);
    let deferred = if options.replay_critical_in_bundle { render(&rules) } else { render(&partition.non_critical) };
    let deferred_rules =
        if options.replay_critical_in_bundle { rules.len() } else { partition.non_critical.len() };

    SheetOutcome {
        report: StylesheetReport {
            handle: style.handle.clone(),
            status,
            critical_rules: partition.critical.len(),
            deferred_rules,
            detail: None,
        },
        critical,
        deferred,
    }
}

/// Cached transformed text, re-scanned into rules. Read faults count as a miss.
async fn cached_rules(
    store: &dyn CacheStore, key: &Fingerprint, handle: &str, ttl: Duration,
) -> Option<Vec<CssRule>> {
    let entry = match store.get_fresh(key, ttl).await {
        Ok(entry) => entry?,
        Err(e) => {
            tracing::warn!(%handle, error = %e, "cache read failed; treating as miss");
            return None;
        }
    };
    match entry.into_text() {
        Ok(text) => Some(Scanner::keep_all().scan(&text)),
        Err(e) => {
            tracing::warn!(%handle, error = %e, "cached entry unreadable; treating as miss");
            None
        }
    }
}
