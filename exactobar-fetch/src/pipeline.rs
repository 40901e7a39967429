//! Fetch pipeline for executing a provider's strategies in priority order.
//!
//! The pipeline races each strategy against a per-strategy timeout and
//! the context's shared cancellation token, falls back to the next
//! strategy on soft failure, and finally falls back to a cached
//! snapshot if one is recent enough (or if every strategy that was
//! configured still failed, regardless of age).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::cache::SnapshotCache;
use crate::context::FetchContext;
use crate::strategy::{FetchKind, FetchOutcomeTag, FetchStrategy};
use exactobar_core::UsageSnapshot;

// ============================================================================
// Fetch Attempt
// ============================================================================

/// Record of a single fetch attempt.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// The strategy ID that was attempted.
    pub strategy_id: String,
    /// The kind of fetch used.
    pub kind: FetchKind,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error message if the attempt failed.
    pub error: Option<String>,
    /// How long the attempt took.
    pub duration: Duration,
}

impl FetchAttempt {
    /// Creates a successful attempt record.
    pub fn success(strategy_id: impl Into<String>, kind: FetchKind, duration: Duration) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            kind,
            success: true,
            error: None,
            duration,
        }
    }

    /// Creates a failed attempt record.
    pub fn failure(
        strategy_id: impl Into<String>,
        kind: FetchKind,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            kind,
            success: false,
            error: Some(error.into()),
            duration,
        }
    }
}

// ============================================================================
// Fetch Outcome
// ============================================================================

/// The outcome of running a provider's pipeline to completion.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The provider id this outcome is for.
    pub provider_id: String,
    /// Whether a usable snapshot was obtained, from a strategy or cache.
    pub success: bool,
    /// The snapshot, if `success`.
    pub snapshot: Option<UsageSnapshot>,
    /// Where the snapshot came from: a strategy id, or `"cache"`.
    pub source: Option<String>,
    /// The final error, if `!success`.
    pub error: Option<String>,
    /// Every attempt made, in order.
    pub attempts: Vec<FetchAttempt>,
    /// Whether the snapshot was served from cache rather than fetched live.
    pub cached: bool,
}

impl FetchOutcome {
    /// Returns the number of strategies that were attempted.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// Returns all attempt error messages, in order.
    pub fn errors(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_deref())
            .collect()
    }
}

// ============================================================================
// Pipeline Config
// ============================================================================

/// Configuration shared by every run of a [`FetchPipeline`].
#[derive(Clone)]
pub struct PipelineConfig {
    /// Per-strategy timeout.
    pub timeout: Duration,
    /// Maximum cached-snapshot age to serve when no strategy was
    /// attempted at all (i.e. nothing was configured).
    pub stale_threshold: Duration,
    /// The snapshot cache to fall back to, if any.
    pub cache: Option<Arc<dyn SnapshotCache>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("timeout", &self.timeout)
            .field("stale_threshold", &self.stale_threshold)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(15 * 60),
            cache: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a config with a cache attached.
    pub fn with_cache(mut self, cache: Arc<dyn SnapshotCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the per-strategy timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the staleness threshold for no-attempt cache fallback.
    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }
}

/// Sentinel error string recorded for a strategy that reported itself
/// unavailable. `any_attempted` below treats this string, and only
/// this string, as "not really an attempt".
const NOT_CONFIGURED: &str = "not configured";

// ============================================================================
// Fetch Pipeline
// ============================================================================

/// A pipeline of fetch strategies for one provider, tried in priority
/// order, with cache fallback.
pub struct FetchPipeline {
    provider_id: String,
    strategies: Vec<Box<dyn FetchStrategy>>,
    config: PipelineConfig,
}

impl FetchPipeline {
    /// Creates a pipeline for `provider_id` with the given strategies,
    /// sorted by descending priority.
    pub fn new(
        provider_id: impl Into<String>,
        mut strategies: Vec<Box<dyn FetchStrategy>>,
        config: PipelineConfig,
    ) -> Self {
        strategies.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self {
            provider_id: provider_id.into(),
            strategies,
            config,
        }
    }

    /// Returns the number of strategies in the pipeline.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if the pipeline has no strategies at all.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Returns information about all strategies.
    pub async fn strategy_info(&self, ctx: &FetchContext) -> Vec<crate::strategy::StrategyInfo> {
        let mut info = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            info.push(crate::strategy::StrategyInfo::from_strategy(strategy.as_ref(), ctx).await);
        }
        info
    }

    /// Executes the pipeline: races each strategy against the timeout
    /// and the context's cancellation token, falls back through
    /// strategies on soft failure, and finally consults the cache.
    #[instrument(skip(self, ctx), fields(provider = %self.provider_id, strategies = self.strategies.len()))]
    pub async fn execute(&self, ctx: &FetchContext, use_cache: bool) -> FetchOutcome {
        let mut attempts = Vec::new();

        info!(provider = %self.provider_id, count = self.strategies.len(), "running fetch pipeline");

        for strategy in &self.strategies {
            let strategy_id = strategy.id().to_string();
            let kind = strategy.kind();

            if !strategy.is_available(ctx).await {
                debug!(strategy = %strategy_id, "strategy not available, skipping");
                attempts.push(FetchAttempt::failure(
                    &strategy_id,
                    kind,
                    NOT_CONFIGURED,
                    Duration::ZERO,
                ));
                continue;
            }

            let start = std::time::Instant::now();
            let outcome = tokio::select! {
                biased;
                () = ctx.cancellation.cancelled() => {
                    debug!(strategy = %strategy_id, "context cancelled, aborting pipeline");
                    return FetchOutcome {
                        provider_id: self.provider_id.clone(),
                        success: false,
                        snapshot: None,
                        source: None,
                        error: Some("Context cancelled".to_string()),
                        attempts,
                        cached: false,
                    };
                }
                tag = strategy.fetch(ctx) => Some(tag),
                () = tokio::time::sleep(self.config.timeout) => None,
            };

            let Some(tag) = outcome else {
                let duration = start.elapsed();
                warn!(strategy = %strategy_id, ?duration, "strategy timed out");
                attempts.push(FetchAttempt::failure(
                    &strategy_id,
                    kind,
                    "Fetch timed out",
                    duration,
                ));
                // The in-flight future is dropped here, not joined: it
                // may still complete and write the cache in the
                // background, but this pipeline run does not wait for it.
                continue;
            };

            let duration = start.elapsed();
            match tag {
                FetchOutcomeTag::Ok(success) => {
                    info!(strategy = %strategy_id, ?duration, "strategy succeeded");
                    attempts.push(FetchAttempt::success(&strategy_id, kind, duration));

                    if let Some(cache) = &self.config.cache {
                        if let Err(e) = cache.save(&success.snapshot).await {
                            warn!(provider = %self.provider_id, error = %e, "failed to save snapshot to cache");
                        }
                    }

                    return FetchOutcome {
                        provider_id: self.provider_id.clone(),
                        success: true,
                        snapshot: Some(success.snapshot),
                        source: Some(success.strategy_id),
                        error: None,
                        attempts,
                        cached: false,
                    };
                }
                FetchOutcomeTag::SoftFail(e) => {
                    warn!(strategy = %strategy_id, error = %e, ?duration, "strategy soft-failed, trying next");
                    attempts.push(FetchAttempt::failure(&strategy_id, kind, e.to_string(), duration));
                }
                FetchOutcomeTag::Fatal(e) => {
                    warn!(strategy = %strategy_id, error = %e, ?duration, "strategy fatal-failed, aborting pipeline");
                    attempts.push(FetchAttempt::failure(&strategy_id, kind, e.to_string(), duration));
                    return FetchOutcome {
                        provider_id: self.provider_id.clone(),
                        success: false,
                        snapshot: None,
                        source: None,
                        error: Some(e.to_string()),
                        attempts,
                        cached: false,
                    };
                }
            }
        }

        self.fallback_to_cache(use_cache, attempts).await
    }

    async fn fallback_to_cache(&self, use_cache: bool, attempts: Vec<FetchAttempt>) -> FetchOutcome {
        let any_attempted = attempts
            .iter()
            .any(|a| a.error.as_deref() != Some(NOT_CONFIGURED));

        if use_cache {
            if let Some(cache) = &self.config.cache {
                if let Some(snapshot) = cache.load(&self.provider_id).await {
                    let fresh_enough = any_attempted || {
                        let age = Utc::now().signed_duration_since(snapshot.fetched_at);
                        age.to_std().unwrap_or(Duration::MAX) < self.config.stale_threshold
                    };

                    if fresh_enough {
                        info!(provider = %self.provider_id, "serving stale/fallback snapshot from cache");
                        return FetchOutcome {
                            provider_id: self.provider_id.clone(),
                            success: true,
                            snapshot: Some(snapshot),
                            source: Some("cache".to_string()),
                            error: None,
                            attempts,
                            cached: true,
                        };
                    }
                }
            }
        }

        let error = if any_attempted {
            attempts
                .iter()
                .rev()
                .find_map(|a| a.error.as_deref().filter(|e| *e != NOT_CONFIGURED))
                .map(ToString::to_string)
                .unwrap_or_else(|| "No strategies available".to_string())
        } else {
            "No strategies available".to_string()
        };

        warn!(provider = %self.provider_id, %error, "pipeline failed");
        FetchOutcome {
            provider_id: self.provider_id.clone(),
            success: false,
            snapshot: None,
            source: None,
            error: Some(error),
            attempts,
            cached: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
