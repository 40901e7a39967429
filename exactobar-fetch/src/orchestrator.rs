//! Fan-out of per-provider pipelines under a shared concurrency ceiling.
//!
//! `fetch_all` runs one [`FetchPipeline`] per provider concurrently,
//! gated by a single `Semaphore` so a caller with twenty configured
//! providers doesn't open twenty simultaneous CLI subprocesses or HTTP
//! connections. Every provider's full outcome is returned regardless
//! of completion order.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::context::FetchContext;
use crate::pipeline::{FetchOutcome, FetchPipeline, PipelineConfig};
use crate::strategy::FetchStrategy;

/// Tuning knobs for [`fetch_all`].
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of provider pipelines running at once. Values
    /// `<= 0` are treated as the default of 5.
    pub max_concurrent: i32,
    /// The pipeline configuration every spawned provider pipeline is
    /// built with (timeout, stale threshold, cache). One config is
    /// shared across all providers in a single `fetch_all` call.
    pub pipeline: PipelineConfig,
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("max_concurrent", &self.max_concurrent)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Returns the effective concurrency ceiling, substituting the
    /// default when `max_concurrent` is non-positive.
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrent <= 0 {
            5
        } else {
            self.max_concurrent as usize
        }
    }
}

/// Runs every provider's pipeline concurrently, gated by a semaphore
/// of size `config.effective_concurrency()`, and returns every
/// outcome keyed by provider id.
///
/// `ctx` is shared (via its internal `Arc`/reference-counted fields,
/// including the single cancellation token) into every spawned task,
/// so cancelling `ctx.cancellation` aborts every in-flight pipeline's
/// current race, not just one provider's.
///
/// `on_complete` is invoked once per provider as soon as its pipeline
/// finishes, in whatever order pipelines happen to complete; callers
/// that need ordering or mutation safety are responsible for providing
/// it themselves (e.g. by closing over a `Mutex`).
#[instrument(skip(ctx, providers, on_complete), fields(providers = providers.len()))]
pub async fn fetch_all(
    ctx: &FetchContext,
    providers: HashMap<String, Vec<Box<dyn FetchStrategy>>>,
    use_cache: bool,
    config: &OrchestratorConfig,
    on_complete: Option<Arc<dyn Fn(&FetchOutcome) + Send + Sync>>,
) -> HashMap<String, FetchOutcome> {
    let semaphore = Arc::new(Semaphore::new(config.effective_concurrency()));
    let pipeline_config = config.pipeline.clone();

    let mut tasks = Vec::with_capacity(providers.len());

    for (provider_id, strategies) in providers {
        let sem = semaphore.clone();
        let child_ctx = ctx.child();
        let pipeline_config = pipeline_config.clone();
        let on_complete = on_complete.clone();

        let handle = tokio::spawn(async move {
            let _permit = match sem.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    // Semaphore only closes if dropped; never happens here.
                    warn!(provider = %provider_id, "semaphore closed unexpectedly");
                    return (
                        provider_id.clone(),
                        FetchOutcome {
                            provider_id,
                            success: false,
                            snapshot: None,
                            source: None,
                            error: Some("Internal scheduling error".to_string()),
                            attempts: Vec::new(),
                            cached: false,
                        },
                    );
                }
            };

            let pipeline = FetchPipeline::new(provider_id.clone(), strategies, pipeline_config);
            let outcome = pipeline.execute(&child_ctx, use_cache).await;

            if let Some(cb) = &on_complete {
                cb(&outcome);
            }

            (provider_id, outcome)
        });

        tasks.push(handle);
    }

    let mut results = HashMap::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok((provider_id, outcome)) => {
                results.insert(provider_id, outcome);
            }
            Err(join_err) => {
                warn!(error = %join_err, "provider pipeline task panicked or was cancelled");
            }
        }
    }

    results
}

/// Convenience wrapper over [`fetch_all`] that filters `providers`
/// down to those for which `is_enabled` returns true before fanning
/// out, so callers don't need to pre-filter their own provider map.
pub async fn fetch_enabled(
    ctx: &FetchContext,
    providers: HashMap<String, Vec<Box<dyn FetchStrategy>>>,
    is_enabled: impl Fn(&str) -> bool,
    use_cache: bool,
    config: &OrchestratorConfig,
    on_complete: Option<Arc<dyn Fn(&FetchOutcome) + Send + Sync>>,
) -> HashMap<String, FetchOutcome> {
    let filtered: HashMap<String, Vec<Box<dyn FetchStrategy>>> = providers
        .into_iter()
        .filter(|(id, _)| is_enabled(id))
        .collect();

    fetch_all(ctx, filtered, use_cache, config, on_complete).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::strategy::{FetchKind, FetchOutcomeTag, FetchSuccess};
    use async_trait::async_trait;
    use exactobar_core::UsageSnapshot;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TrackingStrategy {
        id: String,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl FetchStrategy for TrackingStrategy {
        fn id(&self) -> &str {
            &self.id
        }

        fn kind(&self) -> FetchKind {
            FetchKind::CLI
        }

        async fn is_available(&self, _ctx: &FetchContext) -> bool {
            true
        }

        async fn fetch(&self, _ctx: &FetchContext) -> FetchOutcomeTag {
            let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                FetchOutcomeTag::Fatal(FetchError::AuthenticationFailed("token revoked".to_string()))
            } else {
                FetchOutcomeTag::Ok(FetchSuccess::new(
                    UsageSnapshot::new(&self.id, "mock"),
                    format!("{}.mock", self.id),
                    FetchKind::CLI,
                ))
            }
        }
    }

    fn providers_map(n: usize, active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> HashMap<String, Vec<Box<dyn FetchStrategy>>> {
        (0..n)
            .map(|i| {
                let id = format!("provider-{i}");
                let strategy: Box<dyn FetchStrategy> = Box::new(TrackingStrategy {
                    id: id.clone(),
                    active: active.clone(),
                    peak: peak.clone(),
                    delay: Duration::from_millis(30),
                    fail: false,
                });
                (id, vec![strategy])
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_all_returns_every_provider() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let providers = providers_map(8, active, peak);

        let ctx = FetchContext::new();
        let config = OrchestratorConfig { max_concurrent: 5, ..Default::default() };
        let results = fetch_all(&ctx, providers, false, &config, None).await;

        assert_eq!(results.len(), 8);
        for i in 0..8 {
            let key = format!("provider-{i}");
            assert!(results[&key].success, "provider {key} should have succeeded");
        }
    }

    #[tokio::test]
    async fn test_fetch_all_respects_concurrency_ceiling() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let providers = providers_map(10, active, peak.clone());

        let ctx = FetchContext::new();
        let config = OrchestratorConfig { max_concurrent: 3, ..Default::default() };
        let _results = fetch_all(&ctx, providers, false, &config, None).await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_fetch_all_default_concurrency_for_non_positive() {
        let config = OrchestratorConfig { max_concurrent: 0, ..Default::default() };
        assert_eq!(config.effective_concurrency(), 5);

        let config = OrchestratorConfig { max_concurrent: -1, ..Default::default() };
        assert_eq!(config.effective_concurrency(), 5);
    }

    #[tokio::test]
    async fn test_on_complete_fires_per_provider() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let providers = providers_map(4, active, peak);

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let on_complete: Arc<dyn Fn(&FetchOutcome) + Send + Sync> =
            Arc::new(move |_outcome| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            });

        let ctx = FetchContext::new();
        let config = OrchestratorConfig::default();
        let _results = fetch_all(&ctx, providers, false, &config, Some(on_complete)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fetch_enabled_filters_before_fanning_out() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let providers = providers_map(3, active, peak);

        let ctx = FetchContext::new();
        let config = OrchestratorConfig::default();
        let results = fetch_enabled(
            &ctx,
            providers,
            |id| id == "provider-0",
            false,
            &config,
            None,
        )
        .await;

        assert_eq!(results.len(), 1);
        assert!(results.contains_key("provider-0"));
    }
}
