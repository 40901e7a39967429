//! The routing service: resolves a model or role query against the
//! configured providers, fetches fresh usage data, and ranks the
//! result.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use exactobar_core::{rank, rank_by_role, ModelEntry, Recommendation, RoleRecommendation, UsageSnapshot};
use exactobar_fetch::{fetch_all, FetchContext, FetchOutcome, FetchStrategy, OrchestratorConfig, PipelineConfig, SnapshotCache};

use crate::error::RoutingError;
use crate::model::{ModelInfo, RoleConfig};

/// How many alternatives to suggest when a model query fails to
/// resolve.
const MAX_SUGGESTIONS: usize = 5;

/// A bundle of injected dependencies plus the fetch/cache
/// configuration needed to resolve model and role queries.
///
/// Every lookup is a function value rather than a trait object behind
/// a global registry: the service itself holds no mutable state and
/// can be constructed fresh (or with test doubles) per call site.
pub struct RoutingService {
    /// Resolves an exact or near-exact model query.
    pub lookup_model: Box<dyn Fn(&str) -> Option<ModelInfo> + Send + Sync>,
    /// Returns models matching a fuzzy query, for suggestion lists.
    pub search_models: Box<dyn Fn(&str) -> Vec<ModelInfo> + Send + Sync>,
    /// Filters a provider id list down to those actually configured
    /// (at least one available strategy).
    pub configured_providers: Box<dyn Fn(&[String]) -> Vec<String> + Send + Sync>,
    /// Builds the fetch strategy list for one provider id.
    pub provider_strategies: Box<dyn Fn(&str) -> Vec<Box<dyn FetchStrategy>> + Send + Sync>,
    /// Resolves a cost multiplier for `(model_name, provider_id)`.
    pub lookup_multiplier: Box<dyn Fn(&str, &str) -> Option<f64> + Send + Sync>,
    /// Looks up a role by name.
    pub get_role: Box<dyn Fn(&str) -> Option<RoleConfig> + Send + Sync>,
    /// Every configured role name.
    pub role_names: Box<dyn Fn() -> Vec<String> + Send + Sync>,
    /// Prefix-matches a model id against the known catalog.
    pub match_prefix: Box<dyn Fn(&str) -> Vec<ModelInfo> + Send + Sync>,
    /// Shared snapshot cache passed through to every pipeline.
    pub cache: Arc<dyn SnapshotCache>,
    /// Concurrency ceiling and pipeline config for fan-out fetches.
    pub orchestrator_config: OrchestratorConfig,
    /// Per-pipeline timeout/staleness config (cache is wired in
    /// separately via `orchestrator_config.pipeline`).
    pub pipeline_config: PipelineConfig,
    /// Whether the pipeline's cache-fallback rules may engage.
    pub use_cache: bool,
}

impl RoutingService {
    fn successful_snapshots(
        outcomes: &HashMap<String, FetchOutcome>,
    ) -> HashMap<String, (UsageSnapshot, bool)> {
        outcomes
            .iter()
            .filter_map(|(pid, outcome)| {
                if outcome.success {
                    outcome
                        .snapshot
                        .clone()
                        .map(|snapshot| (pid.clone(), (snapshot, outcome.cached)))
                } else {
                    None
                }
            })
            .collect()
    }

    fn strategy_map(&self, provider_ids: &[String]) -> HashMap<String, Vec<Box<dyn FetchStrategy>>> {
        provider_ids
            .iter()
            .map(|pid| (pid.clone(), (self.provider_strategies)(pid)))
            .collect()
    }

    async fn fetch_providers(
        &self,
        ctx: &FetchContext,
        provider_ids: &[String],
    ) -> HashMap<String, (UsageSnapshot, bool)> {
        let strategies = self.strategy_map(provider_ids);
        let outcomes = fetch_all(
            ctx,
            strategies,
            self.use_cache,
            &self.orchestrator_config,
            None,
        )
        .await;
        Self::successful_snapshots(&outcomes)
    }

    /// Resolves a single model query to a ranked [`Recommendation`].
    ///
    /// 1. Resolve `query` via `lookup_model`; on failure, consult
    ///    `search_models` for a short suggestion list.
    /// 2. Filter the model's providers to the configured subset.
    /// 3. Fetch every configured provider concurrently.
    /// 4. Resolve each provider's cost multiplier.
    /// 5. Rank and return.
    #[instrument(skip(self, ctx))]
    pub async fn route_model(&self, ctx: &FetchContext, query: &str) -> Result<Recommendation, RoutingError> {
        let model = (self.lookup_model)(query).ok_or_else(|| {
            let suggestions: Vec<String> = (self.search_models)(query)
                .into_iter()
                .take(MAX_SUGGESTIONS)
                .map(|m| m.id)
                .collect();
            RoutingError::UnknownModel {
                query: query.to_string(),
                suggestions,
            }
        })?;

        let configured = (self.configured_providers)(&model.providers);
        if configured.is_empty() {
            return Err(RoutingError::NoConfiguredProvider {
                model_name: model.name.clone(),
                offering_providers: model.providers.clone(),
            });
        }

        debug!(model = %model.name, providers = configured.len(), "routing single model");

        let snapshots = self.fetch_providers(ctx, &configured).await;

        let model_name = model.name.clone();
        let recommendation = rank(&configured, &snapshots, &model_name, |pid| {
            (self.lookup_multiplier)(&model_name, pid)
        });

        Ok(recommendation)
    }

    /// Resolves a named role to a ranked [`RoleRecommendation`].
    ///
    /// 1. Resolve `role` via `get_role`; on failure, list every known
    ///    role name sorted ascending.
    /// 2. For each listed model id, prefix-match (falling back to an
    ///    exact lookup), filter each match's providers to configured,
    ///    and drop matches left with no configured provider. Fail if
    ///    every match is dropped.
    /// 3. Collect the provider union, fetch once, and rank with
    ///    `rank_by_role` (which de-duplicates a provider to the first
    ///    model entry it appears under).
    #[instrument(skip(self, ctx))]
    pub async fn route_by_role(&self, ctx: &FetchContext, role: &str) -> Result<RoleRecommendation, RoutingError> {
        let role_config = (self.get_role)(role).ok_or_else(|| {
            let mut available = (self.role_names)();
            available.sort();
            RoutingError::UnknownRole {
                role: role.to_string(),
                available_roles: available,
            }
        })?;

        let mut entries = Vec::new();
        for model_id in &role_config.models {
            let mut matches = (self.match_prefix)(model_id);
            if matches.is_empty() {
                if let Some(m) = (self.lookup_model)(model_id) {
                    matches.push(m);
                }
            }

            for m in matches {
                let configured = (self.configured_providers)(&m.providers);
                if configured.is_empty() {
                    continue;
                }
                entries.push(ModelEntry {
                    model_id: m.id,
                    model_name: m.name,
                    provider_ids: configured,
                });
            }
        }

        if entries.is_empty() {
            return Err(RoutingError::NoConfiguredProviderForRole {
                role: role_config.name.clone(),
            });
        }

        let mut provider_union: Vec<String> = entries
            .iter()
            .flat_map(|e| e.provider_ids.iter().cloned())
            .collect();
        provider_union.sort();
        provider_union.dedup();

        debug!(role = %role_config.name, models = entries.len(), providers = provider_union.len(), "routing role");

        let snapshots = self.fetch_providers(ctx, &provider_union).await;

        let recommendation = rank_by_role(&role_config.name, &entries, &snapshots, |model_name, pid| {
            (self.lookup_multiplier)(model_name, pid)
        });

        Ok(recommendation)
    }
}
