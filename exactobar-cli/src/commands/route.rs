//! Route and role commands - recommend the provider with the most
//! headroom for a model or a configured role.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use exactobar_fetch::{FetchContext, FetchStrategy, FileCache, OrchestratorConfig, PipelineConfig};
use exactobar_providers::{catalog, ProviderRegistry};
use exactobar_routing::{RoleConfig as RoutingRoleConfig, RoutingService};
use exactobar_store::RoutingConfig;
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the route command.
#[derive(Args)]
pub struct RouteArgs {
    /// Model id or name to route, e.g. "gpt-5" or "claude-sonnet-4-5".
    pub model: String,
}

/// Arguments for the role command.
#[derive(Args)]
pub struct RoleArgs {
    /// Configured role name to route, e.g. "coder".
    pub role: String,
}

/// Runs the route command.
pub async fn run_route(args: &RouteArgs, cli: &Cli) -> Result<()> {
    let (service, ctx) = build_service().await?;

    info!(model = %args.model, "routing model query");

    match service.route_model(&ctx, &args.model).await {
        Ok(recommendation) => {
            match cli.format {
                OutputFormat::Text => {
                    let formatter = TextFormatter::new(!cli.no_color);
                    println!("{}", formatter.format_route(&recommendation));
                }
                OutputFormat::Json => {
                    let formatter = JsonFormatter::new(cli.pretty);
                    println!("{}", formatter.format_route(&recommendation)?);
                }
            }

            if recommendation.best.is_none() {
                std::process::exit(ExitCode::ProviderMissing as i32);
            }
            Ok(())
        }
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}

/// Runs the role command.
pub async fn run_role(args: &RoleArgs, cli: &Cli) -> Result<()> {
    let (service, ctx) = build_service().await?;

    info!(role = %args.role, "routing role query");

    match service.route_by_role(&ctx, &args.role).await {
        Ok(recommendation) => {
            match cli.format {
                OutputFormat::Text => {
                    let formatter = TextFormatter::new(!cli.no_color);
                    println!("{}", formatter.format_role(&recommendation));
                }
                OutputFormat::Json => {
                    let formatter = JsonFormatter::new(cli.pretty);
                    println!("{}", formatter.format_role(&recommendation)?);
                }
            }

            if recommendation.best.is_none() {
                std::process::exit(ExitCode::ProviderMissing as i32);
            }
            Ok(())
        }
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}

/// Builds a [`RoutingService`] wired to the provider registry, the
/// model catalog, and the resolved [`RoutingConfig`].
async fn build_service() -> Result<(RoutingService, FetchContext)> {
    let config = RoutingConfig::resolve()?;

    let roles: HashMap<String, RoutingRoleConfig> = config
        .roles
        .iter()
        .map(|(name, role)| (name.clone(), RoutingRoleConfig::new(name.clone(), role.models.clone())))
        .collect();

    let multipliers = config.multipliers.clone();

    let cache_dir = exactobar_store::default_cache_dir().join("routing");
    let cache = FileCache::new(cache_dir).await?;

    let pipeline_config = PipelineConfig {
        timeout: std::time::Duration::from_secs(config.fetch_timeout_secs),
        stale_threshold: std::time::Duration::from_secs(
            (config.stale_threshold_minutes.max(0) as u64) * 60,
        ),
        cache: Some(Arc::new(cache) as Arc<dyn exactobar_fetch::SnapshotCache>),
    };

    let orchestrator_config = OrchestratorConfig {
        max_concurrent: config.max_concurrent,
        pipeline: pipeline_config.clone(),
    };

    let service = RoutingService {
        lookup_model: Box::new(|query| catalog::lookup(query)),
        search_models: Box::new(|query| catalog::search(query)),
        configured_providers: Box::new(|provider_ids| {
            let ctx = FetchContext::builder().build();
            provider_ids
                .iter()
                .filter(|pid| {
                    ProviderRegistry::get_by_cli_name(pid).is_some_and(|desc| {
                        let strategies = desc.build_strategies(&ctx);
                        futures::executor::block_on(async {
                            for strategy in &strategies {
                                if strategy.is_available(&ctx).await {
                                    return true;
                                }
                            }
                            false
                        })
                    })
                })
                .cloned()
                .collect()
        }),
        provider_strategies: Box::new(|provider_id| {
            let ctx = FetchContext::builder().build();
            ProviderRegistry::get_by_cli_name(provider_id)
                .map(|desc| desc.build_strategies(&ctx))
                .unwrap_or_default()
        }),
        lookup_multiplier: Box::new(move |model_name, provider_id| {
            multipliers
                .get(model_name)
                .and_then(|m| m.get(provider_id))
                .copied()
        }),
        get_role: Box::new(move |name| roles.get(name).cloned()),
        role_names: {
            let names: Vec<String> = config.roles.keys().cloned().collect();
            Box::new(move || names.clone())
        },
        match_prefix: Box::new(|prefix| catalog::match_prefix(prefix)),
        cache: pipeline_config
            .cache
            .clone()
            .expect("cache configured above"),
        orchestrator_config,
        pipeline_config,
        use_cache: config.use_cache,
    };

    let ctx = FetchContext::builder().build();

    Ok((service, ctx))
}
