//! Summary command - combined summary of all providers.

use anyhow::Result;
use exactobar_core::{ProviderKind, UsageSnapshot};
use exactobar_fetch::{fetch_all, FetchContext, OrchestratorConfig, SourceMode};
use exactobar_providers::ProviderRegistry;
use std::collections::HashMap;
use tokio::time::Duration;
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the summary command.
pub async fn run(cli: &Cli) -> Result<()> {
    info!("Running summary");

    // Get all default-enabled providers
    let providers: Vec<ProviderKind> = ProviderRegistry::all()
        .iter()
        .filter(|d| d.metadata.default_enabled || d.metadata.is_primary_provider)
        .map(|d| d.id)
        .collect();

    let ctx = FetchContext::builder()
        .source_mode(SourceMode::Auto)
        .timeout(Duration::from_secs(30))
        .build();

    // Fetch from every provider concurrently via the orchestrator.
    let mut strategy_map = HashMap::new();
    let mut key_to_kind = HashMap::new();
    for provider in &providers {
        if let Some(desc) = ProviderRegistry::get(*provider) {
            let key = desc.cli_name().to_string();
            strategy_map.insert(key.clone(), desc.build_strategies(&ctx));
            key_to_kind.insert(key, *provider);
        }
    }

    let config = OrchestratorConfig::default();
    let outcomes = fetch_all(&ctx, strategy_map, true, &config, None).await;

    let mut results: HashMap<ProviderKind, Option<UsageSnapshot>> = HashMap::new();
    for (key, outcome) in outcomes {
        if let Some(provider) = key_to_kind.get(&key).copied() {
            results.insert(provider, outcome.snapshot);
        }
    }

    // Output
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_summary(&results));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = formatter.format_summary(&results)?;
            println!("{}", output);
        }
    }

    Ok(())
}
