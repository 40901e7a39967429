use std::sync::Arc;

use async_trait::async_trait;

use exactobar_core::{PeriodType, UsagePeriod, UsageSnapshot};
use exactobar_fetch::{
    FetchContext, FetchKind, FetchOutcomeTag, FetchStrategy, FetchSuccess, MemoryCache,
    OrchestratorConfig, PipelineConfig,
};

use crate::model::{ModelInfo, RoleConfig};
use crate::service::RoutingService;

struct MockStrategy {
    id: String,
    util: i64,
}

#[async_trait]
impl FetchStrategy for MockStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> FetchKind {
        FetchKind::ApiKey
    }

    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        true
    }

    async fn fetch(&self, _ctx: &FetchContext) -> FetchOutcomeTag {
        let snapshot = UsageSnapshot::new(&self.id, "mock")
            .with_period(UsagePeriod::new("summary", self.util, PeriodType::Weekly));
        FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, format!("{}.mock", self.id), FetchKind::ApiKey))
    }
}

fn mock_strategies(provider_id: &str, util: i64) -> Vec<Box<dyn FetchStrategy>> {
    vec![Box::new(MockStrategy {
        id: provider_id.to_string(),
        util,
    })]
}

fn base_service(utils: Vec<(&'static str, i64)>) -> RoutingService {
    let utils: std::collections::HashMap<String, i64> =
        utils.into_iter().map(|(p, u)| (p.to_string(), u)).collect();

    RoutingService {
        lookup_model: Box::new(|_| None),
        search_models: Box::new(|_| Vec::new()),
        configured_providers: Box::new(|ids| ids.to_vec()),
        provider_strategies: Box::new(move |pid| {
            let util = *utils.get(pid).unwrap_or(&50);
            mock_strategies(pid, util)
        }),
        lookup_multiplier: Box::new(|_, _| None),
        get_role: Box::new(|_| None),
        role_names: Box::new(Vec::new),
        match_prefix: Box::new(|_| Vec::new()),
        cache: Arc::new(MemoryCache::new()),
        orchestrator_config: OrchestratorConfig::default(),
        pipeline_config: PipelineConfig::default(),
        use_cache: false,
    }
}

#[tokio::test]
async fn test_route_model_unknown_query_lists_suggestions() {
    let mut service = base_service(vec![]);
    service.lookup_model = Box::new(|_| None);
    service.search_models = Box::new(|_| {
        vec![
            ModelInfo::new("claude-opus-4-6", "Claude Opus 4.6", vec!["claude".to_string()]),
            ModelInfo::new("claude-sonnet-4-6", "Claude Sonnet 4.6", vec!["claude".to_string()]),
        ]
    });

    let ctx = FetchContext::new();
    let err = service.route_model(&ctx, "claude-sonet").await.unwrap_err();

    match err {
        crate::RoutingError::UnknownModel { query, suggestions } => {
            assert_eq!(query, "claude-sonet");
            assert_eq!(suggestions.len(), 2);
        }
        other => panic!("expected UnknownModel, got {other:?}"),
    }
}

#[tokio::test]
async fn test_route_model_fails_when_no_provider_configured() {
    let mut service = base_service(vec![]);
    service.lookup_model = Box::new(|_| {
        Some(ModelInfo::new(
            "claude-sonnet-4-6",
            "Claude Sonnet 4.6",
            vec!["claude".to_string()],
        ))
    });
    service.configured_providers = Box::new(|_| Vec::new());

    let ctx = FetchContext::new();
    let err = service.route_model(&ctx, "claude-sonnet-4-6").await.unwrap_err();

    match err {
        crate::RoutingError::NoConfiguredProvider { model_name, offering_providers } => {
            assert_eq!(model_name, "Claude Sonnet 4.6");
            assert_eq!(offering_providers, vec!["claude".to_string()]);
        }
        other => panic!("expected NoConfiguredProvider, got {other:?}"),
    }
}

// E5. Single-model routing.
#[tokio::test]
async fn test_route_model_single_provider_end_to_end() {
    let mut service = base_service(vec![("claude", 30)]);
    service.lookup_model = Box::new(|query| {
        if query == "claude-sonnet-4-6" {
            Some(ModelInfo::new(
                "claude-sonnet-4-6",
                "Claude Sonnet 4.6",
                vec!["claude".to_string()],
            ))
        } else {
            None
        }
    });

    let ctx = FetchContext::new();
    let rec = service.route_model(&ctx, "claude-sonnet-4-6").await.unwrap();

    let best = rec.best.expect("expected a best candidate");
    assert_eq!(best.provider_id, "claude");
    assert_eq!(best.headroom, 70);
    assert_eq!(rec.model_name, "Claude Sonnet 4.6");
}

#[tokio::test]
async fn test_route_by_role_unknown_role_lists_sorted_names() {
    let mut service = base_service(vec![]);
    service.get_role = Box::new(|_| None);
    service.role_names = Box::new(|| vec!["thinking".to_string(), "coding".to_string()]);

    let ctx = FetchContext::new();
    let err = service.route_by_role(&ctx, "writing").await.unwrap_err();

    match err {
        crate::RoutingError::UnknownRole { role, available_roles } => {
            assert_eq!(role, "writing");
            assert_eq!(available_roles, vec!["coding".to_string(), "thinking".to_string()]);
        }
        other => panic!("expected UnknownRole, got {other:?}"),
    }
}

// E6. Role routing, two models, three providers.
#[tokio::test]
async fn test_route_by_role_two_models_three_providers() {
    let mut service = base_service(vec![("claude", 20), ("codex", 70)]);
    service.get_role = Box::new(|name| {
        if name == "thinking" {
            Some(RoleConfig::new(
                "thinking",
                vec!["claude-opus-4-6".to_string(), "o4".to_string()],
            ))
        } else {
            None
        }
    });
    service.match_prefix = Box::new(|model_id| match model_id {
        "claude-opus-4-6" => vec![ModelInfo::new(
            "claude-opus-4-6",
            "Claude Opus 4.6",
            vec!["claude".to_string()],
        )],
        "o4" => vec![ModelInfo::new("o4", "o4", vec!["codex".to_string()])],
        _ => Vec::new(),
    });

    let ctx = FetchContext::new();
    let rec = service.route_by_role(&ctx, "thinking").await.unwrap();

    let best = rec.best.expect("expected a best candidate");
    assert_eq!(best.provider_id, "claude");
    assert_eq!(best.headroom, 80);
    assert!(rec.unavailable.is_empty());
}

// Property 17: two models in a role both available on the same
// provider yield exactly one candidate, attributed to the first.
#[tokio::test]
async fn test_route_by_role_deduplicates_shared_provider() {
    let mut service = base_service(vec![("claude", 40)]);
    service.get_role = Box::new(|name| {
        if name == "writing" {
            Some(RoleConfig::new(
                "writing",
                vec!["claude-a".to_string(), "claude-b".to_string()],
            ))
        } else {
            None
        }
    });
    service.match_prefix = Box::new(|model_id| match model_id {
        "claude-a" => vec![ModelInfo::new("claude-a", "Claude A", vec!["claude".to_string()])],
        "claude-b" => vec![ModelInfo::new("claude-b", "Claude B", vec!["claude".to_string()])],
        _ => Vec::new(),
    });

    let ctx = FetchContext::new();
    let rec = service.route_by_role(&ctx, "writing").await.unwrap();

    assert_eq!(rec.ranked.len(), 1);
    assert_eq!(rec.ranked[0].provider_id, "claude");
}

#[tokio::test]
async fn test_route_by_role_fails_when_every_model_unconfigured() {
    let mut service = base_service(vec![]);
    service.get_role = Box::new(|name| {
        if name == "thinking" {
            Some(RoleConfig::new("thinking", vec!["o4".to_string()]))
        } else {
            None
        }
    });
    service.match_prefix = Box::new(|_| vec![ModelInfo::new("o4", "o4", vec!["codex".to_string()])]);
    service.configured_providers = Box::new(|_| Vec::new());

    let ctx = FetchContext::new();
    let err = service.route_by_role(&ctx, "thinking").await.unwrap_err();

    match err {
        crate::RoutingError::NoConfiguredProviderForRole { role } => assert_eq!(role, "thinking"),
        other => panic!("expected NoConfiguredProviderForRole, got {other:?}"),
    }
}

#[tokio::test]
async fn test_route_by_role_falls_back_to_exact_lookup_when_prefix_empty() {
    let mut service = base_service(vec![("claude", 10)]);
    service.get_role = Box::new(|name| {
        if name == "thinking" {
            Some(RoleConfig::new("thinking", vec!["claude-sonnet-4-6".to_string()]))
        } else {
            None
        }
    });
    service.match_prefix = Box::new(|_| Vec::new());
    service.lookup_model = Box::new(|query| {
        if query == "claude-sonnet-4-6" {
            Some(ModelInfo::new(
                "claude-sonnet-4-6",
                "Claude Sonnet 4.6",
                vec!["claude".to_string()],
            ))
        } else {
            None
        }
    });

    let ctx = FetchContext::new();
    let rec = service.route_by_role(&ctx, "thinking").await.unwrap();

    assert_eq!(rec.best.unwrap().provider_id, "claude");
}
