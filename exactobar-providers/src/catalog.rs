//! Static catalog of known models, used to resolve a routing query
//! (`route <model>` / `role <name>`) to the providers that offer it.
//!
//! This is hand-maintained rather than fetched, the same way
//! [`ProviderRegistry`](crate::ProviderRegistry) hand-maintains its
//! three descriptors: new models are added here as they ship.

use std::sync::OnceLock;

use exactobar_routing::ModelInfo;

/// Static storage for the model catalog.
static CATALOG: OnceLock<Vec<ModelInfo>> = OnceLock::new();

fn init_catalog() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new("claude-opus-4-1", "claude-opus-4-1", vec!["claude".into(), "copilot".into()]),
        ModelInfo::new("claude-sonnet-4-5", "claude-sonnet-4-5", vec!["claude".into(), "copilot".into()]),
        ModelInfo::new("claude-haiku-4-5", "claude-haiku-4-5", vec!["claude".into(), "copilot".into()]),
        ModelInfo::new("gpt-5", "gpt-5", vec!["codex".into(), "copilot".into()]),
        ModelInfo::new("gpt-5-codex", "gpt-5-codex", vec!["codex".into()]),
        ModelInfo::new("gpt-5-mini", "gpt-5-mini", vec!["codex".into(), "copilot".into()]),
        ModelInfo::new("o4-mini", "o4-mini", vec!["copilot".into()]),
    ]
}

/// The full model catalog, initialized lazily.
pub fn all() -> &'static [ModelInfo] {
    CATALOG.get_or_init(init_catalog)
}

/// Exact lookup by model id (case-insensitive) or display name.
pub fn lookup(query: &str) -> Option<ModelInfo> {
    let query_lower = query.to_lowercase();
    all()
        .iter()
        .find(|m| m.id.to_lowercase() == query_lower || m.name.to_lowercase() == query_lower)
        .cloned()
}

/// Fuzzy substring match over id and name, for suggestion lists.
pub fn search(query: &str) -> Vec<ModelInfo> {
    let query_lower = query.to_lowercase();
    all()
        .iter()
        .filter(|m| m.id.to_lowercase().contains(&query_lower) || m.name.to_lowercase().contains(&query_lower))
        .cloned()
        .collect()
}

/// Prefix match on model id, for role resolution where a role lists a
/// family prefix (e.g. `"gpt-5"` matching `"gpt-5-codex"`).
pub fn match_prefix(prefix: &str) -> Vec<ModelInfo> {
    let prefix_lower = prefix.to_lowercase();
    all()
        .iter()
        .filter(|m| m.id.to_lowercase().starts_with(&prefix_lower))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("GPT-5").is_some());
        assert!(lookup("gpt-5").is_some());
    }

    #[test]
    fn lookup_unknown_is_none() {
        assert!(lookup("not-a-real-model").is_none());
    }

    #[test]
    fn search_matches_substring() {
        let results = search("claude");
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn match_prefix_finds_family() {
        let results = match_prefix("gpt-5");
        assert_eq!(results.len(), 3);
        assert!(results.iter().any(|m| m.id == "gpt-5-codex"));
    }

    #[test]
    fn match_prefix_exact_id_also_matches() {
        let results = match_prefix("gpt-5-codex");
        assert_eq!(results.len(), 1);
    }
}
