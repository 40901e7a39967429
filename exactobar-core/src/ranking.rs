//! Deterministic headroom ranking across providers.
//!
//! Given a set of usage snapshots and per-provider cost multipliers,
//! [`rank`] and [`rank_by_role`] compute each provider's bottleneck
//! headroom and produce a totally-ordered candidate list. Ranking never
//! reads wall-clock time or map iteration order; the same inputs always
//! produce the same output.

use std::collections::HashMap;

use crate::models::UsageSnapshot;

/// One provider's ranking record, produced fresh per ranking call.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Stable provider identifier.
    pub provider_id: String,
    /// `100 - bottleneck.utilization()`.
    pub headroom: u8,
    /// Bottleneck period's raw utilization.
    pub utilization: u8,
    /// Cost multiplier applied to reach `effective_headroom`, if any.
    pub multiplier: Option<f64>,
    /// Headroom after multiplier adjustment; the ranking key.
    pub effective_headroom: u8,
    /// Bottleneck period's classification.
    pub period_type: crate::models::PeriodType,
    /// Bottleneck period's reset time, if known.
    pub resets_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Plan/subscription name, or empty if unknown.
    pub plan: String,
    /// Whether this candidate was served from cache.
    pub cached: bool,
}

/// Result of ranking a single model query.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    /// First-ranked candidate, if any were available.
    pub best: Option<Candidate>,
    /// Full ranked candidate sequence.
    pub ranked: Vec<Candidate>,
    /// Provider ids with no usable snapshot, sorted ascending.
    pub unavailable: Vec<String>,
    /// The model name this recommendation was computed for.
    pub model_name: String,
}

/// Result of ranking a role (a named set of models).
#[derive(Debug, Clone, PartialEq)]
pub struct RoleRecommendation {
    /// First-ranked candidate, if any were available.
    pub best: Option<Candidate>,
    /// Full ranked candidate sequence.
    pub ranked: Vec<Candidate>,
    /// `(provider_id, model_id)` pairs with no usable snapshot, sorted.
    pub unavailable: Vec<(String, String)>,
    /// The role name this recommendation was computed for.
    pub role_name: String,
}

/// One entry in a role's model list, as consumed by [`rank_by_role`].
#[derive(Debug, Clone)]
pub struct ModelEntry {
    /// Stable model identifier.
    pub model_id: String,
    /// Model name used for multiplier lookup.
    pub model_name: String,
    /// Providers offering this model, already filtered to configured ones.
    pub provider_ids: Vec<String>,
}

/// Adjusts `headroom` by `multiplier` per the fixed rule:
/// `None` passes `headroom` through, `0` means a free model (fully
/// available, `100`), and any positive value divides headroom down,
/// floored and clamped to `[0, 100]`.
fn adjust_headroom(headroom: u8, multiplier: Option<f64>) -> u8 {
    match multiplier {
        None => headroom,
        Some(m) if m == 0.0 => 100,
        Some(m) => {
            let scaled = (f64::from(headroom) / m).floor();
            scaled.clamp(0.0, 100.0) as u8
        }
    }
}

fn plan_of(snapshot: &UsageSnapshot) -> String {
    snapshot
        .identity
        .as_ref()
        .and_then(|i| i.plan_name.clone())
        .unwrap_or_default()
}

fn build_candidate(
    provider_id: &str,
    snapshot: &UsageSnapshot,
    cached: bool,
    multiplier: Option<f64>,
) -> Option<Candidate> {
    let bottleneck = snapshot.bottleneck_period()?;
    let headroom = bottleneck.remaining();
    Some(Candidate {
        provider_id: provider_id.to_string(),
        headroom,
        utilization: bottleneck.utilization(),
        multiplier,
        effective_headroom: adjust_headroom(headroom, multiplier),
        period_type: bottleneck.period_type,
        resets_at: bottleneck.resets_at,
        plan: plan_of(snapshot),
        cached,
    })
}

/// Ranks `provider_ids` by effective headroom for a single model.
///
/// `snapshots` maps provider id to `(snapshot, cached)`; a missing
/// entry, or a snapshot whose bottleneck period cannot be determined,
/// places that provider in `unavailable` instead of `ranked`.
/// `lookup_multiplier` resolves the cost multiplier for a provider.
pub fn rank(
    provider_ids: &[String],
    snapshots: &HashMap<String, (UsageSnapshot, bool)>,
    model_name: &str,
    lookup_multiplier: impl Fn(&str) -> Option<f64>,
) -> Recommendation {
    let mut ranked = Vec::new();
    let mut unavailable = Vec::new();

    for pid in provider_ids {
        match snapshots.get(pid) {
            Some((snapshot, cached)) => {
                let multiplier = lookup_multiplier(pid);
                match build_candidate(pid, snapshot, *cached, multiplier) {
                    Some(candidate) => ranked.push(candidate),
                    None => unavailable.push(pid.clone()),
                }
            }
            None => unavailable.push(pid.clone()),
        }
    }

    ranked.sort_by(|a, b| {
        b.effective_headroom
            .cmp(&a.effective_headroom)
            .then(a.provider_id.cmp(&b.provider_id))
    });
    unavailable.sort();

    Recommendation {
        best: ranked.first().cloned(),
        ranked,
        unavailable,
        model_name: model_name.to_string(),
    }
}

/// Ranks providers across a role's model list, deduplicating a
/// provider to the first model entry whose `provider_ids` contains it.
pub fn rank_by_role(
    role_name: &str,
    model_entries: &[ModelEntry],
    snapshots: &HashMap<String, (UsageSnapshot, bool)>,
    multiplier_fn: impl Fn(&str, &str) -> Option<f64>,
) -> RoleRecommendation {
    let mut ranked = Vec::new();
    let mut unavailable = Vec::new();
    let mut seen_providers = std::collections::HashSet::new();

    for entry in model_entries {
        for pid in &entry.provider_ids {
            if !seen_providers.insert(pid.clone()) {
                continue;
            }

            match snapshots.get(pid) {
                Some((snapshot, cached)) => {
                    let multiplier = multiplier_fn(&entry.model_name, pid);
                    match build_candidate(pid, snapshot, *cached, multiplier) {
                        Some(candidate) => ranked.push((candidate, entry.model_id.clone())),
                        None => unavailable.push((pid.clone(), entry.model_id.clone())),
                    }
                }
                None => unavailable.push((pid.clone(), entry.model_id.clone())),
            }
        }
    }

    ranked.sort_by(|(a, a_model), (b, b_model)| {
        b.effective_headroom
            .cmp(&a.effective_headroom)
            .then(a.provider_id.cmp(&b.provider_id))
            .then(a_model.cmp(b_model))
    });
    unavailable.sort_by(|(a_pid, a_model), (b_pid, b_model)| {
        a_pid.cmp(b_pid).then(a_model.cmp(b_model))
    });

    let ranked: Vec<Candidate> = ranked.into_iter().map(|(c, _)| c).collect();

    RoleRecommendation {
        best: ranked.first().cloned(),
        ranked,
        unavailable,
        role_name: role_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PeriodType, UsagePeriod};

    fn snapshot_with(provider: &str, utilization: i64) -> UsageSnapshot {
        UsageSnapshot::new(provider, "mock")
            .with_period(UsagePeriod::new("summary", utilization, PeriodType::Weekly))
    }

    #[test]
    fn test_rank_orders_by_effective_headroom_desc() {
        let mut snapshots = HashMap::new();
        snapshots.insert("claude".to_string(), (snapshot_with("claude", 50), false));
        snapshots.insert("copilot".to_string(), (snapshot_with("copilot", 10), false));

        let providers = vec!["claude".to_string(), "copilot".to_string()];
        let lookup = |pid: &str| if pid == "copilot" { Some(3.0) } else { None };

        let rec = rank(&providers, &snapshots, "gpt", lookup);

        assert_eq!(rec.ranked[0].provider_id, "claude");
        assert_eq!(rec.ranked[0].effective_headroom, 50);
        assert_eq!(rec.ranked[1].provider_id, "copilot");
        assert_eq!(rec.ranked[1].effective_headroom, 30);
        assert_eq!(rec.best.as_ref().unwrap().provider_id, "claude");
    }

    #[test]
    fn test_free_model_multiplier_gives_full_headroom() {
        let mut snapshots = HashMap::new();
        snapshots.insert("codex".to_string(), (snapshot_with("codex", 90), false));

        let providers = vec!["codex".to_string()];
        let rec = rank(&providers, &snapshots, "free-model", |_| Some(0.0));

        assert_eq!(rec.ranked[0].effective_headroom, 100);
    }

    #[test]
    fn test_missing_snapshot_is_unavailable() {
        let snapshots = HashMap::new();
        let providers = vec!["claude".to_string(), "codex".to_string()];
        let rec = rank(&providers, &snapshots, "gpt", |_| None);

        assert!(rec.ranked.is_empty());
        assert_eq!(rec.unavailable, vec!["claude".to_string(), "codex".to_string()]);
    }

    #[test]
    fn test_empty_periods_is_unavailable() {
        let mut snapshots = HashMap::new();
        snapshots.insert(
            "claude".to_string(),
            (UsageSnapshot::new("claude", "mock"), false),
        );
        let providers = vec!["claude".to_string()];
        let rec = rank(&providers, &snapshots, "gpt", |_| None);

        assert!(rec.ranked.is_empty());
        assert_eq!(rec.unavailable, vec!["claude".to_string()]);
    }

    #[test]
    fn test_ties_broken_by_provider_id_ascending() {
        let mut snapshots = HashMap::new();
        snapshots.insert("zeta".to_string(), (snapshot_with("zeta", 50), false));
        snapshots.insert("alpha".to_string(), (snapshot_with("alpha", 50), false));

        let providers = vec!["zeta".to_string(), "alpha".to_string()];
        let rec = rank(&providers, &snapshots, "gpt", |_| None);

        assert_eq!(rec.ranked[0].provider_id, "alpha");
        assert_eq!(rec.ranked[1].provider_id, "zeta");
    }

    #[test]
    fn test_role_deduplicates_to_first_listed_model() {
        let mut snapshots = HashMap::new();
        snapshots.insert("p".to_string(), (snapshot_with("p", 20), false));

        let entries = vec![
            ModelEntry {
                model_id: "model-a".to_string(),
                model_name: "Model A".to_string(),
                provider_ids: vec!["p".to_string()],
            },
            ModelEntry {
                model_id: "model-b".to_string(),
                model_name: "Model B".to_string(),
                provider_ids: vec!["p".to_string()],
            },
        ];

        let rec = rank_by_role("coder", &entries, &snapshots, |_, _| None);

        assert_eq!(rec.ranked.len(), 1);
        assert_eq!(rec.ranked[0].provider_id, "p");
    }

    #[test]
    fn test_role_sort_falls_back_to_model_id() {
        let mut snapshots = HashMap::new();
        snapshots.insert("p1".to_string(), (snapshot_with("p1", 40), false));
        snapshots.insert("p2".to_string(), (snapshot_with("p2", 40), false));

        let entries = vec![ModelEntry {
            model_id: "m1".to_string(),
            model_name: "M1".to_string(),
            provider_ids: vec!["p1".to_string(), "p2".to_string()],
        }];

        let rec = rank_by_role("coder", &entries, &snapshots, |_, _| None);
        assert_eq!(rec.ranked[0].provider_id, "p1");
        assert_eq!(rec.ranked[1].provider_id, "p2");
    }
}
