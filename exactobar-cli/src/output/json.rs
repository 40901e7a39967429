//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use exactobar_core::{Candidate, ProviderKind, Recommendation, RoleRecommendation, UsagePeriod, UsageSnapshot};
use exactobar_providers::ProviderDescriptor;
use exactobar_store::CostUsageSnapshot;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a single provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutput {
    pub provider: String,
    pub source: String,
    #[serde(serialize_with = "serialize_datetime")]
    pub fetched_at: DateTime<Utc>,
    pub periods: Vec<PeriodOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One usage period.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodOutput {
    pub name: String,
    pub used_percent: u8,
    pub remaining_percent: u8,
    pub period_type: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub resets_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
}

/// Identity info.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_method: Option<String>,
}

/// Cost report output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostOutput {
    pub provider: String,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub daily: Vec<DailyCostOutput>,
}

/// Daily cost entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCostOutput {
    pub date: String,
    pub tokens: u64,
    pub cost_usd: f64,
}

/// Provider info output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfoOutput {
    pub id: String,
    pub display_name: String,
    pub cli_name: String,
    pub default_enabled: bool,
    pub is_primary: bool,
    pub supports_credits: bool,
    pub supports_opus: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_page_url: Option<String>,
}

/// One ranked candidate in a route/role recommendation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOutput {
    pub provider: String,
    pub headroom: u8,
    pub utilization: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    pub effective_headroom: u8,
    pub period_type: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub resets_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub plan: String,
    pub cached: bool,
}

/// Output for a single-model route query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutput {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<CandidateOutput>,
    pub ranked: Vec<CandidateOutput>,
    pub unavailable: Vec<String>,
}

/// Output for a role route query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleOutput {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<CandidateOutput>,
    pub ranked: Vec<CandidateOutput>,
    pub unavailable: Vec<(String, String)>,
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

fn period_type_tag(period_type: exactobar_core::PeriodType) -> String {
    format!("{:?}", period_type).to_lowercase()
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats usage results.
    pub fn format_results(
        &self,
        results: &HashMap<ProviderKind, Result<UsageSnapshot, String>>,
    ) -> Result<String> {
        let outputs: Vec<ProviderOutput> = results
            .iter()
            .map(|(provider, result)| self.snapshot_to_output(*provider, result))
            .collect();

        if outputs.len() == 1 {
            self.format(&outputs[0])
        } else {
            self.format(&outputs)
        }
    }

    /// Converts a snapshot result to output.
    fn snapshot_to_output(
        &self,
        provider: ProviderKind,
        result: &Result<UsageSnapshot, String>,
    ) -> ProviderOutput {
        let provider_name = format!("{:?}", provider).to_lowercase();

        match result {
            Ok(snapshot) => ProviderOutput {
                provider: provider_name,
                source: snapshot.source.clone(),
                fetched_at: snapshot.fetched_at,
                periods: snapshot.periods.iter().map(|p| self.period_to_output(p)).collect(),
                identity: snapshot.identity.as_ref().map(|id| IdentityOutput {
                    account_email: id.account_email.clone(),
                    account_organization: id.account_organization.clone(),
                    plan_name: id.plan_name.clone(),
                    login_method: id.login_method.as_ref().map(|m| format!("{:?}", m)),
                }),
                error: None,
            },
            Err(e) => ProviderOutput {
                provider: provider_name,
                source: "unknown".to_string(),
                fetched_at: Utc::now(),
                periods: Vec::new(),
                identity: None,
                error: Some(e.clone()),
            },
        }
    }

    /// Converts a usage period to output.
    fn period_to_output(&self, period: &UsagePeriod) -> PeriodOutput {
        PeriodOutput {
            name: period.name.clone(),
            used_percent: period.utilization(),
            remaining_percent: period.remaining(),
            period_type: period_type_tag(period.period_type),
            resets_at: period.resets_at,
            model: period.model.clone(),
        }
    }

    /// Converts a ranked candidate to output.
    fn candidate_to_output(&self, candidate: &Candidate) -> CandidateOutput {
        CandidateOutput {
            provider: candidate.provider_id.clone(),
            headroom: candidate.headroom,
            utilization: candidate.utilization,
            multiplier: candidate.multiplier,
            effective_headroom: candidate.effective_headroom,
            period_type: period_type_tag(candidate.period_type),
            resets_at: candidate.resets_at,
            plan: candidate.plan.clone(),
            cached: candidate.cached,
        }
    }

    /// Formats a single-model route recommendation.
    pub fn format_route(&self, recommendation: &Recommendation) -> Result<String> {
        let output = RouteOutput {
            model: recommendation.model_name.clone(),
            best: recommendation.best.as_ref().map(|c| self.candidate_to_output(c)),
            ranked: recommendation.ranked.iter().map(|c| self.candidate_to_output(c)).collect(),
            unavailable: recommendation.unavailable.clone(),
        };
        self.format(&output)
    }

    /// Formats a role route recommendation.
    pub fn format_role(&self, recommendation: &RoleRecommendation) -> Result<String> {
        let output = RoleOutput {
            role: recommendation.role_name.clone(),
            best: recommendation.best.as_ref().map(|c| self.candidate_to_output(c)),
            ranked: recommendation.ranked.iter().map(|c| self.candidate_to_output(c)).collect(),
            unavailable: recommendation.unavailable.clone(),
        };
        self.format(&output)
    }

    /// Formats cost results.
    pub fn format_cost_results(
        &self,
        results: &HashMap<ProviderKind, CostUsageSnapshot>,
    ) -> Result<String> {
        let outputs: Vec<CostOutput> = results
            .iter()
            .map(|(provider, cost)| CostOutput {
                provider: format!("{:?}", provider).to_lowercase(),
                total_tokens: cost.total_tokens,
                total_cost_usd: cost.total_cost_usd,
                daily: cost
                    .daily
                    .iter()
                    .map(|d| DailyCostOutput {
                        date: d.date.format("%Y-%m-%d").to_string(),
                        tokens: d.tokens,
                        cost_usd: d.cost_usd,
                    })
                    .collect(),
            })
            .collect();

        if outputs.len() == 1 {
            self.format(&outputs[0])
        } else {
            self.format(&outputs)
        }
    }

    /// Formats provider list.
    pub fn format_providers(&self, providers: &[ProviderDescriptor]) -> Result<String> {
        let outputs: Vec<ProviderInfoOutput> = providers
            .iter()
            .map(|desc| ProviderInfoOutput {
                id: format!("{:?}", desc.id).to_lowercase(),
                display_name: desc.display_name().to_string(),
                cli_name: desc.cli_name().to_string(),
                default_enabled: desc.metadata.default_enabled,
                is_primary: desc.metadata.is_primary_provider,
                supports_credits: desc.metadata.supports_credits,
                supports_opus: desc.metadata.supports_opus,
                dashboard_url: desc.metadata.dashboard_url.clone(),
                status_page_url: desc.metadata.status_page_url.clone(),
            })
            .collect();

        self.format(&outputs)
    }

    /// Formats summary.
    pub fn format_summary(
        &self,
        results: &HashMap<ProviderKind, Option<UsageSnapshot>>,
    ) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct SummaryItem {
            provider: String,
            status: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            bottleneck_name: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            used_percent: Option<u8>,
        }

        let items: Vec<SummaryItem> = results
            .iter()
            .map(|(provider, snapshot)| {
                let (status, bottleneck_name, used_percent) = match snapshot {
                    Some(snap) => match snap.bottleneck_period() {
                        Some(period) => (
                            "ok".to_string(),
                            Some(period.name.clone()),
                            Some(period.utilization()),
                        ),
                        None => ("ok".to_string(), None, None),
                    },
                    None => ("error".to_string(), None, None),
                };

                SummaryItem {
                    provider: format!("{:?}", provider).to_lowercase(),
                    status,
                    bottleneck_name,
                    used_percent,
                }
            })
            .collect();

        self.format(&items)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pretty() {
        let formatter = JsonFormatter::new(true);
        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let formatter = JsonFormatter::new(false);
        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_period_output() {
        let formatter = JsonFormatter::new(false);
        let period = UsagePeriod::new("Session", 38, exactobar_core::PeriodType::Session);
        let output = formatter.period_to_output(&period);
        assert_eq!(output.used_percent, 38);
        assert_eq!(output.remaining_percent, 62);
    }

    #[test]
    fn test_snapshot_error_output() {
        let formatter = JsonFormatter::new(false);
        let output = formatter.snapshot_to_output(ProviderKind::Codex, &Err("boom".to_string()));
        assert_eq!(output.error, Some("boom".to_string()));
        assert!(output.periods.is_empty());
    }
}
