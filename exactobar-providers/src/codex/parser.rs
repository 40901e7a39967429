//! Codex response parsers.

use chrono::{DateTime, Utc};
use exactobar_core::{LoginMethod, PeriodType, ProviderIdentity, ProviderKind, UsagePeriod, UsageSnapshot};
use exactobar_fetch::FetchError;
use serde::Deserialize;
use tracing::{debug, warn};

// ============================================================================
// CLI Output Structures
// ============================================================================

/// Response from `codex usage --json`.
#[derive(Debug, Deserialize)]
pub struct CodexCliResponse {
    /// Session usage data.
    #[serde(default)]
    pub session: Option<CodexUsageWindow>,
    /// Weekly usage data.
    #[serde(default)]
    pub weekly: Option<CodexUsageWindow>,
    /// Account information.
    #[serde(default)]
    pub account: Option<CodexAccount>,
    /// Credits information.
    #[serde(default)]
    #[allow(dead_code)]
    pub credits: Option<CodexCredits>,
}

/// Usage window from Codex CLI.
#[derive(Debug, Deserialize)]
pub struct CodexUsageWindow {
    /// Usage percentage (0-100).
    #[serde(alias = "usage_percent", alias = "percent")]
    pub used_percent: Option<f64>,
    /// Window duration in minutes.
    #[serde(alias = "duration_minutes")]
    pub window_minutes: Option<u32>,
    /// Reset timestamp.
    #[serde(alias = "reset_at")]
    pub resets_at: Option<String>,
    /// Human-readable reset description.
    #[serde(alias = "reset_in")]
    #[allow(dead_code)]
    pub reset_description: Option<String>,
}

/// Account info from Codex CLI.
#[derive(Debug, Deserialize)]
pub struct CodexAccount {
    /// Email address.
    pub email: Option<String>,
    /// Organization name.
    #[serde(alias = "org")]
    pub organization: Option<String>,
    /// Plan name.
    pub plan: Option<String>,
}

/// Credits info from Codex CLI.
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct CodexCredits {
    /// Remaining credits.
    pub remaining: Option<f64>,
    /// Total credits.
    pub total: Option<f64>,
    /// Credits unit (e.g., "USD").
    pub unit: Option<String>,
}

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from OpenAI API (models endpoint for validation).
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct OpenAiModelsResponse {
    pub data: Vec<OpenAiModel>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct OpenAiModel {
    pub id: String,
}

// ============================================================================
// Parsers
// ============================================================================

/// Parses Codex CLI JSON output into a UsageSnapshot.
pub fn parse_codex_cli_output(json_str: &str) -> Result<UsageSnapshot, FetchError> {
    debug!(len = json_str.len(), "Parsing Codex CLI output");

    let response: CodexCliResponse = serde_json::from_str(json_str).map_err(|e| {
        warn!(error = %e, "Failed to parse Codex CLI JSON");
        FetchError::InvalidResponse(format!("Invalid JSON: {}", e))
    })?;

    let mut snapshot = UsageSnapshot::new("codex", "cli");

    if let Some(session) = response.session {
        snapshot = snapshot.with_period(parse_usage_window("session", session, PeriodType::Session));
    }

    if let Some(weekly) = response.weekly {
        snapshot = snapshot.with_period(parse_usage_window("weekly", weekly, PeriodType::Weekly));
    }

    if let Some(account) = response.account {
        let mut identity = ProviderIdentity::new(ProviderKind::Codex);
        identity.account_email = account.email;
        identity.account_organization = account.organization;
        identity.plan_name = account.plan;
        identity.login_method = Some(LoginMethod::CLI);
        snapshot.identity = Some(identity);
    }

    debug!(
        periods = snapshot.periods.len(),
        has_identity = snapshot.identity.is_some(),
        "Codex CLI output parsed"
    );

    Ok(snapshot)
}

/// Converts a Codex usage window into a [`UsagePeriod`].
fn parse_usage_window(name: &str, window: CodexUsageWindow, period_type: PeriodType) -> UsagePeriod {
    let utilization = window.used_percent.unwrap_or(0.0).round() as i64;
    let mut period = UsagePeriod::new(name, utilization, period_type);

    if let Some(reset_str) = window.resets_at {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&reset_str) {
            period = period.with_resets_at(dt.with_timezone(&Utc));
        }
    }

    period
}

/// Parses OpenAI API response (for validation).
#[allow(dead_code)]
pub fn parse_codex_api_response(json_str: &str) -> Result<UsageSnapshot, FetchError> {
    // This just validates the response is valid JSON
    let _: OpenAiModelsResponse = serde_json::from_str(json_str)
        .map_err(|e| FetchError::InvalidResponse(format!("Invalid API response: {}", e)))?;

    // Return minimal snapshot - API doesn't provide usage data
    Ok(UsageSnapshot::new("codex", "api"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codex_cli_full() {
        let json = r#"{
            "session": {
                "used_percent": 45.5,
                "window_minutes": 300,
                "reset_description": "in 2 hours"
            },
            "weekly": {
                "used_percent": 20.0,
                "window_minutes": 10080
            },
            "account": {
                "email": "user@example.com",
                "organization": "Acme Inc",
                "plan": "Pro"
            }
        }"#;

        let snapshot = parse_codex_cli_output(json).unwrap();

        let session = snapshot.periods.iter().find(|p| p.name == "session").unwrap();
        assert_eq!(session.utilization(), 46); // rounds 45.5 -> 46
        assert_eq!(session.period_type, PeriodType::Session);

        let weekly = snapshot.periods.iter().find(|p| p.name == "weekly").unwrap();
        assert_eq!(weekly.utilization(), 20);
        assert_eq!(weekly.period_type, PeriodType::Weekly);

        let identity = snapshot.identity.unwrap();
        assert_eq!(identity.account_email, Some("user@example.com".to_string()));
        assert_eq!(identity.account_organization, Some("Acme Inc".to_string()));
    }

    #[test]
    fn test_parse_codex_cli_minimal() {
        let json = r#"{}"#;

        let snapshot = parse_codex_cli_output(json).unwrap();
        assert!(snapshot.periods.is_empty());
        assert!(snapshot.identity.is_none());
    }

    #[test]
    fn test_parse_codex_cli_invalid() {
        let result = parse_codex_cli_output("not json");
        assert!(result.is_err());
    }
}
