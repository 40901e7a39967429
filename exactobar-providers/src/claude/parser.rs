//! Claude response parsers.

use chrono::{DateTime, Utc};
use exactobar_core::{LoginMethod, PeriodType, ProviderIdentity, ProviderKind, UsagePeriod, UsageSnapshot};
use exactobar_fetch::FetchError;
use serde::Deserialize;
use tracing::{debug, warn};

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from Claude API usage endpoint.
#[derive(Debug, Deserialize)]
pub struct ClaudeApiResponse {
    /// Session usage (5-hour window).
    #[serde(default)]
    pub session: Option<ClaudeUsageData>,
    /// Weekly usage.
    #[serde(default)]
    pub weekly: Option<ClaudeUsageData>,
    /// Opus/premium tier usage.
    #[serde(default)]
    pub opus: Option<ClaudeUsageData>,
    /// Organization information.
    #[serde(default)]
    pub organization: Option<ClaudeOrganization>,
    /// User information.
    #[serde(default)]
    pub user: Option<ClaudeUser>,
}

/// Usage data from Claude API.
#[derive(Debug, Deserialize)]
pub struct ClaudeUsageData {
    /// Percentage used (0-100).
    #[serde(alias = "usage_percent", alias = "percent", alias = "pct")]
    pub used_percent: Option<f64>,
    /// Remaining percentage.
    #[serde(alias = "remaining_percent")]
    pub remaining: Option<f64>,
    /// Window duration in minutes.
    #[serde(alias = "window_minutes", alias = "duration")]
    pub window: Option<u32>,
    /// Reset timestamp (ISO 8601).
    #[serde(alias = "reset_at", alias = "resets")]
    pub resets_at: Option<String>,
    /// Human-readable reset description.
    #[serde(alias = "reset_in", alias = "time_until_reset")]
    pub reset_description: Option<String>,
}

/// Organization info from Claude API.
#[derive(Debug, Deserialize)]
pub struct ClaudeOrganization {
    #[allow(dead_code)]
    pub id: Option<String>,
    pub name: Option<String>,
}

/// User info from Claude API.
#[derive(Debug, Deserialize)]
pub struct ClaudeUser {
    pub email: Option<String>,
    pub plan: Option<String>,
}

// ============================================================================
// Parsers
// ============================================================================

/// Parses Claude API JSON response into a UsageSnapshot.
pub fn parse_claude_api_response(json_str: &str) -> Result<UsageSnapshot, FetchError> {
    debug!(len = json_str.len(), "Parsing Claude API response");

    let response: ClaudeApiResponse = serde_json::from_str(json_str).map_err(|e| {
        warn!(error = %e, "Failed to parse Claude API JSON");
        FetchError::InvalidResponse(format!("Invalid JSON: {}", e))
    })?;

    let mut snapshot = UsageSnapshot::new("claude", "oauth");

    if let Some(session) = response.session {
        snapshot = snapshot.with_period(make_period("Session (5h)", session, PeriodType::Session));
    }
    if let Some(weekly) = response.weekly {
        snapshot = snapshot.with_period(make_period("Weekly", weekly, PeriodType::Weekly));
    }
    if let Some(opus) = response.opus {
        snapshot = snapshot.with_period(make_period("Opus (7d)", opus, PeriodType::Weekly));
    }

    if response.user.is_some() || response.organization.is_some() {
        let mut identity = ProviderIdentity::new(ProviderKind::Claude);
        if let Some(user) = response.user {
            identity.account_email = user.email;
            identity.plan_name = user.plan;
        }
        if let Some(org) = response.organization {
            identity.account_organization = org.name;
        }
        identity.login_method = Some(LoginMethod::OAuth);
        snapshot.identity = Some(identity);
    }

    debug!(periods = snapshot.periods.len(), "Claude API response parsed");

    Ok(snapshot)
}

/// Parses Claude CLI output into a UsageSnapshot.
///
/// # Arguments
/// * `output` - The CLI output string
/// * `is_json` - Whether the output is JSON format
pub fn parse_claude_cli_output(output: &str, is_json: bool) -> Result<UsageSnapshot, FetchError> {
    if is_json {
        return parse_claude_api_response(output);
    }

    // Parse text format
    // Example output:
    // Session: 45% used (resets in 2h 15m)
    // Weekly: 20% used (resets Sunday)
    // Opus: 30% used
    debug!("Parsing Claude CLI text output");

    let mut snapshot = UsageSnapshot::new("claude", "cli");

    for line in output.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Session:") {
            if let Some(period) = parse_text_usage_line(rest, "Session (5h)", PeriodType::Session) {
                snapshot = snapshot.with_period(period);
            }
        } else if let Some(rest) = line.strip_prefix("Weekly:") {
            if let Some(period) = parse_text_usage_line(rest, "Weekly", PeriodType::Weekly) {
                snapshot = snapshot.with_period(period);
            }
        } else if let Some(rest) = line.strip_prefix("Opus:") {
            if let Some(period) = parse_text_usage_line(rest, "Opus (7d)", PeriodType::Weekly) {
                snapshot = snapshot.with_period(period);
            }
        }
    }

    Ok(snapshot)
}

/// Parses Claude web response (could be JSON or HTML).
#[allow(dead_code)]
pub fn parse_claude_web_response(body: &str) -> Result<UsageSnapshot, FetchError> {
    // Try JSON first
    if body.trim().starts_with('{') {
        return parse_claude_api_response(body);
    }

    // HTML parsing would go here
    // For now, return error if not JSON
    warn!("Claude web response is not JSON - HTML parsing not implemented");
    Err(FetchError::InvalidResponse(
        "HTML parsing not yet implemented".to_string(),
    ))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parses a ClaudeUsageData into a named summary UsagePeriod.
fn make_period(name: &str, data: ClaudeUsageData, period_type: PeriodType) -> UsagePeriod {
    // Calculate used_percent from remaining if not provided directly
    let used_percent = data
        .used_percent
        .unwrap_or_else(|| data.remaining.map(|r| 100.0 - r).unwrap_or(0.0));

    let mut period = UsagePeriod::new(name, used_percent.round() as i64, period_type);

    if let Some(reset_str) = data.resets_at {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&reset_str) {
            period = period.with_resets_at(dt.with_timezone(&Utc));
        }
    }

    period
}

/// Parses a text usage line like "45% used (resets in 2h 15m)".
pub(crate) fn parse_text_usage_line(
    text: &str,
    name: &str,
    period_type: PeriodType,
) -> Option<UsagePeriod> {
    let text = text.trim();

    // Look for percentage
    let percent_idx = text.find('%')?;
    let percent_str = text[..percent_idx].trim();
    let percent: f64 = percent_str.parse().ok()?;

    Some(UsagePeriod::new(name, percent.round() as i64, period_type))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claude_api_full() {
        let json = r#"{
            "session": {
                "used_percent": 45.5,
                "window": 300,
                "reset_description": "in 2 hours"
            },
            "weekly": {
                "used_percent": 20.0,
                "window": 10080
            },
            "opus": {
                "used_percent": 30.0
            },
            "user": {
                "email": "user@example.com",
                "plan": "Pro"
            },
            "organization": {
                "name": "Acme Inc"
            }
        }"#;

        let snapshot = parse_claude_api_response(json).unwrap();

        let session = snapshot
            .periods
            .iter()
            .find(|p| p.period_type == PeriodType::Session)
            .unwrap();
        assert_eq!(session.utilization(), 46); // 45.5 rounds to 46

        let weekly_periods: Vec<_> = snapshot
            .periods
            .iter()
            .filter(|p| p.period_type == PeriodType::Weekly)
            .collect();
        assert_eq!(weekly_periods.len(), 2);
        assert!(weekly_periods.iter().any(|p| p.utilization() == 20));
        assert!(weekly_periods.iter().any(|p| p.utilization() == 30));

        assert!(snapshot.identity.is_some());
        let identity = snapshot.identity.unwrap();
        assert_eq!(identity.account_email, Some("user@example.com".to_string()));
        assert_eq!(identity.account_organization, Some("Acme Inc".to_string()));
    }

    #[test]
    fn test_parse_claude_api_with_remaining() {
        let json = r#"{
            "session": {
                "remaining": 60.0
            }
        }"#;

        let snapshot = parse_claude_api_response(json).unwrap();
        let session = snapshot
            .periods
            .iter()
            .find(|p| p.period_type == PeriodType::Session)
            .unwrap();
        // remaining 60% means used 40%
        assert_eq!(session.utilization(), 40);
    }

    #[test]
    fn test_parse_text_usage_line() {
        let period = parse_text_usage_line("45% used (resets in 2h 15m)", "Session", PeriodType::Session).unwrap();
        assert_eq!(period.utilization(), 45);

        let period = parse_text_usage_line("20% used", "Weekly", PeriodType::Weekly).unwrap();
        assert_eq!(period.utilization(), 20);
    }

    #[test]
    fn test_parse_claude_cli_text() {
        let output = r#"
Session: 45% used (resets in 2h 15m)
Weekly: 20% used (resets Sunday)
Opus: 30% used
"#;

        let snapshot = parse_claude_cli_output(output, false).unwrap();

        assert_eq!(snapshot.periods.len(), 3);
        assert!(snapshot
            .periods
            .iter()
            .any(|p| p.period_type == PeriodType::Session && p.utilization() == 45));
        assert_eq!(
            snapshot
                .periods
                .iter()
                .filter(|p| p.period_type == PeriodType::Weekly)
                .count(),
            2
        );
    }
}
