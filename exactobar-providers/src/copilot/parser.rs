//! Copilot response parser.

use exactobar_core::{LoginMethod, PeriodType, ProviderIdentity, ProviderKind, UsagePeriod, UsageSnapshot};
use exactobar_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct CopilotUsageResponse {
    #[serde(default)]
    pub completions: Option<CopilotCompletions>,
    #[serde(default)]
    pub user: Option<CopilotUser>,
}

#[derive(Debug, Deserialize)]
pub struct CopilotCompletions {
    #[allow(dead_code)]
    pub accepted: Option<u64>,
    #[allow(dead_code)]
    pub suggested: Option<u64>,
    pub acceptance_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CopilotUser {
    pub login: Option<String>,
    pub plan: Option<String>,
}

pub fn parse_copilot_response(json_str: &str) -> Result<UsageSnapshot, FetchError> {
    debug!(len = json_str.len(), "Parsing Copilot response");

    let response: CopilotUsageResponse = serde_json::from_str(json_str)
        .map_err(|e| FetchError::InvalidResponse(format!("Invalid JSON: {}", e)))?;

    let mut snapshot = UsageSnapshot::new("copilot", "oauth");

    if let Some(completions) = response.completions {
        // Use acceptance rate as a proxy for "usage".
        if let Some(rate) = completions.acceptance_rate {
            let used_percent = (rate * 100.0).round() as i64;
            snapshot = snapshot.with_period(UsagePeriod::new("Completions", used_percent, PeriodType::Session));
        }
    }

    if let Some(user) = response.user {
        let mut identity = ProviderIdentity::new(ProviderKind::Copilot);
        identity.account_email = user.login;
        identity.plan_name = user.plan;
        identity.login_method = Some(LoginMethod::OAuth);
        snapshot.identity = Some(identity);
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_copilot() {
        let json = r#"{
            "completions": {"accepted": 100, "suggested": 200, "acceptance_rate": 0.5},
            "user": {"login": "octocat", "plan": "pro"}
        }"#;
        let snapshot = parse_copilot_response(json).unwrap();
        assert_eq!(snapshot.periods.len(), 1);
        assert_eq!(snapshot.periods[0].utilization(), 50);
        assert!(snapshot.identity.is_some());
    }

    #[test]
    fn test_parse_empty() {
        let json = r#"{}"#;
        let snapshot = parse_copilot_response(json).unwrap();
        assert!(snapshot.periods.is_empty());
    }
}
