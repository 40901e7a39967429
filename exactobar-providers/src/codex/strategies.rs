//! Codex fetch strategies.
//!
//! This module provides multiple strategies for fetching Codex usage data:
//!
//! 1. **RPC Strategy** - JSON-RPC to `codex app-server`
//! 2. **PTY Strategy** - Interactive `/status` command
//! 3. **CLI Strategy** - `codex usage --json`
//! 4. **API Strategy** - OpenAI API with API key

use async_trait::async_trait;
use exactobar_core::{LoginMethod, ProviderIdentity, ProviderKind, UsageSnapshot};
use exactobar_fetch::{
    host::keychain::{accounts, services},
    FetchContext, FetchError, FetchKind, FetchOutcomeTag, FetchStrategy, FetchSuccess,
};
use tracing::{debug, instrument, warn};

use super::error::CodexError;
use super::parser::parse_codex_cli_output;
use super::pty_probe::CodexPtyProbe;
use super::rpc::CodexRpcClient;

// ============================================================================
// RPC Strategy (Highest Priority)
// ============================================================================

/// Codex RPC strategy using JSON-RPC to `codex app-server`.
///
/// This is the primary strategy for Codex. It spawns the app-server
/// and communicates via JSON-RPC over stdin/stdout. The client itself is
/// synchronous, so every call into it runs on a blocking thread.
pub struct CodexRpcStrategy;

impl CodexRpcStrategy {
    /// Creates a new RPC strategy.
    pub fn new() -> Self {
        Self
    }

    /// Spawns the app-server, initializes it and pulls rate limits and
    /// account info. Runs entirely on a blocking thread.
    fn fetch_blocking() -> Result<UsageSnapshot, CodexError> {
        let mut client = CodexRpcClient::spawn()?;
        client.initialize()?;
        let rate_limits = client.fetch_rate_limits()?.rate_limits;
        let account = client.fetch_account().ok();
        client.shutdown();

        let mut snapshot = UsageSnapshot::new("codex", "rpc");

        if let Some(primary) = rate_limits.primary {
            snapshot = snapshot.with_period(rate_limit_window_to_period(
                "session",
                exactobar_core::PeriodType::Session,
                &primary,
            ));
        }

        if let Some(secondary) = rate_limits.secondary {
            snapshot = snapshot.with_period(rate_limit_window_to_period(
                "weekly",
                exactobar_core::PeriodType::Weekly,
                &secondary,
            ));
        }

        if let Some(account) = account {
            let mut identity = ProviderIdentity::new(ProviderKind::Codex);
            identity.account_email = account.email;
            identity.account_organization = account.organization;
            identity.plan_name = account.plan;
            identity.login_method = Some(LoginMethod::OAuth);
            snapshot.identity = Some(identity);
        }

        if !snapshot.has_data() {
            return Err(CodexError::NoData);
        }

        Ok(snapshot)
    }
}

fn rate_limit_window_to_period(
    name: &str,
    period_type: exactobar_core::PeriodType,
    window: &super::rpc::RateLimitWindow,
) -> exactobar_core::UsagePeriod {
    use chrono::{TimeZone, Utc};

    let mut period =
        exactobar_core::UsagePeriod::new(name, window.used_percent.round() as i64, period_type);

    if let Some(resets_at) = window.resets_at {
        if let chrono::LocalResult::Single(dt) = Utc.timestamp_opt(resets_at, 0) {
            period = period.with_resets_at(dt);
        }
    }

    period
}

impl Default for CodexRpcStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for CodexRpcStrategy {
    fn id(&self) -> &str {
        "codex.rpc"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::CLI
    }

    #[instrument(skip(self, ctx))]
    async fn is_available(&self, ctx: &FetchContext) -> bool {
        ctx.process.command_exists("codex")
    }

    #[instrument(skip(self, _ctx))]
    async fn fetch(&self, _ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Codex usage via RPC");

        let result = tokio::task::spawn_blocking(Self::fetch_blocking).await;

        let snapshot = match result {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                return FetchOutcomeTag::SoftFail(FetchError::Process(
                    exactobar_fetch::ProcessError::ExecutionFailed(e.to_string()),
                ))
            }
            Err(join_err) => {
                return FetchOutcomeTag::SoftFail(FetchError::Process(
                    exactobar_fetch::ProcessError::ExecutionFailed(join_err.to_string()),
                ))
            }
        };

        FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind()))
    }

    fn priority(&self) -> u32 {
        100 // Highest priority - RPC is most reliable
    }
}

// ============================================================================
// PTY Strategy (Fallback)
// ============================================================================

/// Codex PTY strategy using interactive `/status` command.
///
/// This is a fallback strategy that runs codex interactively and
/// parses the TUI output from the `/status` command.
pub struct CodexPtyStrategy;

impl CodexPtyStrategy {
    /// Creates a new PTY strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CodexPtyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for CodexPtyStrategy {
    fn id(&self) -> &str {
        "codex.pty"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::CLI
    }

    #[instrument(skip(self, _ctx))]
    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        CodexPtyProbe::is_available()
    }

    #[instrument(skip(self, _ctx))]
    async fn fetch(&self, _ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Codex usage via PTY");

        let probe = CodexPtyProbe::new();
        let status = match probe.fetch_status().await {
            Ok(s) => s,
            Err(e) => {
                return FetchOutcomeTag::SoftFail(FetchError::Process(
                    exactobar_fetch::ProcessError::ExecutionFailed(e.to_string()),
                ))
            }
        };

        if !status.has_data() {
            return FetchOutcomeTag::SoftFail(FetchError::InvalidResponse(
                "PTY probe returned no usage fields".to_string(),
            ));
        }

        let snapshot = status.to_snapshot();
        FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind()))
    }

    fn priority(&self) -> u32 {
        90 // High priority - good fallback
    }
}

// ============================================================================
// CLI Strategy (Legacy)
// ============================================================================

/// Codex CLI strategy using `codex usage --json`.
///
/// This is a legacy strategy that uses the JSON output mode.
pub struct CodexCliStrategy {
    command: &'static str,
    args: &'static [&'static str],
}

impl CodexCliStrategy {
    /// Creates a new CLI strategy.
    pub fn new() -> Self {
        Self {
            command: "codex",
            args: &["usage", "--json"],
        }
    }
}

impl Default for CodexCliStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for CodexCliStrategy {
    fn id(&self) -> &str {
        "codex.cli"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::CLI
    }

    #[instrument(skip(self, ctx))]
    async fn is_available(&self, ctx: &FetchContext) -> bool {
        let exists = ctx.process.command_exists(self.command);
        debug!(command = self.command, exists = exists, "Checking CLI availability");
        exists
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Codex usage via CLI");

        let output = match ctx
            .process
            .run_with_timeout(self.command, self.args, ctx.timeout())
            .await
        {
            Ok(o) => o,
            Err(e) => return FetchOutcomeTag::SoftFail(FetchError::Process(e)),
        };

        if !output.success() {
            warn!(
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "Codex CLI failed"
            );
            return FetchOutcomeTag::SoftFail(FetchError::InvalidResponse(format!(
                "Codex CLI exited with code {}: {}",
                output.exit_code, output.stderr
            )));
        }

        let snapshot = match parse_codex_cli_output(&output.stdout) {
            Ok(s) => s,
            Err(e) => return FetchOutcomeTag::SoftFail(e),
        };

        FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind()))
    }

    fn priority(&self) -> u32 {
        80 // Lower than RPC/PTY
    }
}

// ============================================================================
// API Strategy
// ============================================================================

/// Codex API strategy using OpenAI API with API key.
///
/// This strategy uses the OpenAI API directly with an API key
/// stored in the system keychain or environment.
pub struct CodexApiStrategy {
    api_base: &'static str,
}

impl CodexApiStrategy {
    /// Creates a new API strategy.
    pub fn new() -> Self {
        Self {
            api_base: "https://api.openai.com/v1",
        }
    }

    /// Gets the API key from keychain or environment.
    async fn get_api_key(&self, ctx: &FetchContext) -> Option<String> {
        if let Ok(Some(key)) = ctx.keychain.get(services::OPENAI, accounts::API_KEY).await {
            return Some(key);
        }

        std::env::var("OPENAI_API_KEY").ok()
    }
}

impl Default for CodexApiStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for CodexApiStrategy {
    fn id(&self) -> &str {
        "codex.api"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::ApiKey
    }

    #[instrument(skip(self, ctx))]
    async fn is_available(&self, ctx: &FetchContext) -> bool {
        self.get_api_key(ctx).await.is_some()
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Codex usage via API");

        let api_key = match self.get_api_key(ctx).await {
            Some(key) => key,
            None => {
                return FetchOutcomeTag::Fatal(FetchError::AuthenticationFailed(
                    "No OpenAI API key found".to_string(),
                ))
            }
        };

        // OpenAI doesn't expose a usage endpoint that works with a bare API
        // key - the usage endpoint requires organization-level access. We
        // validate the key and return a minimal snapshot confirming it works.
        let url = format!("{}/models", self.api_base);
        let auth_header = format!("Bearer {}", api_key);

        let response = match ctx.http.get_with_auth(&url, &auth_header).await {
            Ok(r) => r,
            Err(e) => return FetchOutcomeTag::SoftFail(FetchError::InvalidResponse(e.to_string())),
        };

        if !response.status().is_success() {
            return FetchOutcomeTag::Fatal(FetchError::AuthenticationFailed(
                "API key validation failed".to_string(),
            ));
        }

        warn!("OpenAI API key validated but usage data requires dashboard access");
        let snapshot = UsageSnapshot::new("codex", "api");

        FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind()))
    }

    fn priority(&self) -> u32 {
        60 // Lower than CLI-based strategies
    }

    fn should_fallback(&self, error: &FetchError) -> bool {
        // Don't fallback on auth errors - no point trying other strategies
        !matches!(error, FetchError::AuthenticationFailed(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_strategy_id() {
        let strategy = CodexRpcStrategy::new();
        assert_eq!(strategy.id(), "codex.rpc");
        assert_eq!(strategy.kind(), FetchKind::CLI);
        assert_eq!(strategy.priority(), 100);
    }

    #[test]
    fn test_pty_strategy_id() {
        let strategy = CodexPtyStrategy::new();
        assert_eq!(strategy.id(), "codex.pty");
        assert_eq!(strategy.kind(), FetchKind::CLI);
        assert_eq!(strategy.priority(), 90);
    }

    #[test]
    fn test_cli_strategy_id() {
        let strategy = CodexCliStrategy::new();
        assert_eq!(strategy.id(), "codex.cli");
        assert_eq!(strategy.kind(), FetchKind::CLI);
        assert_eq!(strategy.priority(), 80);
    }

    #[test]
    fn test_api_strategy_id() {
        let strategy = CodexApiStrategy::new();
        assert_eq!(strategy.id(), "codex.api");
        assert_eq!(strategy.kind(), FetchKind::ApiKey);
        assert_eq!(strategy.priority(), 60);
    }

    #[test]
    fn test_strategy_priority_order() {
        let rpc = CodexRpcStrategy::new().priority();
        let pty = CodexPtyStrategy::new().priority();
        let cli = CodexCliStrategy::new().priority();
        let api = CodexApiStrategy::new().priority();

        assert!(rpc > pty);
        assert!(pty > cli);
        assert!(cli > api);
    }
}
