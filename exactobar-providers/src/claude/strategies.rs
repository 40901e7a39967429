//! Claude fetch strategies.
//!
//! This module provides multiple strategies for fetching Claude usage data:
//!
//! 1. **OAuth Strategy** - Uses OAuth tokens for API access
//! 2. **PTY Strategy** - Interactive `/usage` command
//! 3. **CLI Strategy** - `claude usage` command (legacy)
//! 4. **Web Strategy** - Browser cookies for claude.ai

use async_trait::async_trait;
use exactobar_fetch::{
    host::browser::Browser, FetchContext, FetchError, FetchKind, FetchOutcomeTag, FetchStrategy,
    FetchSuccess,
};
use tracing::{debug, instrument};

use super::api::ClaudeApiClient;
use super::oauth::ClaudeOAuthCredentials;
use super::parser::parse_claude_cli_output;
use super::pty_probe::ClaudePtyProbe;
use super::web::ClaudeWebClient;

// ============================================================================
// OAuth Strategy (Highest Priority)
// ============================================================================

/// Claude OAuth strategy using tokens from Claude CLI.
///
/// This is the primary strategy for Claude. It uses OAuth tokens
/// stored by the Claude CLI to access the Anthropic API directly.
pub struct ClaudeOAuthStrategy;

impl ClaudeOAuthStrategy {
    /// Creates a new OAuth strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClaudeOAuthStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for ClaudeOAuthStrategy {
    fn id(&self) -> &str {
        "claude.oauth"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::OAuth
    }

    #[instrument(skip(self, _ctx))]
    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        // Don't check credentials here - it may hit keychain and cause password prompts!
        // Let fetch() handle credential loading and return appropriate errors.
        true
    }

    #[instrument(skip(self, _ctx))]
    async fn fetch(&self, _ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Claude usage via OAuth");

        let credentials = match ClaudeOAuthCredentials::load() {
            Ok(c) => c,
            Err(e) => {
                return FetchOutcomeTag::Fatal(FetchError::AuthenticationFailed(e.to_string()))
            }
        };

        if credentials.is_expired() {
            return FetchOutcomeTag::Fatal(FetchError::AuthenticationFailed(
                "OAuth token expired".to_string(),
            ));
        }

        let client = ClaudeApiClient::new();
        let response = match client.fetch_usage(&credentials).await {
            Ok(r) => r,
            Err(e) => return FetchOutcomeTag::SoftFail(FetchError::InvalidResponse(e.to_string())),
        };

        let snapshot = response.to_snapshot();
        FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind()))
    }

    fn priority(&self) -> u32 {
        100 // Highest priority
    }
}

// ============================================================================
// PTY Strategy
// ============================================================================

/// Claude PTY strategy using interactive `/usage` command.
///
/// This strategy runs claude interactively and parses the TUI output
/// from the `/usage` command.
pub struct ClaudePtyStrategy;

impl ClaudePtyStrategy {
    /// Creates a new PTY strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClaudePtyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for ClaudePtyStrategy {
    fn id(&self) -> &str {
        "claude.pty"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::CLI
    }

    #[instrument(skip(self, _ctx))]
    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        ClaudePtyProbe::is_available()
    }

    #[instrument(skip(self, _ctx))]
    async fn fetch(&self, _ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Claude usage via PTY");

        let probe = ClaudePtyProbe::new();
        let status = match probe.fetch_usage().await {
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
        40 // Fallback priority
    }
}

// ============================================================================
// CLI Strategy (Legacy)
// ============================================================================

/// Claude CLI strategy using `claude` command.
///
/// This strategy runs the Claude CLI to get usage information.
/// This is a legacy strategy - prefer PTY for interactive commands.
pub struct ClaudeCliStrategy {
    command: &'static str,
}

impl ClaudeCliStrategy {
    /// Creates a new CLI strategy.
    pub fn new() -> Self {
        Self { command: "claude" }
    }
}

impl Default for ClaudeCliStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for ClaudeCliStrategy {
    fn id(&self) -> &str {
        "claude.cli"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::CLI
    }

    #[instrument(skip(self, ctx))]
    async fn is_available(&self, ctx: &FetchContext) -> bool {
        ctx.process.command_exists(self.command)
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Claude usage via CLI");

        // Run claude usage command
        // Note: The exact command may vary depending on Claude CLI version
        let output = match ctx
            .process
            .run_with_timeout(self.command, &["usage", "--json"], ctx.timeout())
            .await
        {
            Ok(o) => o,
            Err(e) => return FetchOutcomeTag::SoftFail(FetchError::Process(e)),
        };

        if !output.success() {
            // Try without --json flag
            let output = match ctx
                .process
                .run_with_timeout(self.command, &["usage"], ctx.timeout())
                .await
            {
                Ok(o) => o,
                Err(e) => return FetchOutcomeTag::SoftFail(FetchError::Process(e)),
            };

            if !output.success() {
                return FetchOutcomeTag::SoftFail(FetchError::InvalidResponse(format!(
                    "CLI exited with code {}: {}",
                    output.exit_code, output.stderr
                )));
            }

            // Parse non-JSON output
            return match parse_claude_cli_output(&output.stdout, false) {
                Ok(snapshot) => {
                    FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind()))
                }
                Err(e) => FetchOutcomeTag::SoftFail(e),
            };
        }

        match parse_claude_cli_output(&output.stdout, true) {
            Ok(snapshot) => FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind())),
            Err(e) => FetchOutcomeTag::SoftFail(e),
        }
    }

    fn priority(&self) -> u32 {
        80 // Lower than OAuth, higher than PTY
    }
}

// ============================================================================
// Web Strategy
// ============================================================================

/// Claude web strategy using browser cookies.
///
/// This strategy uses cookies from the browser to access claude.ai
/// and fetch usage information from the web interface.
pub struct ClaudeWebStrategy {
    domain: &'static str,
}

impl ClaudeWebStrategy {
    /// Creates a new web strategy.
    pub fn new() -> Self {
        Self {
            domain: "claude.ai",
        }
    }
}

impl Default for ClaudeWebStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for ClaudeWebStrategy {
    fn id(&self) -> &str {
        "claude.web"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::WebCookies
    }

    #[instrument(skip(self, _ctx))]
    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        // Don't try to import cookies here - it may hit Chrome Safe Storage keychain!
        // Just check if any browser is installed (no keychain access).
        !Browser::default_priority()
            .iter()
            .filter(|b| b.is_installed())
            .collect::<Vec<_>>()
            .is_empty()
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> FetchOutcomeTag {
        debug!("Fetching Claude usage via web cookies");

        // Get cookies from browser
        let (browser, cookies) = match ctx
            .browser
            .import_cookies_auto(self.domain, Browser::default_priority())
            .await
        {
            Ok(pair) => pair,
            Err(e) => return FetchOutcomeTag::SoftFail(FetchError::Browser(e)),
        };

        debug!(browser = ?browser, cookie_count = cookies.len(), "Got cookies");

        // Build cookie header
        let cookie_header =
            exactobar_fetch::host::browser::BrowserCookieImporter::cookies_to_header(&cookies);

        // Check for session cookie
        if !ClaudeWebClient::has_session_cookie(&cookie_header) {
            return FetchOutcomeTag::SoftFail(FetchError::AuthenticationFailed(
                "No session cookie found".to_string(),
            ));
        }

        // Fetch usage
        let client = ClaudeWebClient::new();
        let response = match client.fetch_usage(&cookie_header, None).await {
            Ok(r) => r,
            Err(e) => return FetchOutcomeTag::SoftFail(FetchError::InvalidResponse(e.to_string())),
        };

        let snapshot = response.to_snapshot();
        FetchOutcomeTag::Ok(FetchSuccess::new(snapshot, self.id(), self.kind()))
    }

    fn priority(&self) -> u32 {
        60 // Medium priority
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_strategy_id() {
        let strategy = ClaudeOAuthStrategy::new();
        assert_eq!(strategy.id(), "claude.oauth");
        assert_eq!(strategy.kind(), FetchKind::OAuth);
        assert_eq!(strategy.priority(), 100);
    }

    #[test]
    fn test_pty_strategy_id() {
        let strategy = ClaudePtyStrategy::new();
        assert_eq!(strategy.id(), "claude.pty");
        assert_eq!(strategy.kind(), FetchKind::CLI);
        assert_eq!(strategy.priority(), 40);
    }

    #[test]
    fn test_cli_strategy_id() {
        let strategy = ClaudeCliStrategy::new();
        assert_eq!(strategy.id(), "claude.cli");
        assert_eq!(strategy.kind(), FetchKind::CLI);
        assert_eq!(strategy.priority(), 80);
    }

    #[test]
    fn test_web_strategy_id() {
        let strategy = ClaudeWebStrategy::new();
        assert_eq!(strategy.id(), "claude.web");
        assert_eq!(strategy.kind(), FetchKind::WebCookies);
        assert_eq!(strategy.priority(), 60);
    }

    #[test]
    fn test_strategy_priority_order() {
        let oauth = ClaudeOAuthStrategy::new().priority();
        let cli = ClaudeCliStrategy::new().priority();
        let web = ClaudeWebStrategy::new().priority();
        let pty = ClaudePtyStrategy::new().priority();

        assert!(oauth > cli);
        assert!(cli > web);
        assert!(web > pty);
    }
}
