//! Status-related types.
//!
//! This module contains types for provider status:
//! - [`ProviderStatus`] - Service health information
//! - [`StatusIndicator`] - Status levels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Provider Status
// ============================================================================

/// Provider service status from status pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Status indicator level.
    pub indicator: StatusIndicator,
    /// Human-readable status description.
    pub description: String,
    /// When this status was last updated.
    pub updated_at: DateTime<Utc>,
    /// URL to the full status page.
    pub url: Option<String>,
}

impl ProviderStatus {
    /// Creates a new operational status.
    pub fn operational() -> Self {
        Self {
            indicator: StatusIndicator::None,
            description: "All systems operational".to_string(),
            updated_at: Utc::now(),
            url: None,
        }
    }

    /// Creates a new status with the given indicator and description.
    pub fn new(indicator: StatusIndicator, description: impl Into<String>) -> Self {
        Self {
            indicator,
            description: description.into(),
            updated_at: Utc::now(),
            url: None,
        }
    }

    /// Returns true if the service is fully operational.
    pub fn is_operational(&self) -> bool {
        self.indicator == StatusIndicator::None
    }

    /// Returns true if there's any degradation or outage.
    pub fn has_issues(&self) -> bool {
        !matches!(self.indicator, StatusIndicator::None | StatusIndicator::Unknown)
    }

    /// Returns true if this is a critical outage.
    pub fn is_critical(&self) -> bool {
        self.indicator == StatusIndicator::Critical
    }
}

impl Default for ProviderStatus {
    fn default() -> Self {
        Self::operational()
    }
}

// ============================================================================
// Status Indicator
// ============================================================================

/// Status indicator levels from provider status pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusIndicator {
    /// Operational - no issues.
    #[default]
    None,
    /// Minor issues - degraded performance.
    Minor,
    /// Major issues - partial outage.
    Major,
    /// Critical issues - major outage.
    Critical,
    /// Under scheduled maintenance.
    Maintenance,
    /// Status unknown.
    Unknown,
}

impl StatusIndicator {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "Operational",
            Self::Minor => "Degraded",
            Self::Major => "Partial Outage",
            Self::Critical => "Major Outage",
            Self::Maintenance => "Under Maintenance",
            Self::Unknown => "Unknown",
        }
    }

    /// Returns an emoji for the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::None => "🟢",
            Self::Minor => "🟡",
            Self::Major => "🟠",
            Self::Critical => "🔴",
            Self::Maintenance => "🔧",
            Self::Unknown => "⚪",
        }
    }

    /// Returns a severity score (0 = operational, 5 = unknown).
    pub fn severity(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Minor => 1,
            Self::Major => 2,
            Self::Critical => 3,
            Self::Maintenance => 4,
            Self::Unknown => 5,
        }
    }

    /// Returns all indicators in order of severity.
    pub fn all() -> &'static [StatusIndicator] {
        &[
            Self::None,
            Self::Minor,
            Self::Major,
            Self::Critical,
            Self::Maintenance,
            Self::Unknown,
        ]
    }
}

impl std::fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

// ============================================================================
// Tests
// ============================================================================
