//! Usage-related types.
//!
//! This module contains the canonical shape of a usage reading:
//! - [`UsageSnapshot`] - immutable reading for one provider at one instant
//! - [`UsagePeriod`] - one utilization window inside a snapshot
//! - [`PeriodType`] - session/daily/weekly/monthly window classification
//! - [`Overage`] - optional billing-overage detail

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderIdentity;

// ============================================================================
// Period Type
// ============================================================================

/// Classification of a [`UsagePeriod`]'s window.
///
/// Ordered session < daily < weekly < monthly; this ordering is the
/// bottleneck tie-break when two summary periods share the same
/// utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    /// Short rolling session window (e.g. "5h" for Claude).
    Session,
    /// Calendar-day window.
    Daily,
    /// Calendar-week window.
    Weekly,
    /// Calendar-month window.
    Monthly,
}

// ============================================================================
// Usage Period
// ============================================================================

/// One utilization window inside a snapshot.
///
/// `utilization` is always clamped to `[0, 100]` by every constructor
/// and mutator below; there is no way to observe an out-of-range value
/// once a `UsagePeriod` exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePeriod {
    /// Human display name ("Session (5h)", "Weekly", per-model name, ...).
    pub name: String,
    /// Percentage of quota used, clamped to `[0, 100]`.
    utilization: u8,
    /// Which kind of window this is.
    pub period_type: PeriodType,
    /// When this window resets, if known.
    pub resets_at: Option<DateTime<Utc>>,
    /// Model identifier this period applies to; empty means "summary /
    /// whole account" row.
    #[serde(default)]
    pub model: String,
}

fn clamp_utilization(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

impl UsagePeriod {
    /// Creates a new period, clamping `utilization` to `[0, 100]`.
    pub fn new(name: impl Into<String>, utilization: i64, period_type: PeriodType) -> Self {
        Self {
            name: name.into(),
            utilization: clamp_utilization(utilization),
            period_type,
            resets_at: None,
            model: String::new(),
        }
    }

    /// Creates a per-model period (used by role routing).
    pub fn for_model(
        name: impl Into<String>,
        utilization: i64,
        period_type: PeriodType,
        model: impl Into<String>,
    ) -> Self {
        let mut period = Self::new(name, utilization, period_type);
        period.model = model.into();
        period
    }

    /// Sets the reset time (builder-style).
    pub fn with_resets_at(mut self, resets_at: DateTime<Utc>) -> Self {
        self.resets_at = Some(resets_at);
        self
    }

    /// Returns the clamped utilization percentage.
    pub fn utilization(&self) -> u8 {
        self.utilization
    }

    /// Sets utilization, clamping to `[0, 100]`.
    pub fn set_utilization(&mut self, value: i64) {
        self.utilization = clamp_utilization(value);
    }

    /// Returns `100 - utilization`.
    pub fn remaining(&self) -> u8 {
        100 - self.utilization
    }

    /// Returns true if this is a summary row (applies to the whole
    /// account rather than one model).
    pub fn is_summary(&self) -> bool {
        self.model.is_empty()
    }
}

// ============================================================================
// Overage
// ============================================================================

/// Optional billing-overage detail attached to a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overage {
    /// Amount used (provider-specific unit).
    pub used: f64,
    /// Limit, if known.
    pub limit: Option<f64>,
    /// ISO 4217 currency code, or empty if not monetary.
    pub currency: String,
    /// Whether overage billing is enabled for this account.
    pub enabled: bool,
}

// ============================================================================
// Usage Snapshot
// ============================================================================

/// An immutable usage reading for one provider at one instant.
///
/// The snapshot is the one value every fetch strategy produces and the
/// cache stores. Once emitted by a strategy it is never mutated; the
/// cache and the orchestrator only ever hand out clones or shared
/// references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Stable provider identifier (lowercase ASCII slug, e.g. "claude").
    pub provider: String,
    /// UTC instant the snapshot was produced.
    pub fetched_at: DateTime<Utc>,
    /// Ordered, non-empty-when-successful sequence of usage windows.
    pub periods: Vec<UsagePeriod>,
    /// Account identity, if the strategy could resolve one.
    pub identity: Option<ProviderIdentity>,
    /// Billing overage detail, if applicable.
    pub overage: Option<Overage>,
    /// Short tag naming the strategy that produced this snapshot
    /// (`"oauth"`, `"api_key"`, `"cli"`, `"web"`, `"cache"`, ...).
    pub source: String,
}

impl UsageSnapshot {
    /// Creates a snapshot with no periods, timestamped now.
    pub fn new(provider: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            fetched_at: Utc::now(),
            periods: Vec::new(),
            identity: None,
            overage: None,
            source: source.into(),
        }
    }

    /// Appends a period (builder-style).
    pub fn with_period(mut self, period: UsagePeriod) -> Self {
        self.periods.push(period);
        self
    }

    /// Returns true if there is at least one period.
    pub fn has_data(&self) -> bool {
        !self.periods.is_empty()
    }

    /// Returns true if this snapshot is older than `threshold`.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        Utc::now() - self.fetched_at > threshold
    }

    /// Returns the bottleneck period: among summary rows (`model ==
    /// ""`), the one with the greatest utilization; ties broken by
    /// shorter window type, then original order. Falls back to the
    /// greatest-utilization period of any kind if there are no summary
    /// rows. `None` only when `periods` is empty.
    pub fn bottleneck_period(&self) -> Option<&UsagePeriod> {
        let summary_best = self
            .periods
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_summary())
            .max_by(|(ia, a), (ib, b)| {
                a.utilization()
                    .cmp(&b.utilization())
                    .then(b.period_type.cmp(&a.period_type))
                    .then(ib.cmp(ia))
            })
            .map(|(_, p)| p);

        summary_best.or_else(|| {
            self.periods
                .iter()
                .enumerate()
                .max_by(|(ia, a), (ib, b)| {
                    a.utilization()
                        .cmp(&b.utilization())
                        .then(b.period_type.cmp(&a.period_type))
                        .then(ib.cmp(ia))
                })
                .map(|(_, p)| p)
        })
    }

    /// Returns the remaining headroom for `period`, or `None` if
    /// `period` is not part of this snapshot.
    pub fn remaining(&self, period: &UsagePeriod) -> Option<u8> {
        self.periods
            .iter()
            .find(|p| std::ptr::eq(*p, period))
            .map(UsagePeriod::remaining)
    }
}

// ============================================================================
// Tests
// ============================================================================
