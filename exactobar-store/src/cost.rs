//! Local token cost tracking shapes, populated by scanning provider
//! log directories (see `exactobar-cli`'s `cost` command).

use chrono::{DateTime, Utc};

/// Cost usage snapshot assembled from local log parsing.
#[derive(Debug, Clone, Default)]
pub struct CostUsageSnapshot {
    /// Daily usage breakdown.
    pub daily: Vec<DailyCost>,
    /// Total tokens across the scanned window.
    pub total_tokens: u64,
    /// Total estimated cost (USD) across the scanned window.
    pub total_cost_usd: f64,
    /// Last scan timestamp.
    pub scanned_at: Option<DateTime<Utc>>,
}

/// One day's token/cost total.
#[derive(Debug, Clone)]
pub struct DailyCost {
    /// Date of the cost entry.
    pub date: DateTime<Utc>,
    /// Token count for this day.
    pub tokens: u64,
    /// Cost in USD for this day.
    pub cost_usd: f64,
}
