//! Integration tests for core snapshot types.

use chrono::Duration;
use exactobar_core::{PeriodType, UsagePeriod, UsageSnapshot};

#[test]
fn test_snapshot_serialization_roundtrip() {
    let snapshot = UsageSnapshot::new("claude", "mock");
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: UsageSnapshot = serde_json::from_str(&json).unwrap();
    assert!(!parsed.has_data());
}

#[test]
fn test_usage_period_clamps_out_of_range() {
    let period = UsagePeriod::new("p", -10, PeriodType::Daily);
    assert_eq!(period.utilization(), 0);

    let period = UsagePeriod::new("p", 250, PeriodType::Daily);
    assert_eq!(period.utilization(), 100);
}

#[test]
fn test_snapshot_staleness() {
    let mut snapshot = UsageSnapshot::new("claude", "mock");
    snapshot.fetched_at -= Duration::hours(1);
    assert!(snapshot.is_stale(Duration::minutes(30)));
}
