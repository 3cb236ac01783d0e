#![allow(missing_docs)]

use serde::Serialize;
use tracing::debug;

use crate::analysis::health::{density_tier, recommend, DensityTier, Recommendation, Severity};
use crate::inspect::options::HealthPolicy;
use crate::inspect::util::percent;
use crate::types::snapshot::TableDetailRecord;

#[derive(Debug, Clone, Serialize)]
pub struct TableHealthReport {
    pub name: String,
    pub schema: String,
    pub size: u64,
    pub total_pages: u64,
    pub index_count: u32,
    pub tuple_count: u64,
    pub dead_tuple_count: u64,
    /// Dead tuples as a share of all tuples, percent.
    pub dead_ratio: f64,
    /// Bytes held by dead tuples.
    pub reclaimable_bytes: u64,
    pub free_space: u64,
    pub free_percent: f64,
    /// Tier of `100 - free_percent`.
    pub fill_tier: DensityTier,
    pub recommendation: Recommendation,
    pub severity: Severity,
    pub label: &'static str,
    pub advice: &'static str,
}

/// Summarises dead-tuple pressure on a table.
pub fn table_health_report(detail: &TableDetailRecord, policy: &HealthPolicy) -> TableHealthReport {
    let stats = &detail.stats;
    let dead_ratio = if stats.dead_tuple_count == 0 {
        0.0
    } else {
        percent(
            stats.dead_tuple_count as f64,
            (stats.tuple_count + stats.dead_tuple_count) as f64,
        )
    };
    let recommendation = recommend(dead_ratio, false, &policy.table_dead_ratio);

    debug!(
        table = %detail.info.name,
        dead_ratio,
        recommendation = %recommendation,
        "built table health report"
    );

    TableHealthReport {
        name: detail.info.name.clone(),
        schema: detail.info.schema.clone(),
        size: detail.info.size,
        total_pages: detail.info.total_pages,
        index_count: detail.info.index_count,
        tuple_count: stats.tuple_count,
        dead_tuple_count: stats.dead_tuple_count,
        dead_ratio,
        reclaimable_bytes: stats.dead_tuple_len,
        free_space: stats.free_space,
        free_percent: stats.free_percent,
        fill_tier: density_tier(100.0 - stats.free_percent, &policy.tier),
        recommendation,
        severity: recommendation.severity(),
        label: table_label(recommendation),
        advice: table_advice(recommendation),
    }
}

fn table_label(recommendation: Recommendation) -> &'static str {
    match recommendation {
        Recommendation::Ok => "Healthy",
        Recommendation::Cleanup => "Needs VACUUM",
        Recommendation::Rebuild => "High Bloat",
    }
}

fn table_advice(recommendation: Recommendation) -> &'static str {
    match recommendation {
        Recommendation::Ok => "Table is healthy.",
        Recommendation::Cleanup => "Consider running VACUUM to reclaim dead tuples.",
        Recommendation::Rebuild => "VACUUM FULL recommended to compact the table.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::util::parse_snapshot;

    fn detail(tuples: u64, dead: u64, free_percent: f64) -> TableDetailRecord {
        parse_snapshot(&format!(
            r#"{{"info": {{"name": "orders", "schema": "public", "size": 65536}},
                "stats": {{"tupleCount": {tuples}, "deadTupleCount": {dead},
                           "deadTupleLen": 640, "freePercent": {free_percent}}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn clean_table_is_healthy() {
        let report = table_health_report(&detail(1000, 0, 5.0), &HealthPolicy::default());
        assert_eq!(report.dead_ratio, 0.0);
        assert_eq!(report.recommendation, Recommendation::Ok);
        assert_eq!(report.severity, Severity::Good);
        assert_eq!(report.fill_tier, DensityTier::High);
        assert_eq!(report.name, "orders");
    }

    #[test]
    fn dead_ratio_drives_recommendation() {
        let policy = HealthPolicy::default();
        // 10 / 100
        let report = table_health_report(&detail(90, 10, 5.0), &policy);
        assert!((report.dead_ratio - 10.0).abs() < 1e-9);
        assert_eq!(report.recommendation, Recommendation::Cleanup);
        assert_eq!(report.label, "Needs VACUUM");
        assert_eq!(report.reclaimable_bytes, 640);

        let report = table_health_report(&detail(70, 30, 5.0), &policy);
        assert_eq!(report.recommendation, Recommendation::Rebuild);
        assert_eq!(report.label, "High Bloat");

        // exactly at the bound stays below it
        let report = table_health_report(&detail(95, 5, 5.0), &policy);
        assert_eq!(report.recommendation, Recommendation::Ok);
    }

    #[test]
    fn free_space_sets_fill_tier() {
        let report = table_health_report(&detail(10, 0, 45.0), &HealthPolicy::default());
        assert_eq!(report.fill_tier, DensityTier::Medium);
        let report = table_health_report(&detail(10, 0, 80.0), &HealthPolicy::default());
        assert_eq!(report.fill_tier, DensityTier::Low);
    }
}
