use serde::{Deserialize, Deserializer, Serialize};

use crate::analysis::health::{FillThresholds, RecommendThresholds, TierThresholds};
use crate::inspect::error::{InspectError, Result};

/// Thresholds used when classifying pages and recommending maintenance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPolicy {
    /// Leaf fill a freshly built index is expected to reach, percent.
    pub target_leaf_density: f64,
    /// Fill bucket bounds for index pages.
    pub fill: FillThresholds,
    /// Fill bucket bounds for heap pages.
    #[serde(default = "FillThresholds::heap", deserialize_with = "heap_fill")]
    pub heap_fill: FillThresholds,
    /// Density tier bounds.
    pub tier: TierThresholds,
    /// Bounds applied to an index's estimated bloat percentage.
    pub index_bloat: RecommendThresholds,
    /// Bounds applied to a table's dead-tuple ratio.
    #[serde(
        default = "RecommendThresholds::dead_ratio",
        deserialize_with = "dead_ratio"
    )]
    pub table_dead_ratio: RecommendThresholds,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            target_leaf_density: 90.0,
            fill: FillThresholds::default(),
            heap_fill: FillThresholds::heap(),
            tier: TierThresholds::default(),
            index_bloat: RecommendThresholds::default(),
            table_dead_ratio: RecommendThresholds::dead_ratio(),
        }
    }
}

impl HealthPolicy {
    /// Checks that every set of bounds is finite and strictly descending and
    /// that the target leaf density lies in `(0, 100]`.
    pub fn validate(&self) -> Result<()> {
        if !self.fill.is_ordered() {
            return Err(invalid("fill thresholds must satisfy full > partial > sparse"));
        }
        if !self.heap_fill.is_ordered() {
            return Err(invalid(
                "heap_fill thresholds must satisfy full > partial > sparse",
            ));
        }
        if !self.tier.is_ordered() {
            return Err(invalid("tier thresholds must satisfy high > medium"));
        }
        if !self.index_bloat.is_ordered() {
            return Err(invalid(
                "index_bloat thresholds must satisfy rebuild_above > cleanup_above",
            ));
        }
        if !self.table_dead_ratio.is_ordered() {
            return Err(invalid(
                "table_dead_ratio thresholds must satisfy rebuild_above > cleanup_above",
            ));
        }
        let target = self.target_leaf_density;
        if !(target.is_finite() && target > 0.0 && target <= 100.0) {
            return Err(invalid(format!(
                "target_leaf_density must be in (0, 100], got {target}"
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> InspectError {
    InspectError::InvalidPolicy(message.into())
}

// Sections that set only some bounds take the rest from the field's own
// defaults, not from the threshold type's.

#[derive(Deserialize)]
struct FillPatch {
    full: Option<f64>,
    partial: Option<f64>,
    sparse: Option<f64>,
}

#[derive(Deserialize)]
struct RecommendPatch {
    rebuild_above: Option<f64>,
    cleanup_above: Option<f64>,
}

fn heap_fill<'de, D>(deserializer: D) -> std::result::Result<FillThresholds, D::Error>
where
    D: Deserializer<'de>,
{
    let patch = FillPatch::deserialize(deserializer)?;
    let base = FillThresholds::heap();
    Ok(FillThresholds {
        full: patch.full.unwrap_or(base.full),
        partial: patch.partial.unwrap_or(base.partial),
        sparse: patch.sparse.unwrap_or(base.sparse),
    })
}

fn dead_ratio<'de, D>(deserializer: D) -> std::result::Result<RecommendThresholds, D::Error>
where
    D: Deserializer<'de>,
{
    let patch = RecommendPatch::deserialize(deserializer)?;
    let base = RecommendThresholds::dead_ratio();
    Ok(RecommendThresholds {
        rebuild_above: patch.rebuild_above.unwrap_or(base.rebuild_above),
        cleanup_above: patch.cleanup_above.unwrap_or(base.cleanup_above),
    })
}
