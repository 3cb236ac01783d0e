//! Health classification: page fill buckets, density tiers, bloat
//! estimation and maintenance recommendations.
//!
//! Fill buckets and density tiers are independent scales: a page can be
//! `Sparse` and `Low` at the same time, or `Dead` and `High`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::PageMetrics;

/// Cut points for [`classify_page`], in percent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillThresholds {
    /// Lower bound of `Full`.
    pub full: f64,
    /// Lower bound of `Partial`.
    pub partial: f64,
    /// Lower bound of `Sparse`.
    pub sparse: f64,
}

impl Default for FillThresholds {
    fn default() -> Self {
        Self {
            full: 80.0,
            partial: 50.0,
            sparse: 10.0,
        }
    }
}

impl FillThresholds {
    /// Cut points for heap pages, whose sparse bucket starts higher.
    pub const fn heap() -> Self {
        Self {
            full: 80.0,
            partial: 50.0,
            sparse: 20.0,
        }
    }

    /// Whether the cut points are finite and strictly descending.
    pub fn is_ordered(&self) -> bool {
        [self.full, self.partial, self.sparse]
            .iter()
            .all(|v| v.is_finite())
            && self.full > self.partial
            && self.partial > self.sparse
    }
}

/// Cut points for [`density_tier`], in percent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Lower bound of `High`.
    pub high: f64,
    /// Lower bound of `Medium`.
    pub medium: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 70.0,
            medium: 40.0,
        }
    }
}

impl TierThresholds {
    /// Whether the cut points are finite and strictly descending.
    pub fn is_ordered(&self) -> bool {
        self.high.is_finite() && self.medium.is_finite() && self.high > self.medium
    }
}

/// Cut points for [`recommend`]; a value must exceed a bound to cross it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendThresholds {
    /// Above this a rebuild is recommended.
    pub rebuild_above: f64,
    /// Above this a cleanup is recommended.
    pub cleanup_above: f64,
}

impl Default for RecommendThresholds {
    fn default() -> Self {
        Self {
            rebuild_above: 30.0,
            cleanup_above: 10.0,
        }
    }
}

impl RecommendThresholds {
    /// Bounds applied to a table's dead-tuple ratio.
    pub const fn dead_ratio() -> Self {
        Self {
            rebuild_above: 20.0,
            cleanup_above: 5.0,
        }
    }

    /// Whether the bounds are finite and strictly descending.
    pub fn is_ordered(&self) -> bool {
        self.rebuild_above.is_finite()
            && self.cleanup_above.is_finite()
            && self.rebuild_above > self.cleanup_above
    }
}

/// Fill bucket of a single page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFill {
    /// At or above the full bound.
    Full,
    /// At or above the partial bound.
    Partial,
    /// At or above the sparse bound.
    Sparse,
    /// Below every bound.
    Empty,
    /// Holds at least one dead item, whatever its density.
    Dead,
}

impl PageFill {
    /// Lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFill::Full => "full",
            PageFill::Partial => "partial",
            PageFill::Sparse => "sparse",
            PageFill::Empty => "empty",
            PageFill::Dead => "dead",
        }
    }
}

impl fmt::Display for PageFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse density tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityTier {
    /// At or above the high bound.
    High,
    /// At or above the medium bound.
    Medium,
    /// Below both bounds.
    Low,
}

impl DensityTier {
    /// Lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DensityTier::High => "high",
            DensityTier::Medium => "medium",
            DensityTier::Low => "low",
        }
    }
}

impl fmt::Display for DensityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge colour class of a recommendation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Green.
    Good,
    /// Amber.
    Warning,
    /// Red.
    Bad,
}

/// Maintenance action suggested for a relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Nothing to do.
    Ok,
    /// Reclaim dead entries (vacuum).
    Cleanup,
    /// Rebuild the relation compactly (reindex or full vacuum).
    Rebuild,
}

impl Recommendation {
    /// Badge severity.
    pub fn severity(&self) -> Severity {
        match self {
            Recommendation::Ok => Severity::Good,
            Recommendation::Cleanup => Severity::Warning,
            Recommendation::Rebuild => Severity::Bad,
        }
    }

    /// Short badge text.
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::Ok => "Healthy",
            Recommendation::Cleanup => "Needs VACUUM",
            Recommendation::Rebuild => "Needs REINDEX",
        }
    }

    /// One-line explanation.
    pub fn advice(&self) -> &'static str {
        match self {
            Recommendation::Ok => {
                "No action needed. Density and page usage are within acceptable ranges."
            }
            Recommendation::Cleanup => {
                "Dead entries detected. VACUUM reclaims them but does not compact pages."
            }
            Recommendation::Rebuild => {
                "Significant bloat detected. Rebuilding packs the relation into fewer pages."
            }
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Buckets a page by fill percentage. Any dead item makes the page `Dead`.
pub fn classify_page(density: f64, dead_items: u32, thresholds: &FillThresholds) -> PageFill {
    if dead_items > 0 {
        PageFill::Dead
    } else if density >= thresholds.full {
        PageFill::Full
    } else if density >= thresholds.partial {
        PageFill::Partial
    } else if density >= thresholds.sparse {
        PageFill::Sparse
    } else {
        PageFill::Empty
    }
}

/// Coarse tier of a density percentage.
pub fn density_tier(density: f64, thresholds: &TierThresholds) -> DensityTier {
    if density >= thresholds.high {
        DensityTier::High
    } else if density >= thresholds.medium {
        DensityTier::Medium
    } else {
        DensityTier::Low
    }
}

/// Maps an estimated bloat percentage to a maintenance recommendation.
///
/// `dead_tuple_present` raises `Ok` to `Cleanup`; it never raises to `Rebuild`.
pub fn recommend(
    bloat_pct: f64,
    dead_tuple_present: bool,
    thresholds: &RecommendThresholds,
) -> Recommendation {
    if bloat_pct > thresholds.rebuild_above {
        Recommendation::Rebuild
    } else if bloat_pct > thresholds.cleanup_above || dead_tuple_present {
        Recommendation::Cleanup
    } else {
        Recommendation::Ok
    }
}

/// Page counts and sizes feeding [`assess_bloat`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BloatInputs {
    /// Branch pages, including the root.
    pub internal_pages: u64,
    /// Leaf pages in use.
    pub leaf_pages: u64,
    /// Pages holding no items.
    pub empty_pages: u64,
    /// Pages unlinked from the tree but not yet recycled.
    pub deleted_pages: u64,
    /// Mean leaf fill, percent.
    pub avg_leaf_density: f64,
    /// Relation size in bytes.
    pub relation_size: u64,
}

impl BloatInputs {
    /// All pages counted by the estimate.
    pub fn total_pages(&self) -> u64 {
        self.internal_pages + self.leaf_pages + self.empty_pages + self.deleted_pages
    }

    /// Replaces the average leaf density with the mean of `pages`.
    /// An empty slice leaves the inputs unchanged.
    pub fn with_page_metrics(mut self, pages: &[PageMetrics]) -> Self {
        if !pages.is_empty() {
            let sum: f64 = pages.iter().map(|m| m.density).sum();
            self.avg_leaf_density = sum / pages.len() as f64;
        }
        self
    }
}

/// Result of [`assess_bloat`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BloatAssessment {
    /// Share of the relation estimated to be waste, percent.
    pub estimated_bloat_pct: f64,
    /// Relation size scaled by the bloat share.
    pub wasted_bytes: u64,
    /// Pages with no items.
    pub empty_page_count: u64,
    /// Suggested action.
    pub recommendation: Recommendation,
}

/// Estimates how much of a relation is wasted space.
///
/// Empty and deleted pages count fully; leaf pages filled below
/// `target_leaf_density` contribute their shortfall as fractional pages.
pub fn assess_bloat(
    inputs: &BloatInputs,
    target_leaf_density: f64,
    thresholds: &RecommendThresholds,
) -> BloatAssessment {
    let total = inputs.total_pages();
    if total == 0 {
        return BloatAssessment {
            estimated_bloat_pct: 0.0,
            wasted_bytes: 0,
            empty_page_count: inputs.empty_pages,
            recommendation: Recommendation::Ok,
        };
    }

    let density_waste = if inputs.leaf_pages > 0 && inputs.avg_leaf_density < target_leaf_density
    {
        (target_leaf_density - inputs.avg_leaf_density) / 100.0 * inputs.leaf_pages as f64
    } else {
        0.0
    };
    let wasted_pages = (inputs.empty_pages + inputs.deleted_pages) as f64 + density_waste;
    let bloat_pct = wasted_pages / total as f64 * 100.0;
    let wasted_bytes = (inputs.relation_size as f64 * bloat_pct / 100.0) as u64;

    BloatAssessment {
        estimated_bloat_pct: bloat_pct,
        wasted_bytes,
        empty_page_count: inputs.empty_pages,
        recommendation: recommend(bloat_pct, inputs.deleted_pages > 0, thresholds),
    }
}

/// Labels of the histogram buckets, lowest first.
pub const BUCKET_LABELS: [&str; 5] = ["0-20%", "20-40%", "40-60%", "60-80%", "80-100%"];

/// Five-bucket distribution of page densities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DensityHistogram {
    /// Counts per bucket, see [`BUCKET_LABELS`].
    pub buckets: [u64; 5],
    /// Negative or NaN densities.
    pub out_of_range: u64,
}

impl DensityHistogram {
    /// Empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one density. Values at or above 80 land in the last bucket.
    pub fn record(&mut self, density: f64) {
        if density.is_nan() || density < 0.0 {
            self.out_of_range += 1;
            return;
        }
        let index = ((density / 20.0) as usize).min(self.buckets.len() - 1);
        self.buckets[index] += 1;
    }

    /// Densities counted in buckets, excluding out-of-range ones.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Bucket labels paired with counts.
    pub fn labelled(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        BUCKET_LABELS.iter().copied().zip(self.buckets.iter().copied())
    }
}

impl FromIterator<f64> for DensityHistogram {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for density in iter {
            histogram.record(density);
        }
        histogram
    }
}
