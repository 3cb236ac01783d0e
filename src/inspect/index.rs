#![allow(missing_docs)]

use serde::Serialize;
use tracing::debug;

use crate::analysis::health::{
    assess_bloat, density_tier, BloatAssessment, BloatInputs, DensityTier, PageFill, Severity,
};
use crate::analysis::keys::{decode_key, DecodedKey, KeyLayout};
use crate::inspect::options::HealthPolicy;
use crate::inspect::util::percent;
use crate::types::snapshot::{IndexItemRecord, IndexPageSnapshot, IndexStatsRecord};
use crate::types::{PageId, PageMetrics, PhysicalPointer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPageKind {
    Leaf,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexPageReport {
    pub page_id: PageId,
    pub page_type: String,
    pub kind: IndexPageKind,
    pub level: u32,
    /// Left sibling, if any.
    pub prev_page: Option<PageId>,
    /// Right sibling; `None` on the rightmost page.
    pub next_page: Option<PageId>,
    /// Upper bound of the keys on this page; `None` means unbounded (`+∞`).
    pub high_key: Option<DecodedKey>,
    pub items: Vec<IndexItemView>,
    pub live_count: u32,
    pub dead_count: u32,
    pub min_key: Option<i32>,
    pub max_key: Option<i32>,
    pub metrics: PageMetrics,
    pub fill: PageFill,
    pub tier: DensityTier,
}

impl IndexPageReport {
    pub fn is_rightmost(&self) -> bool {
        self.next_page.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexItemView {
    pub offset: u32,
    pub key: DecodedKey,
    /// Heap tuple on leaves, child page on internal pages.
    pub pointer: Option<PhysicalPointer>,
    pub item_len: u32,
    pub dead: bool,
}

impl IndexItemView {
    fn from_record(record: &IndexItemRecord, layout: KeyLayout) -> Self {
        Self {
            offset: record.item_offset,
            key: decode_key(&record.data, layout),
            pointer: record.ctid.parse().ok(),
            item_len: record.item_len,
            dead: record.dead,
        }
    }
}

/// Builds the presentation report for one B-tree page.
///
/// On every page but the rightmost of its level the first item is the high
/// key, not data, and is reported separately.
pub fn index_page_report(
    snapshot: &IndexPageSnapshot,
    layout: KeyLayout,
    policy: &HealthPolicy,
) -> IndexPageReport {
    let stats = &snapshot.stats;
    let page_id = PageId(stats.block_no);
    let has_right_sibling = stats.btpo_next != 0;

    let (high_key, data_items) = match snapshot.items.split_first() {
        Some((first, rest)) if has_right_sibling => (Some(decode_key(&first.data, layout)), rest),
        _ => (None, snapshot.items.as_slice()),
    };

    let items: Vec<IndexItemView> = data_items
        .iter()
        .map(|record| IndexItemView::from_record(record, layout))
        .collect();

    let dead_count = items.iter().filter(|item| item.dead).count();
    let live_count = items.len() - dead_count;
    let int_keys = items.iter().filter_map(|item| item.key.as_int());
    let min_key = int_keys.clone().min();
    let max_key = int_keys.max();

    let used = stats.page_size.saturating_sub(stats.free_size);
    let metrics = PageMetrics {
        density: percent(f64::from(used), f64::from(stats.page_size)),
        live_count: u32::try_from(live_count).unwrap_or(u32::MAX),
        dead_count: u32::try_from(dead_count).unwrap_or(u32::MAX),
    };

    debug!(
        page = %page_id,
        level = stats.btpo_level,
        items = items.len(),
        dead = dead_count,
        "built index page report"
    );

    IndexPageReport {
        page_id,
        page_type: stats.page_type.clone(),
        kind: if stats.btpo_level == 0 {
            IndexPageKind::Leaf
        } else {
            IndexPageKind::Internal
        },
        level: stats.btpo_level,
        prev_page: (stats.btpo_prev != 0).then_some(PageId(stats.btpo_prev)),
        next_page: has_right_sibling.then_some(PageId(stats.btpo_next)),
        high_key,
        items,
        live_count: metrics.live_count,
        dead_count: metrics.dead_count,
        min_key,
        max_key,
        metrics,
        fill: metrics.fill(&policy.fill),
        tier: metrics.tier(&policy.tier),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexBloatReport {
    pub tree_level: u32,
    pub index_size: u64,
    pub total_pages: u64,
    pub internal_pages: u64,
    pub leaf_pages: u64,
    pub empty_pages: u64,
    pub deleted_pages: u64,
    pub avg_leaf_density: f64,
    pub leaf_fragmentation: f64,
    pub leaf_tier: DensityTier,
    pub assessment: BloatAssessment,
    pub severity: Severity,
    pub label: &'static str,
    pub advice: &'static str,
}

/// Estimates bloat for a whole index from its aggregate statistics.
pub fn index_bloat_report(stats: &IndexStatsRecord, policy: &HealthPolicy) -> IndexBloatReport {
    let inputs = BloatInputs {
        internal_pages: stats.internal_pages,
        leaf_pages: stats.leaf_pages,
        empty_pages: stats.empty_pages,
        deleted_pages: stats.deleted_pages,
        avg_leaf_density: stats.avg_leaf_density,
        relation_size: stats.index_size,
    };
    let assessment = assess_bloat(&inputs, policy.target_leaf_density, &policy.index_bloat);
    let recommendation = assessment.recommendation;

    debug!(
        bloat_pct = assessment.estimated_bloat_pct,
        recommendation = %recommendation,
        "built index bloat report"
    );

    IndexBloatReport {
        tree_level: stats.tree_level,
        index_size: stats.index_size,
        total_pages: inputs.total_pages(),
        internal_pages: stats.internal_pages,
        leaf_pages: stats.leaf_pages,
        empty_pages: stats.empty_pages,
        deleted_pages: stats.deleted_pages,
        avg_leaf_density: stats.avg_leaf_density,
        leaf_fragmentation: stats.leaf_fragmentation,
        leaf_tier: density_tier(stats.avg_leaf_density, &policy.tier),
        assessment,
        severity: recommendation.severity(),
        label: recommendation.label(),
        advice: recommendation.advice(),
    }
}
