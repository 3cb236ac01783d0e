#![allow(missing_docs)]

use serde::Serialize;
use tracing::debug;

use crate::analysis::health::{classify_page, DensityHistogram, FillThresholds, PageFill};
use crate::inspect::options::HealthPolicy;
use crate::inspect::util::clamp_count;
use crate::types::snapshot::{DensityMapRecord, HeapPageMapRecord, IndexDensityMapRecord};

/// Integer-key items a fully packed leaf page holds, used for rebuild estimates.
pub const ITEMS_PER_FULL_LEAF: u64 = 400;

/// Pages per fill bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillCounts {
    pub full: u64,
    pub partial: u64,
    pub sparse: u64,
    pub empty: u64,
    pub dead: u64,
}

impl FillCounts {
    fn record(&mut self, fill: PageFill) {
        match fill {
            PageFill::Full => self.full += 1,
            PageFill::Partial => self.partial += 1,
            PageFill::Sparse => self.sparse += 1,
            PageFill::Empty => self.empty += 1,
            PageFill::Dead => self.dead += 1,
        }
    }

    fn tally<I>(pages: I, thresholds: &FillThresholds) -> Self
    where
        I: IntoIterator<Item = (f64, u32)>,
    {
        let mut counts = Self::default();
        for (density, dead) in pages {
            counts.record(classify_page(density, dead, thresholds));
        }
        counts
    }
}

/// Leaf pages a rebuilt index would need, from live item counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildEstimate {
    pub current_leaf_pages: u64,
    pub optimal_leaf_pages: u64,
    pub reclaimable_pages: u64,
}

impl RebuildEstimate {
    pub fn new(current_leaf_pages: u64, live_items: u64) -> Self {
        let optimal_leaf_pages = live_items.div_ceil(ITEMS_PER_FULL_LEAF);
        Self {
            current_leaf_pages,
            optimal_leaf_pages,
            reclaimable_pages: current_leaf_pages.saturating_sub(optimal_leaf_pages),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexDensityReport {
    pub index_name: String,
    pub total_pages: usize,
    pub leaf_pages: usize,
    /// Leaf pages only.
    pub histogram: DensityHistogram,
    pub avg_leaf_density: f64,
    pub live_items: u64,
    pub dead_items: u64,
    pub fill: FillCounts,
    pub rebuild: RebuildEstimate,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeapDensityReport {
    pub table_name: String,
    pub total_pages: usize,
    /// Pages the producer actually scanned.
    pub scanned_pages: usize,
    pub histogram: DensityHistogram,
    pub avg_density: f64,
    pub live_tuples: u64,
    pub dead_tuples: u64,
    pub fill: FillCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "relation", rename_all = "snake_case")]
pub enum DensityMapReport {
    Index(IndexDensityReport),
    Heap(HeapDensityReport),
}

/// Summarises per-page densities of an index or a table.
pub fn density_map_report(map: &DensityMapRecord, policy: &HealthPolicy) -> DensityMapReport {
    match map {
        DensityMapRecord::Index(index) => DensityMapReport::Index(index_density(index, policy)),
        DensityMapRecord::Heap(heap) => DensityMapReport::Heap(heap_density(heap, policy)),
    }
}

fn index_density(map: &IndexDensityMapRecord, policy: &HealthPolicy) -> IndexDensityReport {
    let leaves: Vec<_> = map.pages.iter().filter(|page| page.level == 0).collect();
    let histogram: DensityHistogram = leaves.iter().map(|page| page.density).collect();
    let live_items: u64 = leaves.iter().map(|page| u64::from(page.live_items)).sum();
    let dead_items: u64 = leaves.iter().map(|page| u64::from(page.dead_items)).sum();
    let fill = FillCounts::tally(
        leaves.iter().map(|page| (page.density, page.dead_items)),
        &policy.fill,
    );

    debug!(
        index = %map.index_name,
        pages = map.pages.len(),
        leaves = leaves.len(),
        "built index density report"
    );

    IndexDensityReport {
        index_name: map.index_name.clone(),
        total_pages: map.pages.len(),
        leaf_pages: leaves.len(),
        histogram,
        avg_leaf_density: mean(leaves.iter().map(|page| page.density)),
        live_items,
        dead_items,
        fill,
        rebuild: RebuildEstimate::new(leaves.len() as u64, live_items),
    }
}

fn heap_density(map: &HeapPageMapRecord, policy: &HealthPolicy) -> HeapDensityReport {
    let scanned: Vec<_> = map
        .pages
        .iter()
        .filter(|page| !page.is_placeholder())
        .collect();
    let histogram: DensityHistogram = scanned.iter().map(|page| page.density).collect();
    let live_tuples: u64 = scanned.iter().map(|p| u64::from(clamp_count(p.live_tuples))).sum();
    let dead_tuples: u64 = scanned.iter().map(|p| u64::from(clamp_count(p.dead_tuples))).sum();
    let fill = FillCounts::tally(
        scanned
            .iter()
            .map(|page| (page.density, clamp_count(page.dead_tuples))),
        &policy.heap_fill,
    );

    debug!(
        table = %map.table_name,
        pages = map.pages.len(),
        scanned = scanned.len(),
        "built heap density report"
    );

    HeapDensityReport {
        table_name: map.table_name.clone(),
        total_pages: map.pages.len(),
        scanned_pages: scanned.len(),
        histogram,
        avg_density: mean(scanned.iter().map(|page| page.density)),
        live_tuples,
        dead_tuples,
        fill,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
