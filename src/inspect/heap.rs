#![allow(missing_docs)]

use serde::Serialize;
use tracing::debug;

use crate::analysis::chains::{reconstruct_chains, VersionChain};
use crate::analysis::health::{DensityTier, PageFill};
use crate::inspect::options::HealthPolicy;
use crate::inspect::util::percent;
use crate::types::page::{LINE_POINTER_BYTES, LP_DEAD, PAGE_HEADER_BYTES};
use crate::types::snapshot::HeapPageSnapshot;
use crate::types::{PageId, PageMetrics, PhysicalPointer, SlotId};

#[derive(Debug, Clone, Serialize)]
pub struct HeapPageReport {
    pub page_id: PageId,
    pub page_size: u32,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub tuple_count: usize,
    pub live_count: u32,
    pub dead_count: u32,
    /// Line pointers flagged dead.
    pub dead_line_pointers: u32,
    /// Heap-only tuples.
    pub hot_count: u32,
    pub metrics: PageMetrics,
    pub fill: PageFill,
    pub tier: DensityTier,
    pub chains: Vec<VersionChain>,
    pub tuples: Vec<HeapTupleView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeapTupleView {
    pub slot: SlotId,
    pub flags: String,
    pub item_len: u32,
    pub xmin: u64,
    pub xmax: Option<u64>,
    /// `None` when the producer's pointer text could not be read.
    pub next_version: Option<PhysicalPointer>,
    pub is_live: bool,
    pub is_hot: bool,
    /// Position in [`HeapPageReport::chains`] of the chain holding this tuple.
    pub chain: Option<usize>,
}

/// Builds the presentation report for one heap page.
pub fn heap_page_report(snapshot: &HeapPageSnapshot, policy: &HealthPolicy) -> HeapPageReport {
    let page_id = snapshot.page_id();
    let page_size = snapshot.stats.page_size;
    let tuples = snapshot.core_tuples();

    let item_bytes: u64 = snapshot.tuples.iter().map(|t| u64::from(t.item_len)).sum();
    let used_bytes = u64::from(PAGE_HEADER_BYTES)
        + u64::from(LINE_POINTER_BYTES) * snapshot.tuples.len() as u64
        + item_bytes;
    let free_bytes = u64::from(page_size).saturating_sub(used_bytes);
    let density = percent(used_bytes as f64, f64::from(page_size));

    let live_count = count(snapshot.tuples.iter().filter(|t| t.is_live));
    let dead_count = count(snapshot.tuples.iter().filter(|t| !t.is_live));
    let dead_line_pointers = count(snapshot.tuples.iter().filter(|t| t.lp_flags == LP_DEAD));
    let hot_count = count(snapshot.tuples.iter().filter(|t| t.is_hot));

    let metrics = PageMetrics {
        density,
        live_count,
        dead_count,
    };
    let chains = reconstruct_chains(page_id, &tuples);

    let views = snapshot
        .tuples
        .iter()
        .zip(&tuples)
        .map(|(record, tuple)| HeapTupleView {
            slot: tuple.slot_id,
            flags: record.lp_flags_str.clone(),
            item_len: record.item_len,
            xmin: tuple.insert_xid,
            xmax: tuple.delete_xid,
            next_version: tuple.next_version,
            is_live: tuple.is_live,
            is_hot: record.is_hot,
            chain: chains
                .iter()
                .position(|chain| chain.slots.contains(&tuple.slot_id)),
        })
        .collect();

    debug!(
        page = %page_id,
        tuples = tuples.len(),
        live = live_count,
        dead = dead_count,
        chains = chains.len(),
        "built heap page report"
    );

    HeapPageReport {
        page_id,
        page_size,
        used_bytes,
        free_bytes,
        tuple_count: tuples.len(),
        live_count,
        dead_count,
        dead_line_pointers,
        hot_count,
        metrics,
        fill: metrics.fill(&policy.heap_fill),
        tier: metrics.tier(&policy.tier),
        chains,
        tuples: views,
    }
}

fn count<I: Iterator>(iter: I) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}
