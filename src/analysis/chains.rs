//! Reconstruction of in-page tuple version chains.
//!
//! Each tuple points at its newer version. Following those pointers from
//! the first tuple that leaves itself yields a chain ordered oldest first.
//! The walk is iterative, skips slots it has already placed, and is bounded
//! so that corrupted pointer data cannot keep it running.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, trace};

use crate::types::{PageId, SlotId, Tuple};

/// Maximum number of pointer hops followed from the first tuple of a chain.
pub const MAX_CHAIN_HOPS: usize = 20;

/// Ordered slots of one logical row's versions on a page, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionChain {
    /// Slots in chain order. Always at least two.
    pub slots: Vec<SlotId>,
    /// Set when the hop bound stopped the walk while an unplaced successor remained.
    pub truncated: bool,
}

impl VersionChain {
    /// Number of versions in the chain.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the chain holds no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Oldest version.
    pub fn head(&self) -> Option<SlotId> {
        self.slots.first().copied()
    }

    /// Newest version reached.
    pub fn tail(&self) -> Option<SlotId> {
        self.slots.last().copied()
    }

    /// Raw slot numbers, handy for display and comparisons.
    pub fn slot_numbers(&self) -> Vec<u32> {
        self.slots.iter().map(|slot| slot.0).collect()
    }
}

/// Reconstructs the version chains of `page` with the default hop bound.
pub fn reconstruct_chains(page: PageId, tuples: &[Tuple]) -> Vec<VersionChain> {
    reconstruct_chains_bounded(page, tuples, MAX_CHAIN_HOPS)
}

/// Reconstructs the version chains of `page`, following at most `max_hops`
/// pointers from each chain's first tuple.
///
/// Chains come back in the order their first tuple appears in `tuples`.
/// Every slot lands in at most one chain and no chain repeats a slot.
pub fn reconstruct_chains_bounded(
    page: PageId,
    tuples: &[Tuple],
    max_hops: usize,
) -> Vec<VersionChain> {
    let mut by_slot: FxHashMap<SlotId, &Tuple> = FxHashMap::default();
    for tuple in tuples {
        by_slot.entry(tuple.slot_id).or_insert(tuple);
    }

    let mut visited: FxHashSet<SlotId> = FxHashSet::default();
    let mut chains = Vec::new();

    for tuple in tuples {
        if visited.contains(&tuple.slot_id) {
            continue;
        }
        // later records for an already indexed slot are ignored
        let is_first = by_slot
            .get(&tuple.slot_id)
            .is_some_and(|kept| std::ptr::eq(*kept, tuple));
        if !is_first {
            continue;
        }
        let Some(first_hop) = tuple.successor_on(page) else {
            continue;
        };

        visited.insert(tuple.slot_id);
        let mut slots = vec![tuple.slot_id];
        let mut truncated = false;
        let mut pending = Some(first_hop);
        let mut hops = 0usize;

        while let Some(target) = pending {
            if hops >= max_hops {
                truncated = by_slot.contains_key(&target) && !visited.contains(&target);
                break;
            }
            let Some(next) = by_slot.get(&target) else {
                trace!(page = %page, slot = %target, "version pointer targets a missing slot");
                break;
            };
            if !visited.insert(target) {
                break;
            }
            slots.push(target);
            hops += 1;
            pending = next.successor_on(page);
        }

        if truncated {
            debug!(
                page = %page,
                head = %tuple.slot_id,
                max_hops,
                "version chain truncated by hop bound"
            );
        }
        if slots.len() >= 2 {
            chains.push(VersionChain { slots, truncated });
        }
    }

    chains
}
