#![forbid(unsafe_code)]

//! Core identifiers and records shared by the analysis and inspect layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::health::{
    classify_page, density_tier, DensityTier, FillThresholds, PageFill, TierThresholds,
};

pub mod snapshot;

/// Block number of a page within a relation.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PageId(pub u32);

/// Position of a tuple within a page's item list.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PageId {
    fn from(value: u32) -> Self {
        PageId(value)
    }
}

impl From<PageId> for u32 {
    fn from(value: PageId) -> Self {
        value.0
    }
}

impl From<u32> for SlotId {
    fn from(value: u32) -> Self {
        SlotId(value)
    }
}

impl From<SlotId> for u32 {
    fn from(value: SlotId) -> Self {
        value.0
    }
}

pub mod page {
    //! Fixed page layout sizes used when estimating space usage.

    /// Page size assumed when a snapshot does not carry one.
    pub const DEFAULT_PAGE_SIZE: u32 = 8192;
    /// Bytes taken by the page header.
    pub const PAGE_HEADER_BYTES: u32 = 24;
    /// Bytes taken by one line pointer in the item array.
    pub const LINE_POINTER_BYTES: u32 = 4;
    /// Line pointer flag marking an item as dead.
    pub const LP_DEAD: u8 = 3;
}

/// Physical `(page, slot)` address of a tuple.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct PhysicalPointer {
    /// Page holding the tuple.
    pub page_id: PageId,
    /// Slot of the tuple within that page.
    pub slot_id: SlotId,
}

impl PhysicalPointer {
    /// Builds a pointer from raw page and slot numbers.
    pub const fn new(page: u32, slot: u32) -> Self {
        Self {
            page_id: PageId(page),
            slot_id: SlotId(slot),
        }
    }
}

impl fmt::Display for PhysicalPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.page_id, self.slot_id)
    }
}

/// Error returned when pointer text is not of the form `(page,slot)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid physical pointer '{text}', expected (page,slot)")]
pub struct PointerParseError {
    text: String,
}

impl PointerParseError {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl FromStr for PhysicalPointer {
    type Err = PointerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| PointerParseError::new(s))?;
        let (page_raw, slot_raw) = inner
            .split_once(',')
            .ok_or_else(|| PointerParseError::new(s))?;
        let page = page_raw
            .trim()
            .parse::<u32>()
            .map_err(|_| PointerParseError::new(s))?;
        let slot = slot_raw
            .trim()
            .parse::<u32>()
            .map_err(|_| PointerParseError::new(s))?;
        Ok(Self::new(page, slot))
    }
}

/// One physical version of a logical row, as seen on a single page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tuple {
    /// Slot of this tuple on its page.
    pub slot_id: SlotId,
    /// Raw key bytes as whitespace-separated hex tokens, when the item carries a key.
    pub raw_key_bytes: Option<String>,
    /// Pointer to the newer version. Pointing at itself means there is none;
    /// `None` means the producer sent a pointer that could not be read.
    pub next_version: Option<PhysicalPointer>,
    /// Whether this version is visible (not deleted).
    pub is_live: bool,
    /// Inserting transaction id.
    pub insert_xid: u64,
    /// Deleting transaction id, if any.
    pub delete_xid: Option<u64>,
    /// Stored length in bytes.
    pub byte_length: u32,
}

impl Tuple {
    /// Creates a live tuple at `slot` whose newer version lives at `next_version`.
    pub fn new(slot: u32, next_version: PhysicalPointer) -> Self {
        Self {
            slot_id: SlotId(slot),
            raw_key_bytes: None,
            next_version: Some(next_version),
            is_live: true,
            insert_xid: 0,
            delete_xid: None,
            byte_length: 0,
        }
    }

    /// Returns the slot of the newer version when it is a different tuple on `page`.
    ///
    /// Self-references, off-page pointers and unreadable pointers all yield `None`.
    pub fn successor_on(&self, page: PageId) -> Option<SlotId> {
        let next = self.next_version?;
        if next.page_id == page && next.slot_id != self.slot_id {
            Some(next.slot_id)
        } else {
            None
        }
    }
}

/// Occupancy metrics derived from one page snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PageMetrics {
    /// Percentage of the page occupied, `0..=100`.
    pub density: f64,
    /// Live items or tuples on the page.
    pub live_count: u32,
    /// Dead items or tuples on the page.
    pub dead_count: u32,
}

impl PageMetrics {
    /// Fill bucket of this page.
    pub fn fill(&self, thresholds: &FillThresholds) -> PageFill {
        classify_page(self.density, self.dead_count, thresholds)
    }

    /// Coarse density tier of this page.
    pub fn tier(&self, thresholds: &TierThresholds) -> DensityTier {
        density_tier(self.density, thresholds)
    }
}
