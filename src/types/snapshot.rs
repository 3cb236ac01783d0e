//! Serde records for the JSON snapshots produced by the external page parser.
//!
//! Field names follow the producer's camelCase schema. Unknown fields are
//! ignored and missing optional fields fall back to defaults, so older and
//! newer producers can be read side by side. Lists the producer emits as
//! `null` are read as empty.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::page::DEFAULT_PAGE_SIZE;
use super::{PageId, PhysicalPointer, SlotId, Tuple};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Snapshot of a single heap page and its tuples.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapPageSnapshot {
    /// Page-level counters.
    pub stats: HeapPageStatsRecord,
    /// Tuples in line pointer order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tuples: Vec<HeapTupleRecord>,
}

/// Page-level counters reported for a heap page.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapPageStatsRecord {
    #[serde(default)]
    pub block_no: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub live_tuples: u32,
    #[serde(default)]
    pub dead_tuples: u32,
    #[serde(default)]
    pub free_space: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub lp_count: u32,
    #[serde(default)]
    pub lp_dead_count: u32,
}

impl Default for HeapPageStatsRecord {
    fn default() -> Self {
        Self {
            block_no: 0,
            total_pages: 0,
            live_tuples: 0,
            dead_tuples: 0,
            free_space: 0,
            page_size: DEFAULT_PAGE_SIZE,
            lp_count: 0,
            lp_dead_count: 0,
        }
    }
}

/// One heap tuple with its line pointer and header fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapTupleRecord {
    /// Line pointer (slot) number.
    pub lp: u32,
    #[serde(default)]
    pub lp_offset: u32,
    #[serde(default)]
    pub lp_flags: u8,
    #[serde(default)]
    pub lp_flags_str: String,
    #[serde(default)]
    pub item_len: u32,
    #[serde(default)]
    pub xmin: u64,
    #[serde(default)]
    pub xmax: u64,
    /// Pointer to the newer version in `(page,slot)` text form.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ctid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info_mask: Vec<String>,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub is_hot: bool,
    #[serde(default)]
    pub is_updated: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attrs: BTreeMap<String, String>,
}

impl HeapTupleRecord {
    /// Converts the record into the core tuple representation.
    ///
    /// An unreadable `ctid` becomes `next_version: None`, which chain
    /// reconstruction treats as terminal.
    pub fn to_tuple(&self) -> Tuple {
        Tuple {
            slot_id: SlotId(self.lp),
            raw_key_bytes: None,
            next_version: self.ctid.parse::<PhysicalPointer>().ok(),
            is_live: self.is_live,
            insert_xid: self.xmin,
            delete_xid: (self.xmax != 0).then_some(self.xmax),
            byte_length: self.item_len,
        }
    }
}

impl HeapPageSnapshot {
    /// Block number of the page.
    pub fn page_id(&self) -> PageId {
        PageId(self.stats.block_no)
    }

    /// All tuples converted to the core representation, in slot order.
    pub fn core_tuples(&self) -> Vec<Tuple> {
        self.tuples.iter().map(HeapTupleRecord::to_tuple).collect()
    }
}

/// Snapshot of a single B-tree index page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPageSnapshot {
    /// Page-level counters and sibling links.
    pub stats: IndexPageStatsRecord,
    /// Items in offset order; on non-rightmost pages the first is the high key.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<IndexItemRecord>,
}

/// Page-level counters reported for a B-tree page.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPageStatsRecord {
    #[serde(default)]
    pub block_no: u32,
    /// Page type reported by the producer (`l`, `i`, `r`, ...).
    #[serde(default, rename = "type")]
    pub page_type: String,
    #[serde(default)]
    pub live_items: u32,
    #[serde(default)]
    pub dead_items: u32,
    #[serde(default)]
    pub avg_item_size: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub free_size: u32,
    #[serde(default)]
    pub btpo_prev: u32,
    /// Right sibling; zero on the rightmost page of a level.
    #[serde(default)]
    pub btpo_next: u32,
    #[serde(default)]
    pub btpo_level: u32,
    #[serde(default)]
    pub btpo_flags: u32,
}

impl Default for IndexPageStatsRecord {
    fn default() -> Self {
        Self {
            block_no: 0,
            page_type: String::new(),
            live_items: 0,
            dead_items: 0,
            avg_item_size: 0,
            page_size: DEFAULT_PAGE_SIZE,
            free_size: 0,
            btpo_prev: 0,
            btpo_next: 0,
            btpo_level: 0,
            btpo_flags: 0,
        }
    }
}

/// One item on a B-tree page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexItemRecord {
    #[serde(default)]
    pub item_offset: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ctid: String,
    #[serde(default)]
    pub item_len: u32,
    #[serde(default)]
    pub nulls: bool,
    #[serde(default)]
    pub vars: bool,
    /// Key bytes as whitespace-separated hex tokens.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: String,
    #[serde(default)]
    pub dead: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub htid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tids: String,
}

/// Aggregate statistics for a whole B-tree index.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexStatsRecord {
    pub version: u32,
    pub tree_level: u32,
    /// Index size in bytes.
    pub index_size: u64,
    pub root_block_no: u32,
    pub internal_pages: u64,
    pub leaf_pages: u64,
    pub empty_pages: u64,
    pub deleted_pages: u64,
    pub avg_leaf_density: f64,
    pub leaf_fragmentation: f64,
}

/// Table identity plus tuple-level statistics.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetailRecord {
    #[serde(default)]
    pub info: TableInfoRecord,
    pub stats: TableStatsRecord,
}

/// Catalog-level description of a table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableInfoRecord {
    pub name: String,
    pub schema: String,
    /// Table size in bytes.
    pub size: u64,
    pub total_pages: u64,
    /// Estimated row count; negative when unknown.
    pub row_count: i64,
    pub dead_rows: i64,
    pub index_count: u32,
}

/// Tuple-level statistics for a table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableStatsRecord {
    pub table_len: u64,
    pub tuple_count: u64,
    pub tuple_len: u64,
    pub tuple_percent: f64,
    pub dead_tuple_count: u64,
    pub dead_tuple_len: u64,
    pub dead_tuple_percent: f64,
    pub free_space: u64,
    pub free_percent: f64,
}

/// Per-page densities for an index or a table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DensityMapRecord {
    /// Density of every page of a B-tree index.
    Index(IndexDensityMapRecord),
    /// Density of every page of a heap table.
    Heap(HeapPageMapRecord),
}

/// Density map of a B-tree index.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDensityMapRecord {
    pub index_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: Vec<IndexPageDensityRecord>,
}

/// Density of one B-tree page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexPageDensityRecord {
    pub block_no: u32,
    /// Tree level; zero for leaves.
    pub level: u32,
    #[serde(rename = "type")]
    pub page_type: String,
    pub density: f64,
    pub live_items: u32,
    pub dead_items: u32,
}

/// Density map of a heap table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapPageMapRecord {
    pub table_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: Vec<HeapPageInfoRecord>,
}

/// Density of one heap page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeapPageInfoRecord {
    pub block_no: u32,
    /// Live tuple count; negative for pages the producer did not scan.
    pub live_tuples: i64,
    pub dead_tuples: i64,
    pub free_space: i64,
    pub density: f64,
}

impl HeapPageInfoRecord {
    /// Whether the producer skipped this page and sent a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.live_tuples < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_snapshot_reads_producer_json() {
        let raw = r#"{
            "stats": {"blockNo": 3, "totalPages": 10, "liveTuples": 1, "deadTuples": 1,
                      "freeSpace": 8000, "pageSize": 8192, "lpCount": 2, "lpDeadCount": 0},
            "tuples": [
                {"lp": 1, "lpFlags": 1, "itemLen": 40, "xmin": 700, "xmax": 701,
                 "ctid": "(3,2)", "infoMask": null, "isLive": false, "attrs": null},
                {"lp": 2, "lpFlags": 1, "itemLen": 40, "xmin": 701, "xmax": 0,
                 "ctid": "(3,2)", "isLive": true, "extra": "ignored"}
            ]
        }"#;
        let snapshot: HeapPageSnapshot = serde_json::from_str(raw).expect("parse snapshot");
        assert_eq!(snapshot.page_id(), PageId(3));

        let tuples = snapshot.core_tuples();
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0].next_version, Some(PhysicalPointer::new(3, 2)));
        assert_eq!(tuples[0].delete_xid, Some(701));
        assert!(!tuples[0].is_live);
        assert_eq!(tuples[1].delete_xid, None);
        assert_eq!(tuples[1].byte_length, 40);
    }

    #[test]
    fn unreadable_ctid_becomes_unknown_pointer() {
        let record = HeapTupleRecord {
            lp: 5,
            ctid: "garbage".into(),
            ..HeapTupleRecord::default()
        };
        assert_eq!(record.to_tuple().next_version, None);
    }

    #[test]
    fn missing_page_size_defaults() {
        let snapshot: IndexPageSnapshot =
            serde_json::from_str(r#"{"stats": {"blockNo": 1}, "items": null}"#).expect("parse");
        assert_eq!(snapshot.stats.page_size, DEFAULT_PAGE_SIZE);
        assert!(snapshot.items.is_empty());
    }

    #[test]
    fn density_map_detects_index_and_heap_shapes() {
        let index: DensityMapRecord = serde_json::from_str(
            r#"{"indexName": "users_pkey", "pages": [{"blockNo": 1, "level": 0, "type": "l", "density": 91.5}]}"#,
        )
        .expect("index map");
        assert!(matches!(index, DensityMapRecord::Index(ref map) if map.pages.len() == 1));

        let heap: DensityMapRecord = serde_json::from_str(
            r#"{"tableName": "users", "pages": [{"blockNo": 0, "liveTuples": -1, "density": 50}]}"#,
        )
        .expect("heap map");
        match heap {
            DensityMapRecord::Heap(map) => assert!(map.pages[0].is_placeholder()),
            other => panic!("expected heap map, got {other:?}"),
        }
    }
}
