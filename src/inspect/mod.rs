#![forbid(unsafe_code)]

//! Report builders over loaded page snapshots.
//!
//! Each builder is a pure function of a snapshot and a [`HealthPolicy`]; it
//! combines key decoding, chain reconstruction and health classification into
//! one serializable report.

mod density;
mod error;
mod heap;
mod index;
mod options;
mod table;
mod util;

/// Per-page density summaries for indexes and tables.
pub use density::{
    density_map_report, DensityMapReport, FillCounts, HeapDensityReport, IndexDensityReport,
    RebuildEstimate, ITEMS_PER_FULL_LEAF,
};

/// Error types for inspect operations.
pub use error::{InspectError, Result};

/// Heap page layout and version chains.
pub use heap::{heap_page_report, HeapPageReport, HeapTupleView};

/// B-tree page contents and whole-index bloat.
pub use index::{
    index_bloat_report, index_page_report, IndexBloatReport, IndexItemView, IndexPageKind,
    IndexPageReport,
};

/// Configurable classification thresholds.
pub use options::HealthPolicy;

/// Table dead-tuple health.
pub use table::{table_health_report, TableHealthReport};

/// Snapshot loading.
pub use util::{load_snapshot, parse_snapshot};
