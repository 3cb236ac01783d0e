//! Presentation state for an interactive front-end.
//!
//! The front-end asks for a snapshot whenever the selection changes and may
//! receive responses out of order. Every request gets a ticket with a
//! monotonically increasing id; only the response for the latest ticket is
//! applied and everything older is dropped as stale.

use serde::Serialize;
use tracing::debug;

use crate::types::snapshot::{
    DensityMapRecord, HeapPageSnapshot, IndexPageSnapshot, IndexStatsRecord, TableDetailRecord,
};
use crate::types::{PageId, PhysicalPointer};

/// What the user is looking at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// A table overview.
    Table {
        /// Table name.
        name: String,
    },
    /// An index overview.
    Index {
        /// Index name.
        name: String,
    },
    /// One page of a table.
    HeapPage {
        /// Table name.
        table: String,
        /// Page within the table.
        page: PageId,
    },
    /// One page of an index.
    IndexPage {
        /// Index name.
        index: String,
        /// Page within the index.
        page: PageId,
    },
}

/// Tab shown for the current selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    /// Summary statistics.
    #[default]
    Overview,
    /// Page or tuple layout.
    Structure,
    /// Density and bloat.
    Health,
}

/// A received snapshot of any supported kind.
#[derive(Clone, Debug)]
pub enum Snapshot {
    /// Heap page contents.
    HeapPage(HeapPageSnapshot),
    /// Index page contents.
    IndexPage(IndexPageSnapshot),
    /// Whole-index statistics.
    IndexStats(IndexStatsRecord),
    /// Table detail.
    Table(TableDetailRecord),
    /// Per-page densities.
    DensityMap(DensityMapRecord),
}

/// Handle for one outstanding snapshot request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    /// Request id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// What happened to a completed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The snapshot became current.
    Applied,
    /// A newer request was issued meanwhile; the snapshot was dropped.
    Stale,
}

/// Current selection, tab, highlight and snapshot.
#[derive(Debug, Default)]
pub struct ViewState {
    selection: Option<Selection>,
    tab: Tab,
    highlight: Option<PhysicalPointer>,
    snapshot: Option<Snapshot>,
    last_issued: u64,
}

impl ViewState {
    /// Empty state with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `selection` current and issues a ticket for its snapshot.
    ///
    /// The previous snapshot and highlight are cleared and the tab resets.
    pub fn begin_fetch(&mut self, selection: Selection) -> FetchTicket {
        self.last_issued += 1;
        self.selection = Some(selection);
        self.snapshot = None;
        self.highlight = None;
        self.tab = Tab::default();
        FetchTicket(self.last_issued)
    }

    /// Applies `snapshot` if `ticket` is the latest one issued.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, snapshot: Snapshot) -> FetchOutcome {
        if ticket.0 != self.last_issued {
            debug!(
                ticket = ticket.0,
                latest = self.last_issued,
                "dropping stale snapshot"
            );
            return FetchOutcome::Stale;
        }
        self.snapshot = Some(snapshot);
        FetchOutcome::Applied
    }

    /// Whether a request is outstanding for the current selection.
    pub fn is_loading(&self) -> bool {
        self.selection.is_some() && self.snapshot.is_none()
    }

    /// Switches the visible tab without refetching.
    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Highlights a tuple, or clears the highlight with `None`.
    pub fn highlight(&mut self, pointer: Option<PhysicalPointer>) {
        self.highlight = pointer;
    }

    /// Current selection.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Visible tab.
    pub fn tab(&self) -> Tab {
        self.tab
    }

    /// Highlighted tuple.
    pub fn highlighted(&self) -> Option<PhysicalPointer> {
        self.highlight
    }

    /// Snapshot for the current selection, once it has arrived.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }
}
