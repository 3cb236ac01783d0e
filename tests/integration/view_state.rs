#![allow(missing_docs)]

use pagelens::state::{FetchOutcome, Selection, Snapshot, Tab, ViewState};
use pagelens::types::snapshot::{HeapPageSnapshot, IndexStatsRecord};
use pagelens::{PageId, PhysicalPointer};

fn heap_page(table: &str, page: u32) -> Selection {
    Selection::HeapPage {
        table: table.to_string(),
        page: PageId(page),
    }
}

fn heap_snapshot(block: u32) -> Snapshot {
    let mut snapshot = HeapPageSnapshot::default();
    snapshot.stats.block_no = block;
    Snapshot::HeapPage(snapshot)
}

#[test]
fn latest_response_is_applied() {
    let mut state = ViewState::new();
    let ticket = state.begin_fetch(heap_page("orders", 0));
    assert!(state.is_loading());
    assert_eq!(state.complete_fetch(ticket, heap_snapshot(0)), FetchOutcome::Applied);
    assert!(!state.is_loading());
    assert!(matches!(state.snapshot(), Some(Snapshot::HeapPage(s)) if s.stats.block_no == 0));
}

#[test]
fn out_of_order_responses_are_dropped() {
    let mut state = ViewState::new();
    let first = state.begin_fetch(heap_page("orders", 0));
    let second = state.begin_fetch(heap_page("orders", 1));

    // the newer request answers first
    assert_eq!(state.complete_fetch(second, heap_snapshot(1)), FetchOutcome::Applied);
    assert_eq!(state.complete_fetch(first, heap_snapshot(0)), FetchOutcome::Stale);

    assert_eq!(state.selection(), Some(&heap_page("orders", 1)));
    assert!(matches!(state.snapshot(), Some(Snapshot::HeapPage(s)) if s.stats.block_no == 1));
}

#[test]
fn stale_response_never_fills_a_new_selection() {
    let mut state = ViewState::new();
    let old = state.begin_fetch(Selection::Index {
        name: "orders_pkey".into(),
    });
    state.begin_fetch(Selection::Table {
        name: "orders".into(),
    });
    let outcome = state.complete_fetch(old, Snapshot::IndexStats(IndexStatsRecord::default()));
    assert_eq!(outcome, FetchOutcome::Stale);
    assert!(state.snapshot().is_none());
    assert!(state.is_loading());
}

#[test]
fn tab_and_highlight_survive_until_next_selection() {
    let mut state = ViewState::new();
    let ticket = state.begin_fetch(heap_page("orders", 2));
    state.complete_fetch(ticket, heap_snapshot(2));
    state.set_tab(Tab::Structure);
    state.highlight(Some(PhysicalPointer::new(2, 5)));
    assert_eq!(state.tab(), Tab::Structure);
    assert_eq!(state.highlighted(), Some(PhysicalPointer::new(2, 5)));

    state.highlight(None);
    assert_eq!(state.highlighted(), None);

    state.begin_fetch(heap_page("orders", 3));
    assert_eq!(state.tab(), Tab::Overview);
}
