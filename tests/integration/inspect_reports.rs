#![allow(missing_docs)]

use std::fs;

use pagelens::inspect::{
    density_map_report, heap_page_report, index_bloat_report, index_page_report, load_snapshot,
    table_health_report, DensityMapReport, InspectError,
};
use pagelens::types::snapshot::{
    DensityMapRecord, HeapPageSnapshot, IndexPageSnapshot, IndexStatsRecord, TableDetailRecord,
};
use pagelens::{
    decode_key, reconstruct_chains, DecodedKey, DensityTier, HealthPolicy, KeyLayout, KeyWidth,
    PageFill, PageId, Recommendation, Severity,
};
use serde_json::Value;
use tempfile::TempDir;

const HEAP_PAGE: &str = r#"{
    "stats": {"blockNo": 3, "totalPages": 10, "liveTuples": 2, "deadTuples": 1,
              "freeSpace": 7800, "pageSize": 8192, "lpCount": 3, "lpDeadCount": 0},
    "tuples": [
        {"lp": 1, "lpOffset": 8000, "lpFlags": 1, "lpFlagsStr": "NORMAL", "itemLen": 64,
         "xmin": 700, "xmax": 0, "ctid": "(3,1)", "infoMask": ["XMIN_COMMITTED"], "isLive": true,
         "isHot": false, "isUpdated": false, "attrs": {"id": "1"}},
        {"lp": 2, "lpOffset": 7936, "lpFlags": 1, "lpFlagsStr": "NORMAL", "itemLen": 64,
         "xmin": 701, "xmax": 702, "ctid": "(3,3)", "infoMask": null, "isLive": false,
         "isHot": false, "isUpdated": true, "attrs": {"id": "2"}},
        {"lp": 3, "lpOffset": 7872, "lpFlags": 1, "lpFlagsStr": "NORMAL", "itemLen": 64,
         "xmin": 702, "xmax": 0, "ctid": "(3,3)", "isLive": true, "isHot": true}
    ]
}"#;

fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn heap_page_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_fixture(&dir, "heap.json", HEAP_PAGE);
    let snapshot: HeapPageSnapshot = load_snapshot(&path).expect("load heap page");
    let report = heap_page_report(&snapshot, &HealthPolicy::default());

    assert_eq!(report.page_id, PageId(3));
    assert_eq!(report.chains.len(), 1);
    assert_eq!(report.chains[0].slot_numbers(), vec![2, 3]);
    assert_eq!(report.fill, PageFill::Dead);
    assert_eq!((report.live_count, report.dead_count), (2, 1));

    // the same chains come straight out of the core tuples
    let direct = reconstruct_chains(snapshot.page_id(), &snapshot.core_tuples());
    assert_eq!(direct, report.chains);
}

#[test]
fn heap_report_serializes_snake_case() {
    let snapshot: HeapPageSnapshot = serde_json::from_str(HEAP_PAGE).expect("parse");
    let report = heap_page_report(&snapshot, &HealthPolicy::default());
    let json: Value = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["page_id"], 3);
    assert_eq!(json["fill"], "dead");
    assert_eq!(json["chains"][0]["slots"], serde_json::json!([2, 3]));
    assert_eq!(json["chains"][0]["truncated"], false);
    assert_eq!(json["tuples"][2]["next_version"]["slot_id"], 3);
}

#[test]
fn index_page_with_int2_keys() {
    let snapshot: IndexPageSnapshot = serde_json::from_str(
        r#"{
            "stats": {"blockNo": 4, "type": "l", "pageSize": 8192, "freeSize": 1024,
                      "btpoPrev": 0, "btpoNext": 0, "btpoLevel": 0},
            "items": [
                {"itemOffset": 1, "ctid": "(0,1)", "data": "01 00 00 00 00 00 00 00"},
                {"itemOffset": 2, "ctid": "(0,2)", "data": "ff 7f 00 00 00 00 00 00"},
                {"itemOffset": 3, "ctid": "(0,3)", "data": "00 80 00 00 00 00 00 00"}
            ]
        }"#,
    )
    .expect("parse");
    let layout = KeyLayout::little(KeyWidth::Int2);
    let report = index_page_report(&snapshot, layout, &HealthPolicy::default());

    assert!(report.is_rightmost());
    assert_eq!(report.high_key, None);
    assert_eq!(report.min_key, Some(-32768));
    assert_eq!(report.max_key, Some(32767));
    assert_eq!(report.metrics.density, 87.5);
    assert_eq!(report.fill, PageFill::Full);
    assert_eq!(report.tier, DensityTier::High);
}

#[test]
fn bloat_and_table_health_share_recommendation_scale() {
    let stats: IndexStatsRecord = serde_json::from_str(
        r#"{"version": 4, "treeLevel": 1, "indexSize": 819200, "rootBlockNo": 3,
            "internalPages": 1, "leafPages": 98, "emptyPages": 0, "deletedPages": 1,
            "avgLeafDensity": 88.0, "leafFragmentation": 0.0}"#,
    )
    .expect("parse");
    let bloat = index_bloat_report(&stats, &HealthPolicy::default());
    assert_eq!(bloat.assessment.recommendation, Recommendation::Cleanup);
    assert_eq!(bloat.severity, Severity::Warning);

    let detail: TableDetailRecord = serde_json::from_str(
        r#"{"info": {"name": "accounts", "schema": "public", "size": 81920, "totalPages": 10,
                     "rowCount": 100, "deadRows": 40, "indexCount": 1},
            "stats": {"tableLen": 81920, "tupleCount": 100, "tupleLen": 6400, "tuplePercent": 7.8,
                      "deadTupleCount": 40, "deadTupleLen": 2560, "deadTuplePercent": 3.1,
                      "freeSpace": 70000, "freePercent": 85.4}}"#,
    )
    .expect("parse");
    let table = table_health_report(&detail, &HealthPolicy::default());
    assert_eq!(table.recommendation, Recommendation::Rebuild);
    assert_eq!(table.severity, Severity::Bad);
    assert_eq!(table.fill_tier, DensityTier::Low);
}

#[test]
fn custom_policy_moves_the_boundaries() {
    let policy: HealthPolicy = serde_json::from_str(
        r#"{"fill": {"full": 95.0, "partial": 60.0, "sparse": 20.0},
            "table_dead_ratio": {"rebuild_above": 50.0, "cleanup_above": 30.0}}"#,
    )
    .expect("parse policy");
    policy.validate().expect("policy is ordered");

    let detail: TableDetailRecord = serde_json::from_str(
        r#"{"stats": {"tupleCount": 60, "deadTupleCount": 40}}"#,
    )
    .expect("parse");
    assert_eq!(
        table_health_report(&detail, &policy).recommendation,
        Recommendation::Cleanup
    );
}

#[test]
fn density_map_detects_relation_kind() {
    let index: DensityMapRecord = serde_json::from_str(
        r#"{"indexName": "accounts_pkey", "pages": [
            {"blockNo": 1, "level": 0, "type": "l", "density": 12.0, "liveItems": 40, "deadItems": 0}
        ]}"#,
    )
    .expect("parse");
    assert!(matches!(
        density_map_report(&index, &HealthPolicy::default()),
        DensityMapReport::Index(_)
    ));

    let heap: DensityMapRecord = serde_json::from_str(
        r#"{"tableName": "accounts", "pages": null}"#,
    )
    .expect("parse");
    let DensityMapReport::Heap(report) = density_map_report(&heap, &HealthPolicy::default())
    else {
        panic!("expected heap report");
    };
    assert_eq!(report.total_pages, 0);
}

#[test]
fn missing_and_malformed_snapshots() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("nope.json");
    assert!(matches!(
        load_snapshot::<HeapPageSnapshot>(&missing),
        Err(InspectError::MissingSnapshot(_))
    ));

    let bad = write_fixture(&dir, "bad.json", r#"{"tuples": []}"#);
    assert!(matches!(
        load_snapshot::<HeapPageSnapshot>(&bad),
        Err(InspectError::Json { .. })
    ));
}

#[test]
fn decoded_keys_render_for_display() {
    let int4 = KeyLayout::little(KeyWidth::Int4);
    assert_eq!(decode_key("", int4).to_string(), "−∞");
    assert_eq!(decode_key("01 00 00 00", int4), DecodedKey::Int(1));
    assert_eq!(decode_key("FF FF FF FF", int4), DecodedKey::Int(-1));
}
