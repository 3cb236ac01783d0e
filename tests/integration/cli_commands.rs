#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const HEAP_PAGE: &str = r#"{
    "stats": {"blockNo": 0, "pageSize": 8192},
    "tuples": [
        {"lp": 1, "lpFlags": 1, "lpFlagsStr": "NORMAL", "itemLen": 40, "xmin": 5, "ctid": "(0,1)", "isLive": true},
        {"lp": 2, "lpFlags": 1, "lpFlagsStr": "NORMAL", "itemLen": 40, "xmin": 6, "xmax": 7, "ctid": "(0,3)", "isLive": false},
        {"lp": 3, "lpFlags": 1, "lpFlagsStr": "NORMAL", "itemLen": 40, "xmin": 7, "ctid": "(0,3)", "isLive": true, "isHot": true}
    ]
}"#;

const INDEX_STATS: &str = r#"{"treeLevel": 1, "indexSize": 819200, "internalPages": 1,
    "leafPages": 90, "emptyPages": 5, "deletedPages": 4, "avgLeafDensity": 50.0}"#;

struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = dir.path().join("config.toml");
        Self { dir, config }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let output = cargo_bin_cmd!("pagelens")
            .arg("--config")
            .arg(&self.config)
            .args(["--format", "json"])
            .args(args)
            .output()
            .expect("run pagelens");
        assert!(
            output.status.success(),
            "pagelens {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("json output")
    }

    fn run_failing(&self, args: &[&str]) -> String {
        let output = cargo_bin_cmd!("pagelens")
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .assert()
            .code(1)
            .get_output()
            .stderr
            .clone();
        String::from_utf8_lossy(&output).into_owned()
    }
}

#[test]
fn decode_key_reports_integers_and_sentinels() {
    let fx = Fixture::new();
    let json = fx.run_json(&["decode-key", "--width", "4", "FF", "FF", "FF", "FF"]);
    assert_eq!(json["key"]["kind"], "int");
    assert_eq!(json["key"]["value"], -1);
    assert_eq!(json["display"], "-1");

    let json = fx.run_json(&["decode-key", "--width", "2", "FF 7F"]);
    assert_eq!(json["key"]["value"], 32767);

    let json = fx.run_json(&["decode-key"]);
    assert_eq!(json["key"]["kind"], "unbounded_low");
}

#[test]
fn decode_key_text_output() {
    let fx = Fixture::new();
    let output = cargo_bin_cmd!("pagelens")
        .arg("--config")
        .arg(&fx.config)
        .args(["--theme", "plain", "--quiet", "decode-key", "00", "80"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&output);
    assert!(stdout.contains("-32768"), "unexpected output: {stdout}");
}

#[test]
fn heap_page_reports_chain_and_bucket() {
    let fx = Fixture::new();
    let path = fx.write("heap.json", HEAP_PAGE);
    let json = fx.run_json(&["heap-page", path.to_str().expect("utf8 path")]);
    assert_eq!(json["chains"][0]["slots"], serde_json::json!([2, 3]));
    assert_eq!(json["fill"], "dead");
    assert_eq!(json["live_count"], 2);
    assert_eq!(json["dead_count"], 1);
}

#[test]
fn index_bloat_recommends_rebuild() {
    let fx = Fixture::new();
    let path = fx.write("stats.json", INDEX_STATS);
    let json = fx.run_json(&["index-bloat", path.to_str().expect("utf8 path")]);
    assert_eq!(json["assessment"]["recommendation"], "rebuild");
    assert_eq!(json["severity"], "bad");
    assert_eq!(json["label"], "Needs REINDEX");
}

#[test]
fn config_policy_changes_the_verdict() {
    let fx = Fixture::new();
    fs::write(
        &fx.config,
        "[policy.index_bloat]\nrebuild_above = 60.0\ncleanup_above = 10.0\n",
    )
    .expect("write config");
    let path = fx.write("stats.json", INDEX_STATS);
    let json = fx.run_json(&["index-bloat", path.to_str().expect("utf8 path")]);
    assert_eq!(json["assessment"]["recommendation"], "cleanup");
}

#[test]
fn invalid_config_policy_is_rejected() {
    let fx = Fixture::new();
    fs::write(&fx.config, "[policy.tier]\nhigh = 10.0\nmedium = 40.0\n").expect("write config");
    let stderr = fx.run_failing(&["decode-key", "01", "00"]);
    assert!(
        stderr.contains("error: config policy is invalid"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn missing_snapshot_exits_with_error() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("missing.json");
    let stderr = fx.run_failing(&["table-health", missing.to_str().expect("utf8 path")]);
    assert!(stderr.contains("snapshot not found"), "unexpected stderr: {stderr}");
}

#[test]
fn config_init_refuses_to_overwrite() {
    let fx = Fixture::new();
    cargo_bin_cmd!("pagelens")
        .arg("--config")
        .arg(&fx.config)
        .args(["--quiet", "config", "init"])
        .assert()
        .success();
    let written = fs::read_to_string(&fx.config).expect("config written");
    assert!(written.contains("[policy.fill]"), "{written}");
    assert!(written.contains("theme = \"auto\""), "{written}");

    let stderr = fx.run_failing(&["config", "init"]);
    assert!(stderr.contains("--force"), "unexpected stderr: {stderr}");

    cargo_bin_cmd!("pagelens")
        .arg("--config")
        .arg(&fx.config)
        .args(["--quiet", "config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_show_emits_effective_policy() {
    let fx = Fixture::new();
    let json = fx.run_json(&["config", "show"]);
    assert_eq!(json["policy"]["fill"]["full"], 80.0);
    assert_eq!(json["policy"]["table_dead_ratio"]["rebuild_above"], 20.0);
    assert_eq!(json["policy"]["target_leaf_density"], 90.0);
}

#[test]
fn partial_table_section_keeps_table_defaults() {
    let fx = Fixture::new();
    fs::write(&fx.config, "[policy.table_dead_ratio]\ncleanup_above = 3.0\n")
        .expect("write config");
    let json = fx.run_json(&["config", "show"]);
    assert_eq!(json["policy"]["table_dead_ratio"]["rebuild_above"], 20.0);
    assert_eq!(json["policy"]["table_dead_ratio"]["cleanup_above"], 3.0);
    assert_eq!(json["policy"]["index_bloat"]["rebuild_above"], 30.0);
}

#[test]
fn completions_are_generated() {
    let output = cargo_bin_cmd!("pagelens")
        .args(["completions", "bash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("pagelens"));
}
