mod common;

use common::{Sandbox, spawn_feed_server};
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn seed_player(sandbox: &Sandbox) {
    fs::create_dir_all(&sandbox.players_dir).expect("mkdir players");
    let seeded = serde_json::json!({
        "fc": "1111-2222-3333",
        "name": "Ann",
        "vr_history": [
            {"date": "2025-11-01T00:00:00.000Z", "vrChange": 4000, "totalVR": 4000},
            {"date": "2026-01-09T00:00:00.000Z", "vrChange": 1000, "totalVR": 5000}
        ],
        "discord": "linked:abc"
    });
    fs::write(
        sandbox.players_dir.join("1111-2222-3333.json"),
        serde_json::to_string_pretty(&seeded).expect("encode"),
    )
    .expect("write seed");
}

#[test]
fn update_appends_live_rows_prunes_and_is_repeatable() {
    let tmp = tempdir().expect("tempdir");
    let sandbox = Sandbox::new(tmp.path());
    seed_player(&sandbox);

    let body = serde_json::json!({"results": [
        {"timestamp": 1_767_960_000_i64, "data": {
            "x": {"fc": "1111-2222-3333", "name": "", "ev": 5060},
            "y": {"fc": "7777/8888", "name": "Cid", "vr": "6100"}
        }},
        {"timestamp": 1_767_960_600_i64, "data": "{broken"}
    ]})
    .to_string();
    let rows = serde_json::to_string(&body).expect("encode body");
    let discord =
        serde_json::json!({"1111-2222-3333": "not_linked", "7777/8888": "not_linked"}).to_string();
    let base_url = spawn_feed_server(rows, discord);

    sandbox
        .command()
        .env("VR_FEED_BASE_URL", &base_url)
        .args(["update", "--now", "2026-01-10T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("loaded=1"))
        .stdout(predicate::str::contains("feed.rows=1"))
        .stdout(predicate::str::contains("feed.rows_skipped=1"))
        .stdout(predicate::str::contains("stats.entries_pruned=1"))
        .stderr(predicate::str::contains("code=FEED_ROW_SKIPPED"));

    let ann = sandbox.read_player("1111-2222-3333.json");
    assert_eq!(ann["name"], "Ann");
    assert_eq!(ann["discord"], "linked:abc");
    let history = ann["vr_history"].as_array().expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["date"], "2026-01-09T00:00:00.000Z");
    assert_eq!(history[1]["vrChange"], 60);
    assert_eq!(ann["vrStats"]["last24Hours"], 60);

    let cid = sandbox.read_player("7777_8888.json");
    assert_eq!(cid["fc"], "7777/8888");
    assert_eq!(cid["discord"], "not_linked");
    assert_eq!(cid["vr_history"][0]["vrChange"], 6100);

    let first = fs::read_to_string(sandbox.players_dir.join("1111-2222-3333.json")).expect("read");
    sandbox
        .command()
        .env("VR_FEED_BASE_URL", &base_url)
        .args(["update", "--now", "2026-01-10T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("live.entries_added=0"));
    let second = fs::read_to_string(sandbox.players_dir.join("1111-2222-3333.json")).expect("read");
    assert_eq!(first, second);
}

#[test]
fn update_with_malformed_feed_keeps_base_data() {
    let tmp = tempdir().expect("tempdir");
    let sandbox = Sandbox::new(tmp.path());
    seed_player(&sandbox);
    let base_url = spawn_feed_server("not json".to_string(), "[]".to_string());

    sandbox
        .command()
        .env("VR_FEED_BASE_URL", &base_url)
        .args(["update", "--now", "2026-01-10T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("feed.rows=0"))
        .stderr(predicate::str::contains("code=FEED_SHAPE_UNRECOGNIZED"))
        .stderr(predicate::str::contains("code=DISCORD_UNAVAILABLE"));

    let ann = sandbox.read_player("1111-2222-3333.json");
    assert_eq!(ann["vr_history"].as_array().expect("history").len(), 1);
    assert_eq!(ann["discord"], "linked:abc");
}

#[test]
fn update_dry_run_leaves_files_untouched() {
    let tmp = tempdir().expect("tempdir");
    let sandbox = Sandbox::new(tmp.path());
    seed_player(&sandbox);
    let before = fs::read_to_string(sandbox.players_dir.join("1111-2222-3333.json")).expect("read");

    sandbox
        .command()
        .env("VR_FEED_BASE_URL", "http://127.0.0.1:9")
        .env("VR_HTTP_TIMEOUT_SECS", "2")
        .args(["update", "--dry-run", "--now", "2026-01-10T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run"));

    let after = fs::read_to_string(sandbox.players_dir.join("1111-2222-3333.json")).expect("read");
    assert_eq!(before, after);
}

#[test]
fn update_requires_feed_base_url() {
    let tmp = tempdir().expect("tempdir");
    let sandbox = Sandbox::new(tmp.path());

    sandbox
        .command()
        .arg("update")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required configuration missing"));
}

#[test]
fn update_rejects_out_of_range_retention() {
    let tmp = tempdir().expect("tempdir");
    let sandbox = Sandbox::new(tmp.path());

    sandbox
        .command()
        .env("VR_FEED_BASE_URL", "http://127.0.0.1:9")
        .env("VR_RETENTION_DAYS", "100000000")
        .arg("update")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid retention days"));
}
