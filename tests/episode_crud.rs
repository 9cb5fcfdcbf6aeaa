mod common;

use common::Harness;
use serde_json::Value;

fn stdout_json(assert: assert_cmd::assert::Assert) -> Value {
    let out = assert.get_output().stdout.clone();
    serde_json::from_slice(&out).expect("valid json output")
}

#[test]
fn add_show_delete_round_trip() {
    let harness = Harness::new();

    let added = stdout_json(
        harness
            .cmd()
            .args(["add", "--content", "switched the queue to exponential backoff", "--global", "--format", "json"])
            .assert()
            .success(),
    );
    let id = added["id"].as_str().unwrap().to_string();

    let shown = stdout_json(
        harness
            .cmd()
            .args(["show", "--id", &id, "--global", "--format", "json"])
            .assert()
            .success(),
    );
    assert_eq!(shown["id"], id);
    assert!(shown["body"].as_str().unwrap().contains("exponential backoff"));

    let deleted = stdout_json(
        harness
            .cmd()
            .args(["delete", "--id", &id, "--global", "--format", "json"])
            .assert()
            .success(),
    );
    assert_eq!(deleted["deleted"], true);

    harness
        .cmd()
        .args(["show", "--id", &id, "--global"])
        .assert()
        .code(1);
}

#[test]
fn compact_drops_exact_duplicate_keeping_newest() {
    let harness = Harness::new();
    let body = "rebuilt the index after the schema migration";

    harness.cmd().args(["add", "--content", body, "--global"]).assert().success();
    // second insertion is a later, identical episode -- the duplicate compact() should drop
    harness.cmd().args(["add", "--content", body, "--global"]).assert().success();

    let listed = stdout_json(
        harness.cmd().args(["list", "--global", "--format", "json"]).assert().success(),
    );
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let compacted = stdout_json(
        harness.cmd().args(["compact", "--global", "--format", "json"]).assert().success(),
    );
    assert_eq!(compacted["removed"], 1);

    let listed = stdout_json(
        harness.cmd().args(["list", "--global", "--format", "json"]).assert().success(),
    );
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
