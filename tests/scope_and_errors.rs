mod common;

use common::Harness;
use predicates::prelude::*;

/// `--global --project` is a bad-argument conflict (exit code 2), not a
/// silent "last flag wins".
#[test]
fn conflicting_scope_flags_exit_two() {
    let harness = Harness::new();
    harness
        .cmd()
        .args(["search", "--query", "anything", "--global", "--project"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("mutually exclusive"));
}

#[test]
fn show_missing_episode_exits_one() {
    let harness = Harness::new();
    harness
        .cmd()
        .args(["show", "--id", "does-not-exist", "--global"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn health_reports_zero_queues_on_fresh_home() {
    let harness = Harness::new();
    harness
        .cmd()
        .args(["health", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending_jobs\":0"));
}
