mod common;

use common::{init_repo_with_commit, Harness};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn hooks_install_then_status_then_uninstall() {
    let harness = Harness::new();
    let repo = TempDir::new().unwrap();
    init_repo_with_commit(repo.path());

    harness
        .cmd_in(repo.path())
        .current_dir(repo.path())
        .args(["hooks", "install"])
        .assert()
        .success();

    assert!(repo.path().join(".git/hooks/pre-commit").exists());

    harness
        .cmd_in(repo.path())
        .current_dir(repo.path())
        .args(["hooks", "status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pre-commit\":true"));

    harness
        .cmd_in(repo.path())
        .current_dir(repo.path())
        .args(["hooks", "uninstall"])
        .assert()
        .success();

    harness
        .cmd_in(repo.path())
        .current_dir(repo.path())
        .args(["hooks", "status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pre-commit\":false"));
}

#[test]
fn queue_status_is_empty_on_fresh_home() {
    let harness = Harness::new();
    harness
        .cmd()
        .args(["queue", "status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending\":0"))
        .stdout(predicate::str::contains("\"dead_letter\":0"));
}

#[test]
fn queue_process_is_a_no_op_with_nothing_queued() {
    let harness = Harness::new();
    harness
        .cmd()
        .args(["queue", "process"])
        .assert()
        .success()
        .stdout(predicate::str::contains("processed 0 job(s)"));
}
