//! Seed scenario: a group whose `verify_files` entry has a mismatched
//! pre-seeded digest is skipped, but the run continues into later
//! groups rather than aborting the whole batch. The process still exits
//! nonzero (spec.md §6 exit code 3) so the failure isn't silently lost.

use crate::prelude::Project;
use warden_verify::FileHashStore;

#[test]
fn verification_failure_skips_its_group_but_the_run_continues() {
    let project = Project::empty();
    let target = project.file("artifact.bin", "current contents");

    let store = FileHashStore::new(project.hash_store_root());
    store.record(&target, "stale-digest-that-will-never-match").unwrap();

    let config = project.file(
        "config.toml",
        &format!(
            r#"
            version = 1

            [[group]]
            name = "verify-group"
            priority = 1
            verify_files = ["{target}"]

            [[group.commands]]
            name = "build"
            cmd = "/bin/echo"
            args = ["should-not-run"]

            [[group]]
            name = "after"
            priority = 2

            [[group.commands]]
            name = "only"
            cmd = "/bin/echo"
            args = ["after-ran"]
            "#,
            target = target.display(),
        ),
    );

    // The batch still runs every group to completion — a verification
    // failure skips just its own group rather than aborting the run — but
    // the process exit code reports the failure rather than hiding it.
    project
        .warden()
        .args(&["--config", config.to_str().unwrap(), "--run-id", "r1"])
        .fails()
        .exit_code_is(3);

    let log = project.summary_log();
    let verify_line = project.summary_lines_for("verify-group");
    assert_eq!(verify_line.len(), 1);
    assert!(verify_line[0].contains("\"status\":\"ERROR\""));

    let after_line = project.summary_lines_for("after");
    assert_eq!(after_line.len(), 1);
    assert!(after_line[0].contains("\"status\":\"SUCCESS\""), "log: {log}");
}
