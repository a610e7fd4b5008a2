//! Seed scenario: `--dry-run` records the operations it would have
//! performed as structured JSON on stdout, without spawning anything.

use crate::prelude::Project;

#[test]
fn dry_run_prints_an_analysis_with_no_side_effects() {
    let project = Project::empty();
    let config = project.file(
        "config.toml",
        r#"
        version = 1

        [[group]]
        name = "build"
        priority = 1

        [[group.commands]]
        name = "compile"
        cmd = "make"
        args = ["all"]
        "#,
    );

    let run = project
        .warden()
        .args(&["--config", config.to_str().unwrap(), "--run-id", "r1", "--dry-run"])
        .passes();

    let parsed: serde_json::Value = serde_json::from_str(&run.stdout()).expect("stdout should be the dry-run JSON");
    let analyses = parsed["analyses"].as_array().expect("analyses array");
    assert!(!analyses.is_empty());
    assert!(analyses.iter().any(|a| a["kind"] == "OperationExecute" && a["command"] == "make"));

    // `make` was never actually spawned: the runner's temp base was
    // never created because dry-run's resource manager only records
    // intent, it never touches the filesystem.
    assert!(!project.state_path().join("temp").exists());
}
