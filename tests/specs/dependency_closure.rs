//! Seed scenario: `--groups` selects the dependency closure of the named
//! groups, not just the named groups themselves, and runs that closure
//! in priority order.

use crate::prelude::Project;

#[test]
fn filtering_by_name_pulls_in_its_dependency_closure() {
    let project = Project::empty();
    let config = project.file(
        "config.toml",
        r#"
        version = 1

        [[group]]
        name = "G1"
        priority = 1

        [[group.commands]]
        name = "only"
        cmd = "/bin/echo"
        args = ["G1-ran"]

        [[group]]
        name = "G2"
        priority = 2

        [[group.commands]]
        name = "only"
        cmd = "/bin/echo"
        args = ["G2-ran"]

        [[group]]
        name = "G3"
        priority = 3
        depends_on = ["G1"]

        [[group.commands]]
        name = "only"
        cmd = "/bin/echo"
        args = ["G3-ran"]
        "#,
    );

    project
        .warden()
        .args(&["--config", config.to_str().unwrap(), "--run-id", "r1", "--groups", "G3"])
        .passes();

    assert_eq!(project.summary_lines_for("G1").len(), 1, "G1 is a dependency of G3 and must run");
    assert_eq!(project.summary_lines_for("G3").len(), 1);
    assert!(project.summary_lines_for("G2").is_empty(), "G2 was not selected and has no dependency on it");

    let log = project.summary_log();
    let g1_pos = log.find("\"group\":\"G1\"").unwrap();
    let g3_pos = log.find("\"group\":\"G3\"").unwrap();
    assert!(g1_pos < g3_pos, "G1 must run before G3");
}
