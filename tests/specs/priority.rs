//! Seed scenario: groups run in ascending priority order regardless of
//! their declaration order in the config.

use crate::prelude::Project;

#[test]
fn groups_execute_in_ascending_priority_order() {
    let project = Project::empty();
    let config = project.file(
        "config.toml",
        r#"
        version = 1

        [[group]]
        name = "A"
        priority = 2

        [[group.commands]]
        name = "only"
        cmd = "/bin/echo"
        args = ["A-ran"]

        [[group]]
        name = "B"
        priority = 1

        [[group.commands]]
        name = "only"
        cmd = "/bin/echo"
        args = ["B-ran"]
        "#,
    );

    project
        .warden()
        .args(&["--config", config.to_str().unwrap(), "--run-id", "r1"])
        .passes();

    let log = project.summary_log();
    let a_pos = log.find("\"group\":\"A\"").expect("A should have a summary entry");
    let b_pos = log.find("\"group\":\"B\"").expect("B should have a summary entry");
    assert!(b_pos < a_pos, "lower-priority group B should run (and log) before A");
}
