//! Seed scenario: a command whose env carries a dangerous-pattern value
//! fails at execution time with `UnsafeEnvironmentVar`, even though the
//! config itself loads cleanly.

use crate::prelude::Project;

#[test]
fn dangerous_env_value_fails_at_execution_not_at_load() {
    let project = Project::empty();
    let config = project.file(
        "config.toml",
        r#"
        version = 1

        [global]
        env_allowlist = ["SAFE"]

        [[group]]
        name = "deploy"
        priority = 1

        [[group.commands]]
        name = "export"
        cmd = "/bin/echo"
        args = ["noop"]
        env = { DANGEROUS = "value; rm -rf /" }
        "#,
    );

    project
        .warden()
        .args(&["--config", config.to_str().unwrap(), "--run-id", "r1"])
        .fails()
        .exit_code_is(1)
        .stderr_has("unsafe environment variable");
}
