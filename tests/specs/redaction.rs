//! Seed scenario: secret-shaped command output is redacted before it
//! reaches any sink. `WARDEN_REDACTION_PATTERNS` supplies the site-specific
//! value patterns since the config schema carries none.

use crate::prelude::Project;

#[test]
fn secret_shaped_output_is_redacted_in_the_summary_log() {
    let project = Project::empty();
    let config = project.file(
        "config.toml",
        r#"
        version = 1

        [[group]]
        name = "leaky"
        priority = 1

        [[group.commands]]
        name = "emit"
        cmd = "/bin/echo"
        args = ["token=xyz789 password=secretpass"]
        "#,
    );

    project
        .warden()
        .env("WARDEN_REDACTION_PATTERNS", "xyz789,secretpass")
        .args(&["--config", config.to_str().unwrap(), "--run-id", "r1"])
        .passes();

    let log = project.summary_log();
    assert!(log.contains("[REDACTED]"), "log: {log}");
    assert!(!log.contains("xyz789"), "log: {log}");
    assert!(!log.contains("secretpass"), "log: {log}");
}
