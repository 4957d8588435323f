//! SPEC_FULL §8 Scenario S3 (crash): a process that exits non-zero on its
//! own, with no stop ever requested, must be observed as `crashed`.

use crate::support::{wait_for, Proxd};
use serde_json::Value;
use std::time::Duration;

#[test]
fn unexpected_nonzero_exit_is_reported_as_crashed() {
    let proxd = Proxd::start(
        r#"
processes:
  p:
    cmd: "sh -c 'exit 7'"
"#,
    );

    assert!(
        wait_for(Duration::from_secs(2), || {
            let info: Value = proxd.get_json("/api/processes/p");
            info["status"] == "crashed"
        }),
        "process p never reached crashed after exiting 7"
    );

    let logs: Value = proxd.get_json("/api/logs?process=p");
    let lines: Vec<&str> = logs["entries"].as_array().unwrap().iter().map(|e| e["line"].as_str().unwrap()).collect();
    assert!(
        lines.iter().any(|l| l.contains("exited unexpectedly") && l.contains("7")),
        "expected an unexpected-exit log line, got {lines:?}"
    );
}
