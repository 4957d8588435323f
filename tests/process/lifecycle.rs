//! SPEC_FULL §8 Scenario S1 (graceful stop), driven against the real
//! `proxd` binary instead of a `FakeClock`-backed unit test.

use crate::support::{wait_for, Proxd};
use serde_json::Value;
use std::time::Duration;

#[test]
fn graceful_stop_delivers_sigterm_and_reaches_stopped() {
    let proxd = Proxd::start(
        r#"
processes:
  p:
    cmd: "sh -c 'trap \"echo bye; exit 0\" TERM; sleep 30'"
"#,
    );

    assert!(
        wait_for(Duration::from_secs(3), || {
            let info: Value = proxd.get_json("/api/processes/p");
            info["status"] == "running"
        }),
        "process p never reached running"
    );

    let resp = proxd.post("/api/processes/p/stop");
    assert!(resp.status().is_success(), "stop call failed: {}", resp.status());

    assert!(
        wait_for(Duration::from_secs(5), || {
            let info: Value = proxd.get_json("/api/processes/p");
            info["status"] == "stopped"
        }),
        "process p never reached stopped after a graceful SIGTERM"
    );

    let logs: Value = proxd.get_json("/api/logs?process=p");
    let lines: Vec<&str> = logs["entries"].as_array().unwrap().iter().map(|e| e["line"].as_str().unwrap()).collect();
    assert!(lines.iter().any(|l| l.contains("bye")), "expected the TERM trap's output in the log stream, got {lines:?}");
}
