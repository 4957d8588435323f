//! SPEC_FULL §8 Scenario S6 (proxy route): a subdomain request is
//! forwarded to its configured backend and recorded in the request store.

use crate::support::{free_port, spawn_echo_backend, wait_for, Proxd};
use serde_json::Value;
use std::time::Duration;

#[test]
fn subdomain_request_is_forwarded_and_recorded() {
    let backend_port = spawn_echo_backend("ok");
    let http_port = free_port();

    let proxd = Proxd::start(&format!(
        r#"
proxy:
  enabled: true
  http_port: {http_port}
  domain: "local.dev"
  services:
    app: {backend_port}
"#
    ));

    let client = reqwest::blocking::Client::builder().build().unwrap();
    let response = wait_for(Duration::from_secs(3), || {
        client
            .get(format!("http://127.0.0.1:{http_port}/path?x=1"))
            .header("Host", "app.local.dev")
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    });
    assert!(response, "proxy never forwarded a successful response");

    let body = client.get(format!("http://127.0.0.1:{http_port}/path?x=1")).header("Host", "app.local.dev").send().unwrap().text().unwrap();
    assert_eq!(body, "ok");

    assert!(
        wait_for(Duration::from_secs(2), || {
            let records: Value = proxd.get_json("/api/proxy/requests");
            records.as_array().map(|a| !a.is_empty()).unwrap_or(false)
        }),
        "no request record was captured"
    );

    let records: Value = proxd.get_json("/api/proxy/requests");
    let record = &records.as_array().unwrap()[0];
    assert_eq!(record["subdomain"], "app");
    assert_eq!(record["method"], "GET");
    assert_eq!(record["status_code"], 200);
    assert_eq!(record["url"], "/path?x=1");
}
