//! Workspace-level test harness for driving the `proxd` binary end to end
//! (SPEC_FULL §8 Scenarios): writes a scratch `prox.yaml`, spawns the real
//! binary under `assert_cmd::cargo::cargo_bin`, and polls its admin API
//! over `reqwest::blocking`, in the teacher's "drive the CLI, poll for
//! convergence" integration-test style.

use std::io::Write;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

/// Grab an ephemeral port by binding to port 0 and releasing it. Good
/// enough for test isolation; a concurrent bind stealing it between here
/// and the child's own bind is vanishingly unlikely for our purposes.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port").local_addr().expect("local_addr").port()
}

pub struct Proxd {
    child: Child,
    _dir: tempfile::TempDir,
    pub api_port: u16,
}

impl Proxd {
    /// Write `config_yaml` to a scratch directory and start `proxd` against
    /// it. `config_yaml` must not set `api.port`; this harness picks one and
    /// appends it so tests don't collide.
    pub fn start(config_yaml: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let api_port = free_port();
        let config_path = dir.path().join("prox.yaml");
        let mut file = std::fs::File::create(&config_path).expect("create prox.yaml");
        writeln!(file, "{config_yaml}").expect("write prox.yaml");
        writeln!(file, "api:\n  host: \"127.0.0.1\"\n  port: {api_port}").expect("append api block");
        drop(file);

        let bin: PathBuf = assert_cmd::cargo::cargo_bin("proxd");
        let child = Command::new(bin)
            .arg("--config")
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .current_dir(dir.path())
            .spawn()
            .expect("spawn proxd");

        let harness = Self { child, _dir: dir, api_port };
        harness.wait_for_api_up(Duration::from_secs(5));
        harness
    }

    fn wait_for_api_up(&self, timeout: Duration) {
        wait_for(timeout, || self.get_raw("/api/processes").is_some());
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.api_port)
    }

    fn get_raw(&self, path: &str) -> Option<String> {
        reqwest::blocking::get(self.api_url(path)).ok()?.text().ok()
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> T {
        reqwest::blocking::get(self.api_url(path)).expect("GET admin API").json().expect("decode JSON response")
    }

    pub fn post(&self, path: &str) -> reqwest::blocking::Response {
        reqwest::blocking::Client::new().post(self.api_url(path)).send().expect("POST admin API")
    }
}

impl Drop for Proxd {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawn a minimal raw HTTP/1.1 backend that replies `200 ok` with a fixed
/// body to every request, for exercising the proxy's forwarding path
/// without pulling in a full server stack just for a test fixture.
pub fn spawn_echo_backend(body: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind backend");
    let port = listener.local_addr().expect("local_addr").port();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            use std::io::Read;
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let response = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}", body.len());
            let _ = stream.write_all(response.as_bytes());
        }
    });
    port
}

/// Poll `predicate` until it's true or `timeout` elapses, panicking on
/// timeout. Mirrors the "wait for eventual consistency" pattern every
/// scenario in SPEC_FULL §8 needs: the supervisor's state transitions and
/// the proxy's request capture all happen on background tasks.
pub fn wait_for<F: FnMut() -> bool>(timeout: Duration, mut predicate: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}
