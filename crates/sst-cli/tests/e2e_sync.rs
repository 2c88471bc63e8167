//! E2E sync tests: two data directories converging through a throwaway
//! in-process HTTP snapshot server, plus the `sst watch` loop and the
//! transport/config error contracts.

use assert_cmd::Command;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Start a snapshot server: `GET` returns the last `PUT` body (empty at
/// first). Returns the endpoint URL and the shared body.
fn start_remote() -> (String, Arc<Mutex<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/snapshot", listener.local_addr().expect("addr"));
    let body = Arc::new(Mutex::new(String::new()));
    let shared = Arc::clone(&body);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            handle(stream, &shared);
        }
    });
    (url, body)
}

fn handle(stream: TcpStream, body: &Mutex<String>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone"));
    let mut request_line = String::new();
    reader.read_line(&mut request_line).expect("request line");
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("header");
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().expect("length");
        }
        if line == "\r\n" || line.is_empty() {
            break;
        }
    }
    let mut payload = vec![0; content_length];
    reader.read_exact(&mut payload).expect("body");

    let reply = if request_line.starts_with("PUT") {
        *body.lock().expect("lock") = String::from_utf8(payload).expect("utf8");
        String::new()
    } else {
        body.lock().expect("lock").clone()
    };
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
        reply.len()
    )
    .expect("respond");
}

fn sst_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sst"));
    cmd.arg("--data-dir").arg(dir);
    cmd.env("SST_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd.env_remove("SST_HOME");
    cmd.env_remove("SST_ENDPOINT");
    cmd.env_remove("SST_API_KEY");
    cmd
}

fn synced_cmd(dir: &Path, endpoint: &str) -> Command {
    let mut cmd = sst_cmd(dir);
    cmd.env("SST_ENDPOINT", endpoint);
    cmd.env("SST_API_KEY", "test-key");
    cmd
}

fn json_stdout(mut cmd: Command, args: &[&str]) -> Value {
    let output = cmd.args(args).arg("--json").output().expect("sst should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn error_code(mut cmd: Command, args: &[&str]) -> String {
    let output = cmd.args(args).arg("--json").output().expect("sst should not crash");
    assert!(!output.status.success(), "{args:?} unexpectedly succeeded");
    let err: Value = serde_json::from_slice(&output.stderr).expect("stderr should be JSON");
    err["error"]["error_code"]
        .as_str()
        .expect("error_code present")
        .to_string()
}

fn init(dir: &Path) {
    sst_cmd(dir).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[test]
fn two_devices_converge_through_remote() {
    let (endpoint, remote) = start_remote();
    let a = TempDir::new().expect("tempdir");
    let b = TempDir::new().expect("tempdir");
    init(a.path());
    init(b.path());

    json_stdout(sst_cmd(a.path()), &["--date", "2024-01-10", "comment", "7", "leak"]);
    let first = json_stdout(synced_cmd(a.path(), &endpoint), &["sync"]);
    assert_eq!(first["result"], "synced");
    assert_eq!(first["pending"], 0);
    assert!(!first["last_sync"].is_null());
    assert!(remote.lock().expect("lock").contains("leak"));

    let second = json_stdout(synced_cmd(b.path(), &endpoint), &["sync"]);
    assert_eq!(second["merge"]["records"]["adopted"], 1);
    assert_eq!(second["pending"], 0);

    let shown = json_stdout(sst_cmd(b.path()), &["--date", "2024-01-10", "show", "7"]);
    assert_eq!(shown["comment"], "leak");
    assert_eq!(shown["recorded"], true);

    // B's newer edit wins back on A.
    json_stdout(sst_cmd(b.path()), &["--date", "2024-01-10", "comment", "7", "fixed"]);
    json_stdout(synced_cmd(b.path(), &endpoint), &["sync"]);
    let back = json_stdout(synced_cmd(a.path(), &endpoint), &["sync"]);
    assert_eq!(back["merge"]["records"]["replaced"], 1);
    let shown = json_stdout(sst_cmd(a.path()), &["--date", "2024-01-10", "show", "7"]);
    assert_eq!(shown["comment"], "fixed");
}

#[test]
fn unit_meta_bootstraps_a_fresh_device() {
    let (endpoint, remote) = start_remote();
    let a = TempDir::new().expect("tempdir");
    let b = TempDir::new().expect("tempdir");
    init(a.path());
    init(b.path());

    json_stdout(sst_cmd(a.path()), &["meta", "12", "--size", "10x15"]);
    json_stdout(synced_cmd(a.path(), &endpoint), &["sync"]);
    assert!(remote.lock().expect("lock").contains("10x15"));

    let pulled = json_stdout(synced_cmd(b.path(), &endpoint), &["sync"]);
    assert!(
        pulled["merge"]["meta_bootstrapped"]
            .as_array()
            .expect("meta list")
            .contains(&Value::from("theme"))
    );
    let meta = json_stdout(sst_cmd(b.path()), &["meta", "12"]);
    assert_eq!(meta["sizes"], serde_json::json!(["10x15"]));
}

#[test]
fn sync_status_counts_unsynced_records() {
    let (endpoint, _remote) = start_remote();
    let dir = TempDir::new().expect("tempdir");
    init(dir.path());

    let fresh = json_stdout(sst_cmd(dir.path()), &["sync-status"]);
    assert_eq!(fresh["configured"], false);
    assert!(fresh["last_sync"].is_null());
    assert_eq!(fresh["pending"], 0);

    json_stdout(sst_cmd(dir.path()), &["--date", "2024-01-10", "toggle", "4", "issue"]);
    json_stdout(sst_cmd(dir.path()), &["--date", "2024-01-11", "toggle", "5", "vacant"]);
    let dirty = json_stdout(synced_cmd(dir.path(), &endpoint), &["sync-status"]);
    assert_eq!(dirty["configured"], true);
    assert_eq!(dirty["pending"], 2);

    json_stdout(synced_cmd(dir.path(), &endpoint), &["sync"]);
    let clean = json_stdout(sst_cmd(dir.path()), &["sync-status"]);
    assert_eq!(clean["pending"], 0);
    assert!(!clean["last_sync"].is_null());
}

#[test]
fn sync_without_endpoint_is_a_config_error() {
    let dir = TempDir::new().expect("tempdir");
    init(dir.path());
    assert_eq!(error_code(sst_cmd(dir.path()), &["sync"]), "E1003");
}

#[test]
fn unreachable_remote_is_a_transport_error() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        format!("http://{}/snapshot", listener.local_addr().expect("addr"))
    };
    let dir = TempDir::new().expect("tempdir");
    init(dir.path());
    json_stdout(sst_cmd(dir.path()), &["--date", "2024-01-10", "comment", "7", "leak"]);

    assert_eq!(error_code(synced_cmd(dir.path(), &closed), &["sync"]), "E4001");
    let status = json_stdout(sst_cmd(dir.path()), &["sync-status"]);
    assert_eq!(status["pending"], 1);
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

#[test]
fn watch_runs_a_cycle_on_start_and_reports_on_stop() {
    let (endpoint, remote) = start_remote();
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[sync]\ndebounce_secs = 0\nmin_interval_secs = 0\n",
    )
    .expect("write config");
    init(dir.path());
    json_stdout(sst_cmd(dir.path()), &["--date", "2024-01-10", "comment", "3", "door ajar"]);

    let output = synced_cmd(dir.path(), &endpoint)
        .args(["watch", "--json", "--interval-ms", "10", "--max-polls", "3"])
        .output()
        .expect("sst should not crash");
    assert!(
        output.status.success(),
        "watch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let events: Vec<Value> = String::from_utf8(output.stdout)
        .expect("utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSON line"))
        .collect();
    let first = events.first().expect("at least one event");
    assert_eq!(first["event"], "cycle");
    assert_eq!(first["result"], "succeeded");
    assert_eq!(first["pending"], 0);

    let last = events.last().expect("summary");
    assert_eq!(last["event"], "stopped");
    assert_eq!(last["runs"], 1);
    assert_eq!(last["failures"], 0);
    assert_eq!(last["last_trigger"], "foreground");
    assert!(remote.lock().expect("lock").contains("door ajar"));
}
