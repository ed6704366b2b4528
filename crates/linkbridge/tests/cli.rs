#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/lbcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn linkbridge() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_linkbridge"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let started = Instant::now();
    while started.elapsed() < timeout {
        if let Some(status) = child.try_wait().expect("child should be pollable") {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(20));
    }
    None
}

fn send(sock: &Path, extra: &[&str]) -> Output {
    linkbridge()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(sock)
        .args(extra)
        .output()
        .expect("send should run")
}

#[test]
fn version_prints_name() {
    let output = linkbridge().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("linkbridge "));
}

#[test]
fn send_to_missing_socket_times_out_with_124() {
    let dir = unique_temp_dir("missing");
    let output = send(
        &dir.join("absent.sock"),
        &["--data", "x", "--connect-timeout", "200ms"],
    );
    assert_eq!(output.status.code(), Some(124));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_sizes_are_usage_errors() {
    let dir = unique_temp_dir("usage");
    let sock = dir.join("x.sock");

    let zero_mtu = send(&sock, &["--data", "x", "--mtu", "0"]);
    assert_eq!(zero_mtu.status.code(), Some(64));

    let small_capacity = send(&sock, &["--data", "x", "--mtu", "512", "--capacity", "256"]);
    assert_eq!(small_capacity.status.code(), Some(64));

    let bad_json = send(&sock, &["--json", "{nope"]);
    assert_eq!(bad_json.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn listen_prints_received_frame_and_exits_after_count() {
    let dir = unique_temp_dir("listen");
    let sock = dir.join("listen.sock");

    let mut listener = linkbridge()
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg(&sock)
        .arg("--count")
        .arg("1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");

    let output = send(&sock, &["--data", "hello listener"]);
    assert!(output.status.success(), "send failed: {output:?}");

    let status = wait_with_timeout(&mut listener, Duration::from_secs(5));
    if status.is_none() {
        let _ = listener.kill();
    }
    let out = listener.wait_with_output().expect("listen output");
    assert!(status.is_some_and(|s| s.success()));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json event"))
        .collect();
    assert_eq!(events[0]["event"], "connected");
    assert_eq!(events[0]["peer"], "peer-1");

    let frame = events
        .iter()
        .find(|event| event["event"] == "frame")
        .expect("one frame printed");
    assert_eq!(frame["payload"], "hello listener");
    assert_eq!(frame["size"], 14);
    assert_eq!(frame["peer"], "peer-1");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn idle_listener_exits_on_interrupt() {
    let dir = unique_temp_dir("interrupt");
    let sock = dir.join("idle.sock");

    let mut listener = linkbridge()
        .arg("listen")
        .arg(&sock)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");

    let started = Instant::now();
    while !sock.exists() && started.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(20));
    }
    // The ctrlc handler is installed before binding.
    let sent = Command::new("kill")
        .arg("-INT")
        .arg(listener.id().to_string())
        .status()
        .expect("kill should run");
    assert!(sent.success());

    let status = wait_with_timeout(&mut listener, Duration::from_secs(3));
    if status.is_none() {
        let _ = listener.kill();
        let _ = listener.wait();
    }
    assert!(status.is_some_and(|s| s.success()), "listener ignored SIGINT");
    assert!(!sock.exists(), "socket file should be removed on exit");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn echo_round_trip_with_wait() {
    let dir = unique_temp_dir("echo");
    let sock = dir.join("echo.sock");

    let mut server = linkbridge()
        .arg("echo")
        .arg(&sock)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("echo should start");

    let output = send(
        &sock,
        &["--json", r#"{"hello":"world"}"#, "--wait", "--wait-timeout", "3s"],
    );

    let _ = server.kill();
    let _ = server.wait();

    assert!(output.status.success(), "send failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value =
        serde_json::from_str(stdout.lines().next().expect("reply printed")).expect("json");
    assert_eq!(value["event"], "frame");
    assert_eq!(value["payload"], r#"{"hello":"world"}"#);
    assert_eq!(value["size"], 17);

    let _ = std::fs::remove_dir_all(&dir);
}
