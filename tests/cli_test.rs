// Integration tests for the `simuart` binary.
//
// These tests verify that:
// 1. `--help` and bad arguments exit promptly
// 2. A running node echoes what a peer sends
// 3. SIGTERM shuts the node down cleanly and removes its socket file

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_simuart"))
}

/// Wait for process to exit with timeout
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    return None;
                }
                thread::sleep(Duration::from_millis(20));
            }
            Err(_) => return None,
        }
    }
}

fn wait_for_socket(path: &Path) {
    let start = Instant::now();
    while !path.exists() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "socket {} never appeared",
            path.display()
        );
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_help_command_exits_immediately() {
    let output = binary().arg("--help").output().expect("Failed to run --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--base-dir"), "help missing --base-dir: {stdout}");
}

#[test]
fn test_invalid_node_id_fails() {
    let output = binary()
        .arg("not-hex")
        .env_remove("UDSPATH")
        .stderr(Stdio::null())
        .output()
        .expect("Failed to run simuart");
    assert!(!output.status.success());
}

#[test]
fn test_echo_and_sigterm_shutdown() {
    let tmp = tempfile::TempDir::new().unwrap();
    let socket = tmp.path().join("00a1.sock");

    let mut child = binary()
        .arg("0xa1")
        .env("UDSPATH", tmp.path())
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn simuart");

    wait_for_socket(&socket);

    let mut peer = UnixStream::connect(&socket).unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    peer.write_all(b"ping").unwrap();
    let mut buf = [0u8; 4];
    peer.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ping");

    // SAFETY: signalling our own child process.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
    let status = wait_with_timeout(&mut child, Duration::from_secs(5));
    if status.is_none() {
        let _ = child.kill();
    }
    let status = status.expect("simuart did not exit after SIGTERM");
    assert!(status.success(), "unexpected exit status: {status:?}");
    assert!(!socket.exists(), "socket file left behind");
}
