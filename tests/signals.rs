//! Stopping the `neo` binary with a signal still tears down the persistent
//! worker and its runtime directory.

mod common;

use common::ScratchDir;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        sleep(Duration::from_millis(20));
    }
    done()
}

fn spawn_neo(scratch: &ScratchDir, command: &str) -> Child {
    let config = scratch.child("neo.toml");
    std::fs::write(
        &config,
        format!(
            "[approval]\nrequire_approval = false\n\n\
             [executor]\nmode = \"background\"\nruntime_dir = '{}'\n\n\
             [display]\ncolor = false\n",
            scratch.child("runtime").display()
        ),
    )
    .unwrap();
    Command::new(env!("CARGO_BIN_EXE_neo"))
        .arg("--config")
        .arg(&config)
        .arg(format!("<terminal>{command}</terminal>"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn neo")
}

fn stop_with(signal: Signal, expected_code: i32) {
    let scratch = ScratchDir::new("signal");
    let runtime = scratch.child("runtime");
    let mut neo = spawn_neo(&scratch, "sleep 30");

    let pid_file = runtime.join("worker.pid");
    assert!(
        wait_until(Duration::from_secs(10), || pid_file.exists()),
        "worker never started"
    );
    let worker: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();

    kill(Pid::from_raw(neo.id() as i32), signal).unwrap();
    let mut status = None;
    assert!(wait_until(Duration::from_secs(10), || {
        status = neo.try_wait().unwrap();
        status.is_some()
    }));

    assert_eq!(status.unwrap().code(), Some(expected_code));
    assert!(!runtime.exists());
    assert!(kill(Pid::from_raw(worker), None).is_err());
}

#[test]
fn sigterm_stops_worker_and_removes_runtime_dir() {
    stop_with(Signal::SIGTERM, 143);
}

#[test]
fn sighup_stops_worker_and_removes_runtime_dir() {
    stop_with(Signal::SIGHUP, 129);
}

#[test]
fn sigint_stops_worker_and_removes_runtime_dir() {
    stop_with(Signal::SIGINT, 130);
}
