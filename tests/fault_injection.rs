//! Delay-injection tests for same-handle serialization.
//!
//! Run with `cargo test --features test_hooks`. The runner hooks stretch
//! one operation on the worker path so a second request against the same
//! handle would observe a torn intermediate state if serialization were
//! broken.

#![cfg(feature = "test_hooks")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use repokeep::runner::{runner_hooks, Completion, TaskRunner};

// The hook slot is process-global; these tests take turns on it.
static SERIAL: Mutex<()> = Mutex::new(());

#[tokio::test]
async fn slow_init_cannot_be_overtaken_by_open() {
    let _serial = SERIAL.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("repo");

    // Stretch the init so the open, submitted immediately after, has
    // every opportunity to jump the queue if it were going to.
    let slow_path = path.clone();
    runner_hooks::set_before_op(move |info| {
        if info.op == "init" && info.path == slow_path {
            std::thread::sleep(Duration::from_millis(150));
        }
    });

    let mut runner = TaskRunner::new();
    let repo = runner.handle();

    let seen: Arc<Mutex<Vec<Completion>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    repo.init_async(&path, false, move |done| {
        sink.lock().unwrap().push(done);
    })
    .unwrap();
    let sink = Arc::clone(&seen);
    repo.open_async(&path, move |done| {
        sink.lock().unwrap().push(done);
    })
    .unwrap();

    runner.drain().await;
    runner_hooks::clear();

    let completions = seen.lock().unwrap();
    let ops: Vec<&str> = completions.iter().map(|c| c.op.name()).collect();
    assert_eq!(ops, ["init", "open"]);
    // The open found the finished repository, not a half-initialized one.
    assert!(completions.iter().all(Completion::is_ok));
    assert!(repo.is_open());
}

#[tokio::test]
async fn slow_close_cannot_be_overtaken_by_reopen() {
    let _serial = SERIAL.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("repo");

    let mut runner = TaskRunner::new();
    let repo = runner.handle();

    repo.init_sync(&path, false).unwrap();

    runner_hooks::set_before_op(|info| {
        if info.op == "close" {
            std::thread::sleep(Duration::from_millis(150));
        }
    });

    let seen: Arc<Mutex<Vec<Completion>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    repo.close_async(move |done| {
        sink.lock().unwrap().push(done);
    })
    .unwrap();
    let sink = Arc::clone(&seen);
    repo.open_async(&path, move |done| {
        sink.lock().unwrap().push(done);
    })
    .unwrap();

    runner.drain().await;
    runner_hooks::clear();

    let completions = seen.lock().unwrap();
    let ops: Vec<&str> = completions.iter().map(|c| c.op.name()).collect();
    assert_eq!(ops, ["close", "open"]);
    assert!(completions.iter().all(Completion::is_ok));
    // Had the reopen run first, the close after it would have left the
    // handle empty. Submission order won.
    assert!(repo.is_open());
}
