//! runner::runner_hooks
//!
//! Test-only hooks for delay and fault injection on the worker path.
//!
//! The hook fires on the blocking thread, immediately before a dispatched
//! store operation executes. Tests use it to stretch one operation and
//! prove that a second request against the same handle cannot observe a
//! torn intermediate state.
//!
//! # Usage
//!
//! ```ignore
//! use repokeep::runner::runner_hooks;
//!
//! runner_hooks::set_before_op(|info| {
//!     if info.op == "init" {
//!         std::thread::sleep(std::time::Duration::from_millis(100));
//!     }
//! });
//!
//! // ... submit requests, drain, assert ordering ...
//!
//! runner_hooks::clear(); // Always clean up!
//! ```
//!
//! # Thread Safety
//!
//! Unlike caller-side hooks, the worker path crosses threads, so the hook
//! is stored process-globally. Tests that install a hook share it with
//! every worker in the process; filter on `info.path` to scope the effect
//! to one test's repositories, and always `clear()` on teardown.
//!
//! # Invariants
//!
//! - Hooks are only available under `cfg(test)` or the `test_hooks` feature
//! - Hooks have zero runtime cost in production builds

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Operation information passed to hooks.
#[derive(Debug, Clone)]
pub struct HookOpInfo {
    /// Operation name: `"open"`, `"init"`, or `"close"`.
    pub op: &'static str,
    /// The path the request runs against (empty for close).
    pub path: PathBuf,
}

type BeforeOp = Arc<dyn Fn(&HookOpInfo) + Send + Sync>;

static BEFORE_OP: Mutex<Option<BeforeOp>> = Mutex::new(None);

/// Install a hook to run before each dispatched store operation.
///
/// Replaces any previously installed hook.
pub fn set_before_op<F>(f: F)
where
    F: Fn(&HookOpInfo) + Send + Sync + 'static,
{
    *BEFORE_OP.lock() = Some(Arc::new(f));
}

/// Remove the installed hook.
///
/// **Important:** always call this in test teardown so the hook cannot
/// leak into other tests in the same process.
pub fn clear() {
    *BEFORE_OP.lock() = None;
}

/// Whether a hook is currently installed.
pub fn has_hooks() -> bool {
    BEFORE_OP.lock().is_some()
}

/// Internal: invoke the hook if set. No-op otherwise.
///
/// The hook is cloned out of the slot before running, so a slow hook
/// never holds the slot lock against other workers.
pub(crate) fn invoke_before_op(op: &'static str, path: &Path) {
    let hook = BEFORE_OP.lock().clone();
    if let Some(hook) = hook {
        let info = HookOpInfo {
            op,
            path: path.to_path_buf(),
        };
        hook(&info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    // The hook slot is process-global, so these tests take turns on it.
    static SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn set_and_clear_hooks() {
        let _serial = SERIAL.lock();
        assert!(!has_hooks());

        set_before_op(|_| {});
        assert!(has_hooks());

        clear();
        assert!(!has_hooks());
    }

    #[test]
    fn hook_receives_op_info() {
        let _serial = SERIAL.lock();
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = Arc::clone(&called);

        // Filter on the probe path: workers from unrelated tests in this
        // process may fire the hook while it is installed.
        set_before_op(move |info| {
            if info.path == Path::new("/tmp/probe") {
                assert_eq!(info.op, "open");
                called_clone.store(true, Ordering::SeqCst);
            }
        });

        invoke_before_op("open", Path::new("/tmp/probe"));
        assert!(called.load(Ordering::SeqCst));

        clear();
    }

    #[test]
    fn no_hook_is_noop() {
        let _serial = SERIAL.lock();
        clear();
        invoke_before_op("close", Path::new(""));
    }
}
