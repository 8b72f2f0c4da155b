//! runner
//!
//! Background execution and completion delivery for store operations.
//!
//! # Architecture
//!
//! The runner keeps filesystem-bound store operations off the host's
//! logical thread:
//!
//! 1. The host creates a [`TaskRunner`] and obtains [`RepoHandle`]s from it
//! 2. Submissions are validated synchronously, then enqueued on the
//!    handle's dedicated worker
//! 3. The worker executes one store call at a time on a blocking thread
//! 4. Completions queue up until the host pumps them
//!    ([`TaskRunner::drain`], [`TaskRunner::deliver_pending`]); callbacks
//!    run on the pumping thread, never on a worker
//!
//! # Ordering
//!
//! Requests against the same handle execute strictly in submission order;
//! requests against distinct handles have no ordering relative to each
//! other. Cancellation is not supported: once dispatched, a request runs
//! to completion.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> Result<(), repokeep::runner::SubmitError> {
//! use repokeep::runner::TaskRunner;
//!
//! let mut runner = TaskRunner::new();
//! let repo = runner.handle();
//!
//! repo.init_async("/tmp/fresh-repo", false, |done| {
//!     assert!(done.is_ok());
//! })?;
//!
//! runner.drain().await;
//! assert!(repo.is_open());
//! # Ok(())
//! # }
//! ```

mod request;
mod task;

// Test-only hooks for delay and fault injection on the worker path.
// Available under cfg(test) for unit tests, or feature = "test_hooks"
// for integration tests.
#[cfg(any(test, feature = "test_hooks"))]
pub mod runner_hooks;

pub use request::{Completion, Op};
pub use task::{RepoHandle, SubmitError, TaskRunner};
