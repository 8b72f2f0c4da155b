//! runner::task
//!
//! The task runner and the shared repository handle.
//!
//! # Design
//!
//! Every [`RepoHandle`] owns a dedicated worker task. The worker takes
//! requests off the handle's queue one at a time and runs each store call
//! to completion on a blocking thread before looking at the next request.
//! That single-consumer loop is what serializes same-handle operations;
//! there is no lock juggling to get wrong.
//!
//! Completed requests are parked on the runner's delivery queue. The host
//! decides when callbacks run by pumping deliveries from its own logical
//! thread. Between completion and delivery the handle's `pending_ops`
//! count stays non-zero, and the in-flight request holds a strong
//! reference to the handle state, so nothing tears down under a worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{trace, warn};

use super::request::{Callback, Completion, Op, Request};
use crate::core::types::{RepoPath, TypeError};
use crate::store::{code, RepoInfo, RepoStore, StoreError};

/// Errors reported synchronously at submission, before any dispatch.
///
/// This is the only synchronous failure path of the asynchronous API: a
/// request that fails here was never enqueued and its callback will never
/// run. Every accepted request delivers exactly one completion instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The submitted path failed validation.
    #[error("invalid request: {0}")]
    InvalidPath(#[from] TypeError),

    /// The handle's worker task is no longer running.
    #[error("handle worker is no longer running")]
    WorkerGone,
}

/// State shared between a handle, its worker, and in-flight deliveries.
struct HandleShared {
    store: Mutex<RepoStore>,
    pending: AtomicUsize,
}

/// A completed request waiting for the host to pump deliveries.
struct Delivery {
    completion: Completion,
    callback: Callback,
    shared: Arc<HandleShared>,
}

/// Schedules store operations onto background workers and delivers their
/// completions back on the host's logical thread.
///
/// The runner owns the delivery queue. Handles created from it
/// ([`TaskRunner::handle`]) submit work independently; the host pumps
/// completions with [`drain`](TaskRunner::drain) or
/// [`deliver_pending`](TaskRunner::deliver_pending).
///
/// [`outstanding`](TaskRunner::outstanding) exposes the total in-flight
/// count, so an embedding host can refuse to shut down while work is
/// pending instead of relying on hidden scheduler state.
pub struct TaskRunner {
    delivery_tx: mpsc::UnboundedSender<Delivery>,
    delivery_rx: mpsc::UnboundedReceiver<Delivery>,
    outstanding: Arc<AtomicUsize>,
}

/// The caller-visible reference to one repository's in-process state.
///
/// Cheap to clone; clones share the same underlying store and worker.
/// Submissions ([`open_async`](RepoHandle::open_async),
/// [`init_async`](RepoHandle::init_async),
/// [`close_async`](RepoHandle::close_async)) validate synchronously and
/// queue the work. The synchronous variants bypass the queue but lock the
/// same store, so they still serialize against worker execution.
#[derive(Clone)]
pub struct RepoHandle {
    shared: Arc<HandleShared>,
    requests: mpsc::UnboundedSender<Request>,
    outstanding: Arc<AtomicUsize>,
}

impl TaskRunner {
    /// Create a runner with an empty delivery queue.
    pub fn new() -> Self {
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        Self {
            delivery_tx,
            delivery_rx,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a new, unopened repository handle with its own worker.
    ///
    /// Must be called from within a Tokio runtime; the worker is spawned
    /// onto it. The worker exits once every clone of the handle has been
    /// dropped and its queue has emptied.
    pub fn handle(&self) -> RepoHandle {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(HandleShared {
            store: Mutex::new(RepoStore::new()),
            pending: AtomicUsize::new(0),
        });

        task::spawn(worker(
            Arc::clone(&shared),
            req_rx,
            self.delivery_tx.clone(),
        ));

        RepoHandle {
            shared,
            requests: req_tx,
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Number of accepted requests not yet delivered.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Deliver every completion that is already queued, without waiting.
    ///
    /// Callbacks run on the calling thread. Returns the number delivered.
    pub fn deliver_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(delivery) = self.delivery_rx.try_recv() {
            self.deliver(delivery);
            delivered += 1;
        }
        delivered
    }

    /// Wait for the next completion and deliver it on the calling task.
    ///
    /// Returns `false` if the delivery queue can no longer produce
    /// completions. Intended for hosts that interleave delivery with
    /// other work; most callers want [`drain`](TaskRunner::drain).
    pub async fn next_delivery(&mut self) -> bool {
        let delivery = self.delivery_rx.recv().await;
        match delivery {
            Some(delivery) => {
                self.deliver(delivery);
                true
            }
            None => false,
        }
    }

    /// Deliver completions until no accepted request remains outstanding.
    ///
    /// Every callback runs on the task that called `drain`.
    pub async fn drain(&mut self) {
        while self.outstanding.load(Ordering::SeqCst) > 0 {
            if !self.next_delivery().await {
                break;
            }
        }
    }

    /// Invoke one callback and release the request's bookkeeping.
    fn deliver(&self, delivery: Delivery) {
        let Delivery {
            completion,
            callback,
            shared,
        } = delivery;
        trace!(
            op = completion.op.name(),
            code = completion.code,
            "delivering completion"
        );

        callback(completion);

        shared.pending.fetch_sub(1, Ordering::SeqCst);
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl RepoHandle {
    // =========================================================================
    // Asynchronous API
    // =========================================================================

    /// Queue an open of the repository rooted at `path`.
    ///
    /// The callback receives the completion exactly once when the host
    /// pumps deliveries: code `0` and the submitted path on success, a
    /// non-zero code on failure.
    ///
    /// # Errors
    ///
    /// Fails synchronously, without dispatching, if `path` is invalid or
    /// the worker is gone. The callback never runs in that case.
    pub fn open_async<F>(&self, path: impl Into<PathBuf>, callback: F) -> Result<(), SubmitError>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let path = RepoPath::new(path)?;
        self.submit(Op::Open, path.into_path_buf(), Box::new(callback))
    }

    /// Queue creation of a repository at `path`.
    ///
    /// With `bare == true` no working tree is created. The completion
    /// carries the bareness flag back ([`Completion::bare`]).
    ///
    /// # Errors
    ///
    /// Fails synchronously, without dispatching, if `path` is invalid or
    /// the worker is gone. The callback never runs in that case.
    pub fn init_async<F>(
        &self,
        path: impl Into<PathBuf>,
        bare: bool,
        callback: F,
    ) -> Result<(), SubmitError>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let path = RepoPath::new(path)?;
        self.submit(Op::Init { bare }, path.into_path_buf(), Box::new(callback))
    }

    /// Queue release of the handle's native state.
    ///
    /// Runs on the same serialized queue as open and init, so a close
    /// submitted after an open cannot overtake it. The completion echoes
    /// the path that was open at execution time (empty if none was) and
    /// always succeeds.
    ///
    /// # Errors
    ///
    /// Fails synchronously if the worker is gone.
    pub fn close_async<F>(&self, callback: F) -> Result<(), SubmitError>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.submit(Op::Close, PathBuf::new(), Box::new(callback))
    }

    /// Validate, account, copy, and enqueue one request.
    fn submit(&self, op: Op, path: PathBuf, callback: Callback) -> Result<(), SubmitError> {
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        trace!(op = op.name(), path = %path.display(), "submitted request");

        match self.requests.send(Request { op, path, callback }) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.shared.pending.fetch_sub(1, Ordering::SeqCst);
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                Err(SubmitError::WorkerGone)
            }
        }
    }

    // =========================================================================
    // Synchronous API
    // =========================================================================

    /// Open the repository rooted at `path` on the calling thread.
    pub fn open_sync(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        self.shared.store.lock().open(path.as_ref())
    }

    /// Create a repository at `path` on the calling thread.
    pub fn init_sync(&self, path: impl AsRef<Path>, bare: bool) -> Result<(), StoreError> {
        self.shared.store.lock().init(path.as_ref(), bare)
    }

    /// Release the native state on the calling thread. No-op when closed.
    pub fn close_sync(&self) {
        self.shared.store.lock().close();
    }

    // =========================================================================
    // State queries
    // =========================================================================

    /// Whether the handle currently holds native state.
    pub fn is_open(&self) -> bool {
        self.shared.store.lock().is_open()
    }

    /// The path this handle was opened or initialized against, if any.
    pub fn path(&self) -> Option<PathBuf> {
        self.shared.store.lock().path().map(Path::to_path_buf)
    }

    /// Whether the opened repository is bare.
    pub fn is_bare(&self) -> Result<bool, StoreError> {
        self.shared.store.lock().is_bare()
    }

    /// Information about the opened repository.
    pub fn info(&self) -> Result<RepoInfo, StoreError> {
        self.shared.store.lock().info()
    }

    /// Number of this handle's requests accepted but not yet delivered.
    pub fn pending_ops(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoHandle")
            .field("path", &self.path())
            .field("pending_ops", &self.pending_ops())
            .finish()
    }
}

/// Per-handle worker loop.
///
/// Takes requests strictly in submission order and runs each store call
/// to completion on a blocking thread before receiving the next request.
async fn worker(
    shared: Arc<HandleShared>,
    mut requests: mpsc::UnboundedReceiver<Request>,
    deliveries: mpsc::UnboundedSender<Delivery>,
) {
    while let Some(Request { op, path, callback }) = requests.recv().await {
        trace!(op = op.name(), path = %path.display(), "dispatched request");

        let exec_shared = Arc::clone(&shared);
        let exec_path = path.clone();
        let outcome = task::spawn_blocking(move || execute(&exec_shared, op, exec_path)).await;

        let (result_code, done_path) = match outcome {
            Ok((Ok(()), done_path)) => (code::OK, done_path),
            Ok((Err(err), done_path)) => (err.code(), done_path),
            Err(_) => {
                warn!(op = op.name(), "store operation panicked");
                (code::GENERIC, path)
            }
        };

        let delivery = Delivery {
            completion: Completion {
                op,
                code: result_code,
                path: done_path,
            },
            callback,
            shared: Arc::clone(&shared),
        };
        if deliveries.send(delivery).is_err() {
            // The runner is gone; there is no thread left to deliver to.
            shared.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Run one store call under the handle's lock.
///
/// Returns the operation result and the path to echo in the completion:
/// the submitted path for open/init, the path that was open for close.
fn execute(shared: &HandleShared, op: Op, path: PathBuf) -> (Result<(), StoreError>, PathBuf) {
    #[cfg(any(test, feature = "test_hooks"))]
    super::runner_hooks::invoke_before_op(op.name(), &path);

    let mut store = shared.store.lock();
    match op {
        Op::Open => {
            let result = store.open(&path);
            (result, path)
        }
        Op::Init { bare } => {
            let result = store.init(&path, bare);
            (result, path)
        }
        Op::Close => {
            let open_path = store.path().map(Path::to_path_buf).unwrap_or_default();
            store.close();
            (Ok(()), open_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn empty_path_fails_synchronously_without_dispatch() {
        let runner = TaskRunner::new();
        let repo = runner.handle();

        let invoked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&invoked);
        let err = repo
            .open_async("", move |_| flag.store(true, Ordering::SeqCst))
            .unwrap_err();

        assert_eq!(err, SubmitError::InvalidPath(TypeError::EmptyPath));
        assert_eq!(runner.outstanding(), 0);
        assert_eq!(repo.pending_ops(), 0);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn init_async_delivers_success_and_bare_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo.git");

        let mut runner = TaskRunner::new();
        let repo = runner.handle();

        let seen = Arc::new(StdMutex::new(None));
        let sink = Arc::clone(&seen);
        repo.init_async(&path, true, move |done| {
            *sink.lock().unwrap() = Some(done);
        })
        .unwrap();
        assert_eq!(repo.pending_ops(), 1);

        runner.drain().await;

        let done = seen.lock().unwrap().take().unwrap();
        assert!(done.is_ok());
        assert_eq!(done.path, path);
        assert_eq!(done.bare(), Some(true));
        assert_eq!(repo.pending_ops(), 0);
        assert!(repo.is_open());
    }

    #[test]
    fn open_async_missing_path_delivers_nonzero() {
        // block_on keeps this usable from plain #[test] contexts.
        tokio_test::block_on(async {
            let mut runner = TaskRunner::new();
            let repo = runner.handle();

            let seen = Arc::new(StdMutex::new(None));
            let sink = Arc::clone(&seen);
            repo.open_async("/does/not/exist", move |done| {
                *sink.lock().unwrap() = Some(done);
            })
            .unwrap();

            runner.drain().await;

            let done = seen.lock().unwrap().take().unwrap();
            assert!(!done.is_ok());
            assert_eq!(done.path, PathBuf::from("/does/not/exist"));
            assert!(!repo.is_open());
        });
    }

    #[tokio::test]
    async fn close_async_echoes_the_open_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo");

        let mut runner = TaskRunner::new();
        let repo = runner.handle();

        let order = Arc::new(StdMutex::new(Vec::new()));

        let sink = Arc::clone(&order);
        repo.init_async(&path, false, move |done| {
            sink.lock().unwrap().push(done);
        })
        .unwrap();
        let sink = Arc::clone(&order);
        repo.close_async(move |done| {
            sink.lock().unwrap().push(done);
        })
        .unwrap();

        runner.drain().await;

        let completions = order.lock().unwrap();
        assert_eq!(completions.len(), 2);
        assert_eq!(completions[0].op, Op::Init { bare: false });
        assert_eq!(completions[1].op, Op::Close);
        assert!(completions[1].is_ok());
        assert_eq!(completions[1].path, path);
        assert!(!repo.is_open());
    }

    #[tokio::test]
    async fn close_async_on_unopened_handle_echoes_empty_path() {
        let mut runner = TaskRunner::new();
        let repo = runner.handle();

        let seen = Arc::new(StdMutex::new(None));
        let sink = Arc::clone(&seen);
        repo.close_async(move |done| {
            *sink.lock().unwrap() = Some(done);
        })
        .unwrap();

        runner.drain().await;

        let done = seen.lock().unwrap().take().unwrap();
        assert!(done.is_ok());
        assert_eq!(done.path, PathBuf::new());
    }

    #[tokio::test]
    async fn sync_api_works_through_the_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo");

        let runner = TaskRunner::new();
        let repo = runner.handle();

        repo.init_sync(&path, false).unwrap();
        assert!(repo.is_open());
        assert_eq!(repo.is_bare().unwrap(), false);
        assert_eq!(repo.path(), Some(path.clone()));

        repo.close_sync();
        assert!(!repo.is_open());

        repo.open_sync(&path).unwrap();
        assert!(repo.is_open());
    }
}
