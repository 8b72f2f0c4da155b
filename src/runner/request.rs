//! runner::request
//!
//! Request and completion types for the asynchronous boundary.
//!
//! A request moves through the states `Submitted -> Dispatched ->
//! Executing -> Completed -> Delivered`. Submission and dispatch are
//! queueing steps on the caller's thread; execution happens on a blocking
//! worker; completion parks the result on the delivery queue; delivery
//! invokes the callback exactly once and releases the request.

use std::path::PathBuf;

/// A store operation submitted through the asynchronous boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Open an existing repository.
    Open,
    /// Initialize a new repository.
    Init {
        /// Whether to create the repository without a working tree.
        bare: bool,
    },
    /// Release the handle's native state.
    Close,
}

impl Op {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Open => "open",
            Op::Init { .. } => "init",
            Op::Close => "close",
        }
    }
}

/// The result delivered to a request's callback.
///
/// Delivered exactly once per accepted request, after the store call has
/// fully completed, on the thread pumping deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The operation that completed.
    pub op: Op,
    /// `0` on success; non-zero on failure (see [`crate::store::code`]).
    pub code: i32,
    /// The path the request ran against. For close requests this is the
    /// path that was open at execution time, empty if none was.
    pub path: PathBuf,
}

impl Completion {
    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.code == crate::store::code::OK
    }

    /// The bareness flag for init completions, `None` otherwise.
    ///
    /// The flag rides along so callers never have to re-derive it from
    /// the repository they just created.
    pub fn bare(&self) -> Option<bool> {
        match self.op {
            Op::Init { bare } => Some(bare),
            _ => None,
        }
    }
}

/// One-shot completion callback.
pub(crate) type Callback = Box<dyn FnOnce(Completion) + Send + 'static>;

/// An accepted request, queued on a handle's worker.
pub(crate) struct Request {
    pub(crate) op: Op,
    pub(crate) path: PathBuf,
    pub(crate) callback: Callback,
}
