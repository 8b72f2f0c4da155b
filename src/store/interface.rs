//! store::interface
//!
//! Repository store implementation using git2.
//!
//! The [`RepoStore`] struct owns the native repository state and exposes
//! the synchronous lifecycle: [`RepoStore::open`], [`RepoStore::init`],
//! [`RepoStore::close`], plus state queries. It is deliberately small;
//! object and ref formats belong to the storage engine and are not part
//! of this crate's contract.
//!
//! # Error Handling
//!
//! Storage failures are categorized into typed variants:
//! - [`StoreError::NotARepo`]: no repository at the given path
//! - [`StoreError::PathCollision`]: the path is occupied by something
//!   that cannot become a repository
//! - [`StoreError::Locked`]: the repository is locked by another process
//! - [`StoreError::NotOpen`]: a query needed native state and none is held
//! - [`StoreError::Internal`]: any other engine failure, carrying the raw
//!   engine code
//!
//! Every variant maps to a stable non-zero wire code via
//! [`StoreError::code`] for hosts that consume plain integers.
//!
//! # Example
//!
//! ```no_run
//! use repokeep::store::RepoStore;
//! use std::path::Path;
//!
//! let mut store = RepoStore::new();
//! store.init(Path::new("/tmp/new-repo"), false)?;
//! assert!(store.is_open());
//! store.close();
//! store.open(Path::new("/tmp/new-repo"))?;
//! # Ok::<(), repokeep::store::StoreError>(())
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Wire codes delivered across the host boundary.
///
/// `0` means success; any non-zero value means failure. Hosts must treat
/// all non-zero values uniformly as failure unless documented otherwise.
/// The constants below give the distinct failure classes stable values.
pub mod code {
    /// The operation succeeded.
    pub const OK: i32 = 0;
    /// Unclassified failure.
    pub const GENERIC: i32 = -1;
    /// No repository exists at the given path.
    pub const NOT_FOUND: i32 = -3;
    /// The path is occupied by content that cannot become a repository.
    pub const EXISTS: i32 = -4;
    /// The repository is locked by another process.
    pub const LOCKED: i32 = -14;
    /// The store holds no native state.
    pub const NOT_OPEN: i32 = -7;
}

/// Errors from store operations.
///
/// The categorization lets the runner deliver a meaningful wire code and
/// lets direct callers branch on failure class without string matching.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No repository found at the path.
    #[error("no repository found at {path}")]
    NotARepo {
        /// The path that was probed
        path: PathBuf,
    },

    /// The path is occupied by existing non-repository content.
    #[error("path collides with existing content: {path}")]
    PathCollision {
        /// The colliding path
        path: PathBuf,
    },

    /// The repository is locked by another process.
    #[error("repository is locked: {message}")]
    Locked {
        /// Engine-provided detail
        message: String,
    },

    /// The store holds no native state.
    ///
    /// Returned by queries that need an opened repository, including after
    /// a `close` with no re-open since.
    #[error("repository store is not open")]
    NotOpen,

    /// Internal storage engine error.
    #[error("storage engine error: {message}")]
    Internal {
        /// Raw engine code (non-zero)
        code: i32,
        /// Engine-provided detail
        message: String,
    },
}

impl StoreError {
    /// The non-zero wire code for this error.
    pub fn code(&self) -> i32 {
        match self {
            StoreError::NotARepo { .. } => code::NOT_FOUND,
            StoreError::PathCollision { .. } => code::EXISTS,
            StoreError::Locked { .. } => code::LOCKED,
            StoreError::NotOpen => code::NOT_OPEN,
            StoreError::Internal { code: raw, .. } => {
                if *raw == code::OK {
                    code::GENERIC
                } else {
                    *raw
                }
            }
        }
    }

    /// Categorize a git2 error for the operation rooted at `path`.
    fn from_git2(err: git2::Error, path: &Path) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => StoreError::NotARepo {
                path: path.to_path_buf(),
            },
            git2::ErrorCode::Exists => StoreError::PathCollision {
                path: path.to_path_buf(),
            },
            git2::ErrorCode::Locked => StoreError::Locked {
                message: err.message().to_string(),
            },
            _ => StoreError::Internal {
                code: err.raw_code(),
                message: err.message().to_string(),
            },
        }
    }
}

/// Information about an opened repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Path to the metadata directory (`.git` for non-bare repositories,
    /// the repository root itself for bare ones).
    pub git_dir: PathBuf,
    /// Path to the working directory; `None` for bare repositories.
    pub work_dir: Option<PathBuf>,
    /// Whether the repository has no working tree.
    pub bare: bool,
}

/// Native state for an opened repository.
struct Native {
    repo: git2::Repository,
    path: PathBuf,
    bare: bool,
}

/// The repository store.
///
/// Owns the native repository state for one handle. Created empty;
/// populated by a successful [`open`](RepoStore::open) or
/// [`init`](RepoStore::init); emptied by [`close`](RepoStore::close).
/// A store may be reopened after close, against the same path or a
/// different one.
///
/// The store never spawns concurrency. Callers that need background
/// execution wrap it in a [`runner::RepoHandle`](crate::runner::RepoHandle).
pub struct RepoStore {
    state: Option<Native>,
}

impl std::fmt::Debug for RepoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoStore")
            .field("path", &self.state.as_ref().map(|n| n.path.as_path()))
            .field("bare", &self.state.as_ref().map(|n| n.bare))
            .finish()
    }
}

impl RepoStore {
    /// Create a store with no native state.
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Open an existing repository rooted exactly at `path`.
    ///
    /// `path` must name the repository root: a directory containing `.git`
    /// metadata, or a bare repository directory itself. There is no upward
    /// discovery from subdirectories.
    ///
    /// Opening over an already-open store releases the previous state
    /// first. Safe to call again after a prior [`close`](RepoStore::close).
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotARepo`] if nothing recognizable exists at `path`
    /// - [`StoreError::Locked`] / [`StoreError::Internal`] for engine-level
    ///   failures (permissions, corrupt metadata)
    pub fn open(&mut self, path: &Path) -> Result<(), StoreError> {
        let repo = git2::Repository::open(path).map_err(|e| StoreError::from_git2(e, path))?;
        let bare = repo.is_bare();
        debug!(path = %path.display(), bare, "opened repository");

        self.state = Some(Native {
            repo,
            path: path.to_path_buf(),
            bare,
        });
        Ok(())
    }

    /// Create a repository at `path`, creating intermediate directories
    /// as needed.
    ///
    /// With `bare == true` no working tree is created; the metadata store
    /// is the repository root. Initializing a path that already holds a
    /// repository is a safe success that leaves existing history intact
    /// (engine reinit semantics).
    ///
    /// # Errors
    ///
    /// - [`StoreError::PathCollision`] if `path` is occupied by content
    ///   that cannot become a repository
    /// - [`StoreError::Internal`] for engine-level failures (permission
    ///   denied, disk exhaustion)
    pub fn init(&mut self, path: &Path, bare: bool) -> Result<(), StoreError> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.bare(bare).mkpath(true).no_reinit(false);

        let repo = git2::Repository::init_opts(path, &opts)
            .map_err(|e| StoreError::from_git2(e, path))?;
        // A reinit of an existing repository keeps its original layout, so
        // record the bareness the engine reports, not the requested flag.
        let bare = repo.is_bare();
        debug!(path = %path.display(), bare, "initialized repository");

        self.state = Some(Native {
            repo,
            path: path.to_path_buf(),
            bare,
        });
        Ok(())
    }

    /// Release the native state.
    ///
    /// No-op on a closed or never-opened store. After close, queries that
    /// need native state fail with [`StoreError::NotOpen`].
    pub fn close(&mut self) {
        if let Some(native) = self.state.take() {
            debug!(path = %native.path.display(), "closed repository");
        }
    }

    /// Whether the store currently holds native state.
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// The path this store was opened or initialized against, if any.
    pub fn path(&self) -> Option<&Path> {
        self.state.as_ref().map(|n| n.path.as_path())
    }

    /// Whether the opened repository is bare.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotOpen`] if the store holds no native state.
    pub fn is_bare(&self) -> Result<bool, StoreError> {
        self.state.as_ref().map(|n| n.bare).ok_or(StoreError::NotOpen)
    }

    /// Information about the opened repository.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotOpen`] if the store holds no native state.
    pub fn info(&self) -> Result<RepoInfo, StoreError> {
        let native = self.state.as_ref().ok_or(StoreError::NotOpen)?;
        Ok(RepoInfo {
            git_dir: native.repo.path().to_path_buf(),
            work_dir: native.repo.workdir().map(|p| p.to_path_buf()),
            bare: native.bare,
        })
    }
}

impl Default for RepoStore {
    fn default() -> Self {
        Self::new()
    }
}
