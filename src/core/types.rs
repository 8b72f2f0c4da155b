//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoPath`] - Validated repository path
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so the submission boundary never dispatches a
//! request whose inputs could only fail later on a worker.
//!
//! # Examples
//!
//! ```
//! use repokeep::core::types::RepoPath;
//!
//! let path = RepoPath::new("/tmp/some-repo").unwrap();
//! assert_eq!(path.as_path().to_str(), Some("/tmp/some-repo"));
//!
//! assert!(RepoPath::new("").is_err());
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("repository path cannot be empty")]
    EmptyPath,

    #[error("repository path contains an interior NUL byte")]
    InteriorNul,
}

/// A validated repository path.
///
/// The path names the repository root: for a non-bare repository the
/// directory that holds the `.git` metadata directory, for a bare
/// repository the metadata directory itself.
///
/// Validation rejects:
/// - the empty path
/// - paths containing an interior NUL byte (unrepresentable to the
///   native storage engine)
///
/// # Example
///
/// ```
/// use repokeep::core::types::{RepoPath, TypeError};
///
/// let path = RepoPath::new("/srv/repos/app.git").unwrap();
/// assert!(path.as_path().is_absolute());
///
/// assert_eq!(RepoPath::new(""), Err(TypeError::EmptyPath));
/// assert_eq!(RepoPath::new("a\0b"), Err(TypeError::InteriorNul));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoPath(PathBuf);

impl RepoPath {
    /// Create a new validated repository path.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::EmptyPath`] or [`TypeError::InteriorNul`] if
    /// the path violates the rules above.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &Path) -> Result<(), TypeError> {
        if path.as_os_str().is_empty() {
            return Err(TypeError::EmptyPath);
        }
        if path.as_os_str().as_encoded_bytes().contains(&0) {
            return Err(TypeError::InteriorNul);
        }
        Ok(())
    }

    /// Borrow the underlying path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consume the wrapper, yielding the owned path.
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for RepoPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
