//! store
//!
//! Single interface to the native repository state.
//!
//! # Architecture
//!
//! This module is the **only doorway** to the storage engine. All
//! repository lifecycle operations flow through [`RepoStore`]; no other
//! module should import `git2`. This ensures:
//!
//! - Consistent error handling and code mapping at the host boundary
//! - One place where native state is created and released
//!
//! # Responsibilities
//!
//! - Opening an existing repository rooted at a path
//! - Initializing a new repository, bare or with a working tree
//! - Releasing native state and answering state queries
//!
//! # Invariants
//!
//! - Native state is held if and only if a successful open or init has
//!   occurred with no close since
//! - A failed open or init leaves no partial native allocation behind
//! - Operations on a closed store report [`StoreError::NotOpen`] rather
//!   than exhibiting undefined behavior

mod interface;

pub use interface::{code, RepoInfo, RepoStore, StoreError};
