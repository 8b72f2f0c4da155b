//! Property-based tests for core domain types.
//!
//! These tests use proptest to verify validation and wire-code
//! invariants across randomly generated inputs.

use std::path::PathBuf;

use proptest::prelude::*;

use repokeep::core::types::{RepoPath, TypeError};
use repokeep::runner::{Completion, Op};

/// Strategy for path strings the validator must accept.
fn reasonable_path() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._/-]{1,64}"
}

proptest! {
    /// Any non-empty, NUL-free path validates and round-trips unchanged.
    #[test]
    fn reasonable_paths_validate(s in reasonable_path()) {
        let path = RepoPath::new(s.clone()).unwrap();
        let expected = PathBuf::from(s);
        prop_assert_eq!(path.as_path(), expected.as_path());
    }

    /// An interior NUL byte is rejected wherever it appears.
    #[test]
    fn interior_nul_is_always_rejected(
        prefix in "[a-z]{0,8}",
        suffix in "[a-z]{0,8}",
    ) {
        let s = format!("{prefix}\0{suffix}");
        prop_assert_eq!(RepoPath::new(s), Err(TypeError::InteriorNul));
    }

    /// A completion reports success exactly when its code is zero.
    #[test]
    fn completion_succeeds_iff_code_is_zero(code in any::<i32>(), bare in any::<bool>()) {
        let done = Completion {
            op: Op::Init { bare },
            code,
            path: PathBuf::from("/tmp/x"),
        };
        prop_assert_eq!(done.is_ok(), code == 0);
        prop_assert_eq!(done.bare(), Some(bare));
    }
}
