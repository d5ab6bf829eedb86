//! Test utilities for keel unit tests.
//!
//! Provides on-disk project fixtures and a fake toolchain made of shell
//! scripts, so planning and orchestration can be exercised without a real
//! compiler.
//!
//! # Example
//!
//! ```rust,ignore
//! use keel::test_support::ProjectFixture;
//!
//! let project = ProjectFixture::foo_extension().write();
//! let manifest = project.manifest();
//! ```

pub mod fixtures;

pub use fixtures::*;

/// Assertion helpers for testing.
pub mod assertions {
    /// Assert that a result is Err and that its chain mentions `substring`.
    pub fn assert_error_contains<T: std::fmt::Debug>(
        result: anyhow::Result<T>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }
}
