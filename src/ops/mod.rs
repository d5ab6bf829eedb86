//! High-level operations.
//!
//! This module contains the implementation of keel commands.

pub mod flags;
pub mod keel_build;
pub mod keel_clean;

pub use flags::{unit_flags, UnitFlags};
pub use keel_build::{build, BuildOptions, BuildResult, LoadedConfig, MessageFormat};
pub use keel_clean::{clean, CleanOptions, CleanResult};
