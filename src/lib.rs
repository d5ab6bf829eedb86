//! keel - a build backend for native (C/C++) extension modules
//!
//! This crate resolves extension declarations from `Keel.toml`, drives the
//! platform C/C++ toolchain to compile and link them, and reports the
//! outcome of every unit.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for keel unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides on-disk project fixtures and a fake toolchain.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildReport, BuildUnit};
pub use core::manifest::Manifest;
pub use util::context::GlobalContext;
