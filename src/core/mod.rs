//! Core data structures for keel.
//!
//! - The `Keel.toml` manifest and its declarations
//! - Source languages and the target platform

pub mod extension;
pub mod language;
pub mod manifest;
pub mod platform;

pub use extension::{Define, ExtensionDecl, LibraryDecl, ModuleName, Visibility};
pub use language::{CppStandard, Language};
pub use manifest::{find_manifest, Manifest, ManifestError, Profile, MANIFEST_NAME};
pub use platform::{TargetOs, TargetPlatform};
