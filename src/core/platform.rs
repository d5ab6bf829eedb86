//! Target platform description.

use serde::{Deserialize, Serialize};

/// Operating system family of the build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Linux,
    Macos,
    Windows,
    Other,
}

impl TargetOs {
    /// The OS keel itself was compiled for.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            TargetOs::Windows
        } else if cfg!(target_os = "macos") {
            TargetOs::Macos
        } else if cfg!(target_os = "linux") {
            TargetOs::Linux
        } else {
            TargetOs::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Linux => "linux",
            TargetOs::Macos => "macos",
            TargetOs::Windows => "windows",
            TargetOs::Other => "other",
        }
    }
}

/// The platform native units are built for.
///
/// Cross compilation is not supported, so this is always the host in
/// practice; tests construct other platforms to check flag generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetPlatform {
    pub os: TargetOs,
}

impl TargetPlatform {
    pub fn host() -> Self {
        TargetPlatform {
            os: TargetOs::host(),
        }
    }

    pub fn new(os: TargetOs) -> Self {
        TargetPlatform { os }
    }

    pub fn is_windows(&self) -> bool {
        self.os == TargetOs::Windows
    }

    pub fn is_macos(&self) -> bool {
        self.os == TargetOs::Macos
    }

    /// Default suffix of a built extension module.
    ///
    /// macOS loadable modules use `.so` as well; `.dylib` is for libraries
    /// linked at build time.
    pub fn default_extension_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".dll"
        } else {
            ".so"
        }
    }
}

impl Default for TargetPlatform {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extension_suffix() {
        assert_eq!(
            TargetPlatform::new(TargetOs::Linux).default_extension_suffix(),
            ".so"
        );
        assert_eq!(
            TargetPlatform::new(TargetOs::Macos).default_extension_suffix(),
            ".so"
        );
        assert_eq!(
            TargetPlatform::new(TargetOs::Windows).default_extension_suffix(),
            ".dll"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_host_platform() {
        assert_eq!(TargetPlatform::host().os, TargetOs::Linux);
    }
}
