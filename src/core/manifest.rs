//! Keel.toml manifest parsing and schema.
//!
//! The manifest declares the native units of a project: helper static
//! libraries (`[[library]]`) and extension modules (`[[extension]]`), plus
//! project-wide build settings and profiles.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::extension::{ExtensionDecl, LibraryDecl};

/// File name of the manifest.
pub const MANIFEST_NAME: &str = "Keel.toml";

/// Placeholder replaced with the module leaf name in `init-symbol`.
pub const INIT_SYMBOL_PLACEHOLDER: &str = "{name}";

/// Errors produced while locating or reading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find `Keel.toml` in `{}` or any parent directory", dir.display())]
    NotFound { dir: PathBuf },

    #[error("failed to read manifest `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("manifest `{}` has no [package] section", path.display())]
    MissingPackage { path: PathBuf },

    #[error("invalid package version `{version}`")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("extension `{0}` is declared more than once")]
    DuplicateExtension(String),

    #[error("library `{0}` is declared more than once")]
    DuplicateLibrary(String),

    #[error("`{0}` is declared both as a library and as an extension")]
    NameCollision(String),

    #[error("unknown profile `{0}`")]
    UnknownProfile(String),
}

/// Package metadata from the [package] section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name
    pub name: String,

    /// Package version (semver)
    #[serde(default)]
    pub version: Option<String>,
}

impl PackageMetadata {
    /// Parse the version string as semver, if one was given.
    pub fn version(&self) -> Result<Option<Version>, ManifestError> {
        self.version
            .as_deref()
            .map(|v| {
                v.parse().map_err(|source| ManifestError::InvalidVersion {
                    version: v.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

fn default_init_symbol() -> String {
    format!("PyInit_{}", INIT_SYMBOL_PLACEHOLDER)
}

/// Project-wide settings from the [build] section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildSettings {
    /// Build script run from the project root before native units.
    pub script: Option<PathBuf>,

    /// Program used to run the script. Without one the script is executed directly.
    pub runner: Option<String>,

    /// The script produces every artifact; no native units are built.
    pub script_only: bool,

    /// Suffix of built extension modules (platform default when unset).
    pub extension_suffix: Option<String>,

    /// Symbol every extension exports, `{name}` standing for the module
    /// leaf. An empty string disables it.
    pub init_symbol: String,

    /// Include directories added to every unit.
    pub include_dirs: Vec<PathBuf>,

    /// Keep building independent units after a required unit fails.
    pub keep_going: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            script: None,
            runner: None,
            script_only: false,
            extension_suffix: None,
            init_symbol: default_init_symbol(),
            include_dirs: Vec::new(),
            keep_going: false,
        }
    }
}

impl BuildSettings {
    /// The init symbol for a module leaf, or None when disabled.
    pub fn init_symbol_for(&self, leaf: &str) -> Option<String> {
        if self.init_symbol.is_empty() {
            None
        } else {
            Some(self.init_symbol.replace(INIT_SYMBOL_PLACEHOLDER, leaf))
        }
    }
}

/// Build profile configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Profile {
    /// Optimization level (0, 1, 2, 3, s, z)
    pub opt_level: Option<String>,

    /// Debug information (0, 1, 2, full)
    pub debug: Option<String>,

    /// Link-time optimization
    pub lto: Option<bool>,

    /// Sanitizers to enable
    pub sanitizers: Vec<String>,

    /// Additional compiler flags
    pub cflags: Vec<String>,

    /// Additional linker flags
    pub ldflags: Vec<String>,
}

impl Profile {
    /// Built-in debug profile: no optimization, full debug info.
    pub fn debug() -> Self {
        Profile {
            opt_level: Some("0".to_string()),
            debug: Some("2".to_string()),
            ..Default::default()
        }
    }

    /// Built-in release profile.
    pub fn release() -> Self {
        Profile {
            opt_level: Some("2".to_string()),
            debug: Some("0".to_string()),
            ..Default::default()
        }
    }

    /// Overlay the settings present in `custom`.
    pub fn merge(&mut self, custom: &Profile) {
        if custom.opt_level.is_some() {
            self.opt_level = custom.opt_level.clone();
        }
        if custom.debug.is_some() {
            self.debug = custom.debug.clone();
        }
        if custom.lto.is_some() {
            self.lto = custom.lto;
        }
        if !custom.sanitizers.is_empty() {
            self.sanitizers = custom.sanitizers.clone();
        }
        if !custom.cflags.is_empty() {
            self.cflags = custom.cflags.clone();
        }
        if !custom.ldflags.is_empty() {
            self.ldflags = custom.ldflags.clone();
        }
    }
}

/// The parsed Keel.toml manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub package: PackageMetadata,

    pub build: BuildSettings,

    /// Helper static libraries, in declaration order
    pub libraries: Vec<LibraryDecl>,

    /// Extension modules, in declaration order
    pub extensions: Vec<ExtensionDecl>,

    /// Custom profiles from [profile.*]
    pub profiles: HashMap<String, Profile>,

    /// The directory containing this manifest
    pub root: PathBuf,

    /// Path of the manifest file itself
    pub path: PathBuf,
}

/// Raw manifest as deserialized from TOML.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    package: Option<PackageMetadata>,

    #[serde(default)]
    build: BuildSettings,

    #[serde(default, rename = "library")]
    libraries: Vec<LibraryDecl>,

    #[serde(default, rename = "extension")]
    extensions: Vec<ExtensionDecl>,

    #[serde(default)]
    profile: HashMap<String, Profile>,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, path)
    }

    /// Parse manifest content. `path` locates the project root.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let package = raw.package.ok_or_else(|| ManifestError::MissingPackage {
            path: path.to_path_buf(),
        })?;
        package.version()?;

        let mut library_names = HashSet::new();
        for lib in &raw.libraries {
            if !library_names.insert(lib.name.as_str()) {
                return Err(ManifestError::DuplicateLibrary(lib.name.clone()));
            }
        }

        let mut extension_names = HashSet::new();
        for ext in &raw.extensions {
            if !extension_names.insert(ext.name.as_str()) {
                return Err(ManifestError::DuplicateExtension(ext.name.clone()));
            }
            if library_names.contains(ext.name.as_str()) {
                return Err(ManifestError::NameCollision(ext.name.clone()));
            }
        }

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        Ok(Manifest {
            package,
            build: raw.build,
            libraries: raw.libraries,
            extensions: raw.extensions,
            profiles: raw.profile,
            root,
            path: path.to_path_buf(),
        })
    }

    /// Get the package name.
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Whether the manifest declares anything to build natively.
    pub fn has_native_units(&self) -> bool {
        !self.extensions.is_empty() || !self.libraries.is_empty()
    }

    /// Resolve a profile by name.
    ///
    /// `debug` and `release` are built in and can be tuned with
    /// `[profile.debug]` / `[profile.release]`. Any other name must be
    /// declared and starts from the debug defaults.
    pub fn profile(&self, name: &str) -> Result<Profile, ManifestError> {
        let mut profile = match name {
            "release" => Profile::release(),
            "debug" => Profile::debug(),
            _ if self.profiles.contains_key(name) => Profile::debug(),
            _ => return Err(ManifestError::UnknownProfile(name.to_string())),
        };

        if let Some(custom) = self.profiles.get(name) {
            profile.merge(custom);
        }

        Ok(profile)
    }
}

/// Search `start` and its ancestors for `Keel.toml`.
pub fn find_manifest(start: &Path) -> Result<PathBuf, ManifestError> {
    for dir in start.ancestors() {
        let candidate = dir.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(ManifestError::NotFound {
        dir: start.to_path_buf(),
    })
}
