//! Build context - toolchain, platform, profile, and output layout.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::builder::toolchain::{detect_toolchain, CompilerFamily, Toolchain};
use crate::builder::unit::BuildUnit;
use crate::builder::util::version_from_banner;
use crate::core::language::Language;
use crate::core::manifest::Profile;
use crate::core::platform::TargetPlatform;
use crate::util::config::ToolchainConfig;
use crate::util::context::target_dir;
use crate::util::process::ProcessBuilder;

/// Compiler family and version, part of every fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerIdentity {
    pub family: CompilerFamily,
    pub version: Option<semver::Version>,
}

impl CompilerIdentity {
    pub fn new(family: CompilerFamily, version: Option<semver::Version>) -> Self {
        CompilerIdentity { family, version }
    }
}

impl fmt::Display for CompilerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}-{}", self.family, version),
            None => write!(f, "{}-unknown", self.family),
        }
    }
}

/// Output directories for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLayout {
    /// `.keel/target/<profile>`
    pub dir: PathBuf,
    pub obj_dir: PathBuf,
    pub deps_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub fingerprints: PathBuf,
}

impl TargetLayout {
    pub fn new(root: &Path, profile_name: &str) -> Self {
        let dir = target_dir(root).join(profile_name);
        TargetLayout {
            obj_dir: dir.join("obj"),
            deps_dir: dir.join("deps"),
            lib_dir: dir.join("lib"),
            exports_dir: dir.join("exports"),
            fingerprints: dir.join("fingerprints.json"),
            dir,
        }
    }
}

/// Everything needed to turn build units into commands.
#[derive(Clone)]
pub struct BuildContext {
    /// Toolchain implementation
    pub toolchain: Arc<dyn Toolchain>,

    /// Compiler identity
    pub compiler: CompilerIdentity,

    /// Platform the modules are built for
    pub platform: TargetPlatform,

    /// Build profile
    pub profile: Profile,

    /// Profile name
    pub profile_name: String,

    /// Project root
    pub root: PathBuf,

    /// Output directories
    pub layout: TargetLayout,

    /// Extra flags from `toolchain.toml`
    pub toolchain_flags: ToolchainFlags,
}

/// Flags from the `[toolchain]` table appended after profile flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainFlags {
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl ToolchainFlags {
    pub fn from_config(config: &ToolchainConfig) -> Self {
        ToolchainFlags {
            cflags: config.toolchain.cflags.clone(),
            cxxflags: config.toolchain.cxxflags.clone(),
            ldflags: config.toolchain.ldflags.clone(),
        }
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("toolchain", &self.toolchain.family())
            .field("compiler", &self.compiler)
            .field("platform", &self.platform)
            .field("profile", &self.profile)
            .field("profile_name", &self.profile_name)
            .field("root", &self.root)
            .field("layout", &self.layout)
            .field("toolchain_flags", &self.toolchain_flags)
            .finish()
    }
}

impl BuildContext {
    /// Detect the toolchain and create a build context for `root`.
    pub fn new(
        root: &Path,
        profile_name: &str,
        profile: Profile,
        config: &ToolchainConfig,
    ) -> Result<Self> {
        let toolchain: Arc<dyn Toolchain> = Arc::from(detect_toolchain(config)?);
        let compiler = detect_compiler_identity(toolchain.as_ref());

        tracing::debug!(
            "Using {} at {}",
            compiler,
            toolchain.compiler_path().display()
        );

        Ok(Self::with_toolchain(
            toolchain,
            compiler,
            TargetPlatform::host(),
            root,
            profile_name,
            profile,
            ToolchainFlags::from_config(config),
        ))
    }

    /// Create a context around an already constructed toolchain.
    pub fn with_toolchain(
        toolchain: Arc<dyn Toolchain>,
        compiler: CompilerIdentity,
        platform: TargetPlatform,
        root: &Path,
        profile_name: &str,
        profile: Profile,
        toolchain_flags: ToolchainFlags,
    ) -> Self {
        BuildContext {
            toolchain,
            compiler,
            platform,
            profile,
            profile_name: profile_name.to_string(),
            root: root.to_path_buf(),
            layout: TargetLayout::new(root, profile_name),
            toolchain_flags,
        }
    }

    /// Compiler flags from the profile and toolchain config for `lang`.
    pub fn profile_cflags(&self, lang: Language) -> Vec<String> {
        let mut flags = self.toolchain.profile_cflags(&self.profile);
        flags.extend(self.toolchain_flags.cflags.iter().cloned());
        if lang == Language::Cxx {
            flags.extend(self.toolchain_flags.cxxflags.iter().cloned());
        }
        flags
    }

    /// Linker flags from the profile and toolchain config.
    pub fn profile_ldflags(&self) -> Vec<String> {
        let mut flags = self.toolchain.profile_ldflags(&self.profile);
        flags.extend(self.toolchain_flags.ldflags.iter().cloned());
        flags
    }

    /// Object directory of a unit.
    pub fn unit_obj_dir(&self, unit: &BuildUnit) -> PathBuf {
        self.layout.obj_dir.join(unit.dir_name())
    }

    /// Path of a helper library's static archive.
    pub fn helper_lib_path(&self, name: &str) -> PathBuf {
        self.layout
            .deps_dir
            .join(self.toolchain.static_lib_file_name(name))
    }

    /// Where a linked extension lands inside the target directory.
    pub fn module_output_path(&self, install_path: &Path) -> PathBuf {
        self.layout.lib_dir.join(install_path)
    }

    /// Path of the generated linker version script for a unit.
    pub fn version_script_path(&self, unit: &BuildUnit) -> PathBuf {
        self.layout
            .exports_dir
            .join(format!("{}.map", unit.dir_name()))
    }

    /// Check if this is a release build.
    pub fn is_release(&self) -> bool {
        self.profile_name == "release"
    }

    /// Get the active toolchain.
    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }
}

/// Detect the compiler identity from its version banner.
fn detect_compiler_identity(toolchain: &dyn Toolchain) -> CompilerIdentity {
    let family = toolchain.family();
    let cc = toolchain.compiler_path();

    // cl prints its banner to stderr when run without arguments
    let output = if family == CompilerFamily::Msvc {
        ProcessBuilder::new(cc).exec()
    } else {
        ProcessBuilder::new(cc).arg("--version").exec()
    };

    let version = output.ok().and_then(|output| {
        let mut banner = String::from_utf8_lossy(&output.stdout).into_owned();
        banner.push_str(&String::from_utf8_lossy(&output.stderr));
        version_from_banner(&banner)
    });

    if version.is_none() {
        tracing::debug!("Could not determine version of {}", cc.display());
    }

    CompilerIdentity::new(family, version)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::builder::toolchain::{GccToolchain, MsvcToolchain};
    use crate::core::platform::TargetOs;

    /// A GCC context on Linux rooted at `root`.
    pub(crate) fn gcc_context(root: &Path, profile: Profile) -> BuildContext {
        let toolchain = Arc::new(GccToolchain::new(
            PathBuf::from("gcc"),
            PathBuf::from("g++"),
            PathBuf::from("ar"),
            CompilerFamily::Gcc,
        ));

        BuildContext::with_toolchain(
            toolchain,
            CompilerIdentity::new(CompilerFamily::Gcc, Some(semver::Version::new(13, 2, 0))),
            TargetPlatform::new(TargetOs::Linux),
            root,
            "debug",
            profile,
            ToolchainFlags::default(),
        )
    }

    #[test]
    fn test_layout() {
        let layout = TargetLayout::new(Path::new("/proj"), "release");
        assert_eq!(layout.dir, PathBuf::from("/proj/.keel/target/release"));
        assert_eq!(layout.obj_dir, PathBuf::from("/proj/.keel/target/release/obj"));
        assert_eq!(
            layout.fingerprints,
            PathBuf::from("/proj/.keel/target/release/fingerprints.json")
        );
    }

    #[test]
    fn test_profile_flags_include_toolchain_config() {
        let mut ctx = gcc_context(Path::new("/proj"), Profile::debug());
        ctx.toolchain_flags = ToolchainFlags {
            cflags: vec!["-Wall".to_string()],
            cxxflags: vec!["-Wextra".to_string()],
            ldflags: vec!["-Wl,--as-needed".to_string()],
        };

        assert_eq!(ctx.profile_cflags(Language::C), vec!["-O0", "-g", "-Wall"]);
        assert_eq!(
            ctx.profile_cflags(Language::Cxx),
            vec!["-O0", "-g", "-Wall", "-Wextra"]
        );
        assert_eq!(ctx.profile_ldflags(), vec!["-Wl,--as-needed"]);
    }

    #[test]
    fn test_profile_flags_use_toolchain_dialect() {
        let toolchain = Arc::new(MsvcToolchain::new(
            PathBuf::from("cl"),
            PathBuf::from("lib"),
            PathBuf::from("link"),
        ));
        let ctx = BuildContext::with_toolchain(
            toolchain,
            CompilerIdentity::new(CompilerFamily::Msvc, None),
            TargetPlatform::new(TargetOs::Windows),
            Path::new("C:/proj"),
            "release",
            Profile::release(),
            ToolchainFlags::default(),
        );

        assert_eq!(ctx.profile_cflags(Language::C), vec!["/O2"]);
        assert!(ctx.is_release());
        assert_eq!(
            ctx.helper_lib_path("mylib"),
            Path::new("C:/proj/.keel/target/release/deps").join("mylib.lib")
        );
    }

    #[test]
    fn test_compiler_identity_display() {
        let id = CompilerIdentity::new(CompilerFamily::Clang, Some(semver::Version::new(17, 0, 6)));
        assert_eq!(id.to_string(), "clang-17.0.6");
        assert_eq!(
            CompilerIdentity::new(CompilerFamily::Gcc, None).to_string(),
            "gcc-unknown"
        );
    }
}
