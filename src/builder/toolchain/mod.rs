//! Toolchain abstraction for C/C++ compilers.
//!
//! This module provides a unified interface for generating compiler,
//! archiver and linker commands across toolchains (GCC, Clang, MSVC),
//! including the flags that control which symbols a built extension exports.
//!
//! Toolchain detection priority:
//! 1. Toolchain config file (`.keel/toolchain.toml` or `~/.keel/toolchain.toml`)
//! 2. Environment variables (CC, CXX, AR)
//! 3. Searching PATH for common compilers

use std::path::{Path, PathBuf};

use crate::core::extension::{Define, Visibility};
use crate::core::language::{CppStandard, Language};
use crate::core::manifest::Profile;
use crate::core::platform::TargetPlatform;
use crate::util::process::ProcessBuilder;

mod detect;
mod gcc;
mod msvc;

pub use detect::{detect_compiler_family, detect_toolchain};
pub use gcc::GccToolchain;
pub use msvc::MsvcToolchain;

/// C++ compilation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CxxOptions {
    /// Requested C++ standard, if any
    pub std: Option<CppStandard>,
}

/// A command to execute, with program, arguments, and environment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "cl.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Convert into a runnable process.
    pub fn to_process(&self) -> ProcessBuilder {
        let mut pb = ProcessBuilder::new(&self.program).args(&self.args);
        for (key, value) in &self.env {
            pb = pb.env(key, value);
        }
        pb
    }

    /// The command line as a single shell-like string.
    pub fn display(&self) -> String {
        self.to_process().display_command()
    }
}

/// Input for a compile step.
#[derive(Debug, Clone, Default)]
pub struct CompileInput {
    /// Source file to compile
    pub source: PathBuf,
    /// Output object file
    pub output: PathBuf,
    /// Include directories
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor defines
    pub defines: Vec<Define>,
    /// Macros to undefine after the defines
    pub undefines: Vec<String>,
    /// Additional compiler flags
    pub cflags: Vec<String>,
}

/// Input for an archive step (creating a static library).
#[derive(Debug, Clone)]
pub struct ArchiveInput {
    /// Object files to archive
    pub objects: Vec<PathBuf>,
    /// Output archive file
    pub output: PathBuf,
}

/// Input for linking a shared module.
#[derive(Debug, Clone, Default)]
pub struct LinkInput {
    /// Object files to link
    pub objects: Vec<PathBuf>,
    /// Output file
    pub output: PathBuf,
    /// Library search paths
    pub lib_dirs: Vec<PathBuf>,
    /// Libraries to link (without -l prefix or extension)
    pub libs: Vec<String>,
    /// Additional linker flags
    pub ldflags: Vec<String>,
}

/// The family of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
}

impl CompilerFamily {
    /// Get the family name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Msvc => "msvc",
        }
    }

}

impl std::fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a GNU ld version script that keeps `symbols` global and hides
/// everything else.
pub fn version_script(symbols: &[String]) -> String {
    let mut script = String::from("{\n  global:\n");
    for symbol in symbols {
        script.push_str(&format!("    {};\n", symbol));
    }
    script.push_str("  local:\n    *;\n};\n");
    script
}

/// Trait for toolchain implementations.
///
/// Each toolchain knows how to generate commands for its specific compiler,
/// and how to express symbol visibility in its own dialect.
pub trait Toolchain: Send + Sync {
    /// Get the compiler family.
    fn family(&self) -> CompilerFamily;

    /// Get the C compiler path.
    fn compiler_path(&self) -> &Path;

    /// Get the C++ compiler path.
    fn cxx_compiler_path(&self) -> &Path;

    /// Get the archiver path.
    fn archiver_path(&self) -> &Path;

    /// Generate a compile command.
    ///
    /// `cxx_opts` is only consulted when `lang` is C++.
    fn compile_command(
        &self,
        input: &CompileInput,
        lang: Language,
        cxx_opts: Option<&CxxOptions>,
    ) -> CommandSpec;

    /// Generate an archive command (create static library).
    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec;

    /// Generate a link command for a loadable shared module.
    ///
    /// `driver` selects the C or C++ driver on GCC-style toolchains so the
    /// right runtime is linked.
    fn link_shared_command(
        &self,
        input: &LinkInput,
        driver: Language,
        platform: &TargetPlatform,
    ) -> CommandSpec;

    /// Compiler flags for a build profile.
    fn profile_cflags(&self, profile: &Profile) -> Vec<String>;

    /// Linker flags for a build profile.
    fn profile_ldflags(&self, profile: &Profile) -> Vec<String>;

    /// Value an export macro expands to, mirroring the usual
    /// `MYLIB_EXPORT` header guard.
    fn export_attribute(&self, platform: &TargetPlatform) -> &'static str;

    /// Compiler flags implementing a unit's visibility policy, given the
    /// symbols the unit must export.
    fn visibility_flags(
        &self,
        visibility: Visibility,
        exports: &[String],
        platform: &TargetPlatform,
    ) -> Vec<String>;

    /// Flags needed for position-independent code.
    fn pic_flags(&self, platform: &TargetPlatform) -> Vec<String>;

    /// Whether restricting a unit to `exports` on `platform` needs a
    /// version script.
    fn needs_version_script(
        &self,
        visibility: Visibility,
        exports: &[String],
        platform: &TargetPlatform,
    ) -> bool;

    /// Linker arguments that export `symbols` from a shared module.
    ///
    /// `version_script` is the path the script was written to when
    /// [`Toolchain::needs_version_script`] is true.
    fn export_link_args(
        &self,
        symbols: &[String],
        visibility: Visibility,
        platform: &TargetPlatform,
        version_script: Option<&Path>,
    ) -> Vec<String>;

    /// Get the object file extension.
    fn object_extension(&self) -> &str;

    /// Get the static library extension.
    fn static_lib_extension(&self) -> &str;

    /// Get the static library prefix (e.g., "lib" on Unix).
    fn static_lib_prefix(&self) -> &str;

    /// File name of the static library called `name`.
    fn static_lib_file_name(&self, name: &str) -> String {
        format!(
            "{}{}.{}",
            self.static_lib_prefix(),
            name,
            self.static_lib_extension()
        )
    }
}

/// A generic wrapper that injects environment variables into all commands.
///
/// This wrapper delegates all `Toolchain` methods to the inner toolchain
/// and adds the configured environment variables to every `CommandSpec`
/// returned.
#[derive(Debug, Clone)]
pub struct EnvWrapper<T> {
    inner: T,
    env_vars: Vec<(String, String)>,
}

impl<T> EnvWrapper<T> {
    /// Create a new environment wrapper.
    pub fn new(inner: T, env_vars: Vec<(String, String)>) -> Self {
        EnvWrapper { inner, env_vars }
    }

    /// Get a reference to the inner toolchain.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn inject_env(&self, mut cmd: CommandSpec) -> CommandSpec {
        for (key, value) in &self.env_vars {
            cmd = cmd.env(key, value);
        }
        cmd
    }
}

impl<T: Toolchain> Toolchain for EnvWrapper<T> {
    fn family(&self) -> CompilerFamily {
        self.inner.family()
    }

    fn compiler_path(&self) -> &Path {
        self.inner.compiler_path()
    }

    fn cxx_compiler_path(&self) -> &Path {
        self.inner.cxx_compiler_path()
    }

    fn archiver_path(&self) -> &Path {
        self.inner.archiver_path()
    }

    fn compile_command(
        &self,
        input: &CompileInput,
        lang: Language,
        cxx_opts: Option<&CxxOptions>,
    ) -> CommandSpec {
        self.inject_env(self.inner.compile_command(input, lang, cxx_opts))
    }

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec {
        self.inject_env(self.inner.archive_command(input))
    }

    fn link_shared_command(
        &self,
        input: &LinkInput,
        driver: Language,
        platform: &TargetPlatform,
    ) -> CommandSpec {
        self.inject_env(self.inner.link_shared_command(input, driver, platform))
    }

    fn profile_cflags(&self, profile: &Profile) -> Vec<String> {
        self.inner.profile_cflags(profile)
    }

    fn profile_ldflags(&self, profile: &Profile) -> Vec<String> {
        self.inner.profile_ldflags(profile)
    }

    fn export_attribute(&self, platform: &TargetPlatform) -> &'static str {
        self.inner.export_attribute(platform)
    }

    fn visibility_flags(
        &self,
        visibility: Visibility,
        exports: &[String],
        platform: &TargetPlatform,
    ) -> Vec<String> {
        self.inner.visibility_flags(visibility, exports, platform)
    }

    fn pic_flags(&self, platform: &TargetPlatform) -> Vec<String> {
        self.inner.pic_flags(platform)
    }

    fn needs_version_script(
        &self,
        visibility: Visibility,
        exports: &[String],
        platform: &TargetPlatform,
    ) -> bool {
        self.inner.needs_version_script(visibility, exports, platform)
    }

    fn export_link_args(
        &self,
        symbols: &[String],
        visibility: Visibility,
        platform: &TargetPlatform,
        version_script: Option<&Path>,
    ) -> Vec<String> {
        self.inner
            .export_link_args(symbols, visibility, platform, version_script)
    }

    fn object_extension(&self) -> &str {
        self.inner.object_extension()
    }

    fn static_lib_extension(&self) -> &str {
        self.inner.static_lib_extension()
    }

    fn static_lib_prefix(&self) -> &str {
        self.inner.static_lib_prefix()
    }
}
