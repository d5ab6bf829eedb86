//! GCC/Clang toolchain implementation.

use std::path::{Path, PathBuf};

use crate::core::extension::Visibility;
use crate::core::language::Language;
use crate::core::manifest::Profile;
use crate::core::platform::TargetPlatform;

use super::{
    ArchiveInput, CommandSpec, CompileInput, CompilerFamily, CxxOptions, LinkInput, Toolchain,
};

/// GCC/Clang toolchain.
#[derive(Debug, Clone)]
pub struct GccToolchain {
    /// Path to the C compiler
    pub cc: PathBuf,
    /// Path to the C++ compiler
    pub cxx: PathBuf,
    /// Path to the archiver
    pub ar: PathBuf,
    /// Compiler family (gcc, clang, apple-clang)
    pub family: CompilerFamily,
}

impl GccToolchain {
    /// Create a new GCC-style toolchain.
    pub fn new(cc: PathBuf, cxx: PathBuf, ar: PathBuf, family: CompilerFamily) -> Self {
        GccToolchain {
            cc,
            cxx,
            ar,
            family,
        }
    }

    /// Infer C++ compiler path from C compiler path.
    ///
    /// Handles common patterns:
    /// - gcc, x86_64-linux-gnu-gcc -> g++, x86_64-linux-gnu-g++
    /// - clang -> clang++
    /// - cc, /usr/bin/cc -> c++, /usr/bin/c++
    pub fn infer_cxx(cc: &Path) -> PathBuf {
        let cc_str = cc.to_string_lossy();

        if let Some(prefix) = cc_str.strip_suffix("gcc") {
            return PathBuf::from(format!("{}g++", prefix));
        }

        if cc_str.ends_with("clang") {
            return PathBuf::from(format!("{}++", cc_str));
        }

        // "cc" only as a whole basename, not "mycc"
        let is_standalone_cc = cc_str == "cc"
            || cc_str.ends_with("/cc")
            || cc_str.ends_with("\\cc")
            || cc_str.ends_with("-cc");

        if let Some(prefix) = cc_str.strip_suffix("cc").filter(|_| is_standalone_cc) {
            return PathBuf::from(format!("{}c++", prefix));
        }

        PathBuf::from(format!("{}++", cc_str))
    }

    fn driver(&self, lang: Language) -> &Path {
        match lang {
            Language::C => &self.cc,
            Language::Cxx => &self.cxx,
        }
    }
}

impl Toolchain for GccToolchain {
    fn family(&self) -> CompilerFamily {
        self.family
    }

    fn compiler_path(&self) -> &Path {
        &self.cc
    }

    fn cxx_compiler_path(&self) -> &Path {
        &self.cxx
    }

    fn archiver_path(&self) -> &Path {
        &self.ar
    }

    fn compile_command(
        &self,
        input: &CompileInput,
        lang: Language,
        cxx_opts: Option<&CxxOptions>,
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.driver(lang)).arg("-c");

        if lang == Language::Cxx {
            if let Some(std) = cxx_opts.and_then(|opts| opts.std) {
                cmd = cmd.arg(format!("-std={}", std.as_flag_value()));
            }
        }

        for dir in &input.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }

        for define in &input.defines {
            cmd = cmd.arg(format!("-D{}", define));
        }

        for name in &input.undefines {
            cmd = cmd.arg(format!("-U{}", name));
        }

        cmd = cmd.args(input.cflags.iter().cloned());

        cmd.arg(input.source.display().to_string())
            .arg("-o")
            .arg(input.output.display().to_string())
    }

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec {
        // Create archive with symbol index, replace files
        CommandSpec::new(&self.ar)
            .arg("rcs")
            .arg(input.output.display().to_string())
            .args(input.objects.iter().map(|obj| obj.display().to_string()))
    }

    fn link_shared_command(
        &self,
        input: &LinkInput,
        driver: Language,
        platform: &TargetPlatform,
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.driver(driver)).arg("-shared");

        // Loadable modules resolve host symbols when they are imported.
        if platform.is_macos() {
            cmd = cmd.arg("-Wl,-undefined,dynamic_lookup");
        }

        cmd = cmd
            .arg("-o")
            .arg(input.output.display().to_string())
            .args(input.objects.iter().map(|obj| obj.display().to_string()));

        for dir in &input.lib_dirs {
            cmd = cmd.arg(format!("-L{}", dir.display()));
        }

        for lib in &input.libs {
            cmd = cmd.arg(format!("-l{}", lib));
        }

        cmd.args(input.ldflags.iter().cloned())
    }

    fn profile_cflags(&self, profile: &Profile) -> Vec<String> {
        let mut flags = Vec::new();

        if let Some(ref opt) = profile.opt_level {
            flags.push(format!("-O{}", opt));
        }

        match profile.debug.as_deref() {
            None | Some("0") => {}
            Some("1") => flags.push("-g1".to_string()),
            Some(_) => flags.push("-g".to_string()),
        }

        if profile.lto == Some(true) {
            flags.push("-flto".to_string());
        }

        for sanitizer in &profile.sanitizers {
            flags.push(format!("-fsanitize={}", sanitizer));
        }

        flags.extend(profile.cflags.iter().cloned());
        flags
    }

    fn profile_ldflags(&self, profile: &Profile) -> Vec<String> {
        let mut flags = Vec::new();

        if profile.lto == Some(true) {
            flags.push("-flto".to_string());
        }

        // Sanitizer runtimes are pulled in by the driver at link time
        for sanitizer in &profile.sanitizers {
            flags.push(format!("-fsanitize={}", sanitizer));
        }

        flags.extend(profile.ldflags.iter().cloned());
        flags
    }

    fn export_attribute(&self, platform: &TargetPlatform) -> &'static str {
        if platform.is_windows() {
            "__attribute__((dllexport))"
        } else {
            "__attribute__((visibility(\"default\")))"
        }
    }

    fn visibility_flags(
        &self,
        visibility: Visibility,
        exports: &[String],
        platform: &TargetPlatform,
    ) -> Vec<String> {
        // PE/COFF has no ELF visibility; exports come from dllexport.
        // A symbol hidden at compile time cannot be exported by the linker,
        // so units with an export list are restricted at link time instead.
        match visibility {
            Visibility::Hidden if !platform.is_windows() && exports.is_empty() => {
                vec!["-fvisibility=hidden".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn pic_flags(&self, platform: &TargetPlatform) -> Vec<String> {
        if platform.is_windows() {
            Vec::new()
        } else {
            vec!["-fPIC".to_string()]
        }
    }

    fn needs_version_script(
        &self,
        visibility: Visibility,
        exports: &[String],
        platform: &TargetPlatform,
    ) -> bool {
        visibility == Visibility::Hidden
            && !exports.is_empty()
            && !platform.is_windows()
            && !platform.is_macos()
    }

    fn export_link_args(
        &self,
        symbols: &[String],
        visibility: Visibility,
        platform: &TargetPlatform,
        version_script: Option<&Path>,
    ) -> Vec<String> {
        if visibility == Visibility::Default || symbols.is_empty() || platform.is_windows() {
            return Vec::new();
        }

        if platform.is_macos() {
            // Mach-O symbol names carry a leading underscore
            return symbols
                .iter()
                .map(|sym| format!("-Wl,-exported_symbol,_{}", sym))
                .collect();
        }

        match version_script {
            Some(path) => vec![format!("-Wl,--version-script={}", path.display())],
            None => Vec::new(),
        }
    }

    fn object_extension(&self) -> &str {
        "o"
    }

    fn static_lib_extension(&self) -> &str {
        "a"
    }

    fn static_lib_prefix(&self) -> &str {
        "lib"
    }
}
