//! MSVC toolchain implementation.

use std::path::{Path, PathBuf};

use crate::core::extension::Visibility;
use crate::core::language::Language;
use crate::core::manifest::Profile;
use crate::core::platform::TargetPlatform;

use super::{
    ArchiveInput, CommandSpec, CompileInput, CompilerFamily, CxxOptions, LinkInput, Toolchain,
};

/// MSVC toolchain (Windows).
#[derive(Debug, Clone)]
pub struct MsvcToolchain {
    /// Path to cl.exe (compiler)
    pub cl: PathBuf,
    /// Path to lib.exe (librarian)
    pub lib: PathBuf,
    /// Path to link.exe (linker)
    pub link: PathBuf,
}

impl MsvcToolchain {
    /// Create a new MSVC toolchain.
    pub fn new(cl: PathBuf, lib: PathBuf, link: PathBuf) -> Self {
        MsvcToolchain { cl, lib, link }
    }
}

impl Toolchain for MsvcToolchain {
    fn family(&self) -> CompilerFamily {
        CompilerFamily::Msvc
    }

    fn compiler_path(&self) -> &Path {
        &self.cl
    }

    fn cxx_compiler_path(&self) -> &Path {
        // cl.exe compiles both languages
        &self.cl
    }

    fn archiver_path(&self) -> &Path {
        &self.lib
    }

    fn compile_command(
        &self,
        input: &CompileInput,
        lang: Language,
        cxx_opts: Option<&CxxOptions>,
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cl).arg("/nologo").arg("/c");

        match lang {
            Language::C => cmd = cmd.arg("/TC"),
            Language::Cxx => {
                cmd = cmd.arg("/TP").arg("/EHsc");
                if let Some(std) = cxx_opts.and_then(|opts| opts.std) {
                    cmd = cmd.arg(format!("/std:{}", std.as_msvc_flag_value()));
                }
            }
        }

        // Extension modules are loaded into a host built against the release CRT
        cmd = cmd.arg("/MD");

        for dir in &input.include_dirs {
            cmd = cmd.arg(format!("/I{}", dir.display()));
        }

        for define in &input.defines {
            cmd = cmd.arg(format!("/D{}", define));
        }

        for name in &input.undefines {
            cmd = cmd.arg(format!("/U{}", name));
        }

        cmd = cmd.args(input.cflags.iter().cloned());

        cmd.arg(input.source.display().to_string())
            .arg(format!("/Fo{}", input.output.display()))
    }

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec {
        CommandSpec::new(&self.lib)
            .arg("/nologo")
            .arg(format!("/OUT:{}", input.output.display()))
            .args(input.objects.iter().map(|obj| obj.display().to_string()))
    }

    fn link_shared_command(
        &self,
        input: &LinkInput,
        _driver: Language,
        _platform: &TargetPlatform,
    ) -> CommandSpec {
        // link.exe links C and C++ alike
        let mut cmd = CommandSpec::new(&self.link)
            .arg("/nologo")
            .arg("/DLL")
            .arg(format!("/OUT:{}", input.output.display()))
            .args(input.objects.iter().map(|obj| obj.display().to_string()));

        for dir in &input.lib_dirs {
            cmd = cmd.arg(format!("/LIBPATH:{}", dir.display()));
        }

        for lib in &input.libs {
            cmd = cmd.arg(format!("{}.lib", lib));
        }

        cmd.args(input.ldflags.iter().cloned())
    }

    fn profile_cflags(&self, profile: &Profile) -> Vec<String> {
        let mut flags = Vec::new();

        match profile.opt_level.as_deref() {
            None => {}
            Some("0") => flags.push("/Od".to_string()),
            Some("1") | Some("s") | Some("z") => flags.push("/O1".to_string()),
            Some(_) => flags.push("/O2".to_string()),
        }

        if !matches!(profile.debug.as_deref(), None | Some("0")) {
            flags.push("/Zi".to_string());
        }

        if profile.lto == Some(true) {
            flags.push("/GL".to_string());
        }

        for sanitizer in &profile.sanitizers {
            if sanitizer == "address" {
                flags.push("/fsanitize=address".to_string());
            } else {
                tracing::warn!("MSVC does not support the `{}` sanitizer", sanitizer);
            }
        }

        flags.extend(profile.cflags.iter().cloned());
        flags
    }

    fn profile_ldflags(&self, profile: &Profile) -> Vec<String> {
        let mut flags = Vec::new();

        if !matches!(profile.debug.as_deref(), None | Some("0")) {
            flags.push("/DEBUG".to_string());
        }

        if profile.lto == Some(true) {
            flags.push("/LTCG".to_string());
        }

        flags.extend(profile.ldflags.iter().cloned());
        flags
    }

    fn export_attribute(&self, _platform: &TargetPlatform) -> &'static str {
        "__declspec(dllexport)"
    }

    fn visibility_flags(
        &self,
        _visibility: Visibility,
        _exports: &[String],
        _platform: &TargetPlatform,
    ) -> Vec<String> {
        // DLLs export nothing unless asked to
        Vec::new()
    }

    fn pic_flags(&self, _platform: &TargetPlatform) -> Vec<String> {
        Vec::new()
    }

    fn needs_version_script(
        &self,
        _visibility: Visibility,
        _exports: &[String],
        _platform: &TargetPlatform,
    ) -> bool {
        false
    }

    fn export_link_args(
        &self,
        symbols: &[String],
        _visibility: Visibility,
        _platform: &TargetPlatform,
        _version_script: Option<&Path>,
    ) -> Vec<String> {
        symbols
            .iter()
            .map(|sym| format!("/EXPORT:{}", sym))
            .collect()
    }

    fn object_extension(&self) -> &str {
        "obj"
    }

    fn static_lib_extension(&self) -> &str {
        "lib"
    }

    fn static_lib_prefix(&self) -> &str {
        ""
    }
}
