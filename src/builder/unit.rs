//! Normalized build units produced by the resolver.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::extension::{Define, ModuleName, Visibility};
use crate::core::language::{CppStandard, Language};

/// What a unit produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    /// Helper static library linked into extensions
    HelperLib,
    /// Loadable extension module
    Extension,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::HelperLib => "library",
            UnitKind::Extension => "extension",
        }
    }
}

/// A source file with its language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    pub language: Language,
}

/// Symbols a unit must export and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSpec {
    /// Symbols exported from the linked module, in declaration order
    pub symbols: Vec<String>,
    /// Macro defined to the toolchain's export attribute
    pub macro_name: Option<String>,
    pub visibility: Visibility,
}

/// A fully resolved unit, ready for planning.
///
/// All paths are absolute.
#[derive(Debug, Clone, Serialize)]
pub struct BuildUnit {
    /// Declared name (dotted for extensions)
    pub name: String,

    pub kind: UnitKind,

    /// Module name, for extensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleName>,

    pub sources: Vec<SourceFile>,

    /// Language used to link (C++ if any source is C++)
    pub link_language: Language,

    pub cpp_std: Option<CppStandard>,

    pub include_dirs: Vec<PathBuf>,

    pub defines: Vec<Define>,

    pub undefines: Vec<String>,

    pub library_dirs: Vec<PathBuf>,

    /// Declared helper libraries this unit links directly
    pub helper_libs: Vec<String>,

    /// External libraries passed to the linker as-is
    pub system_libs: Vec<String>,

    pub extra_compile_args: Vec<String>,

    pub extra_link_args: Vec<String>,

    pub exports: ExportSpec,

    /// Extra files whose contents are part of every compile fingerprint
    pub depends: Vec<PathBuf>,

    pub optional: bool,

    /// Relative install location of an extension (e.g. `pkg/mod.so`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
}

impl BuildUnit {
    pub fn is_extension(&self) -> bool {
        self.kind == UnitKind::Extension
    }

    /// Directory name for this unit's objects; dotted names keep their dots.
    pub fn dir_name(&self) -> &str {
        &self.name
    }

    /// Whether any source of this unit is C++.
    pub fn has_cxx(&self) -> bool {
        self.sources.iter().any(|s| s.language == Language::Cxx)
    }

    /// Relative install path, or the bare file name for helper libraries.
    pub fn install_path(&self) -> Option<&Path> {
        self.install_path.as_deref()
    }
}
