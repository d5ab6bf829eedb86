//! Extension and helper-library declarations.
//!
//! These are the raw `[[extension]]` and `[[library]]` tables as written in
//! `Keel.toml`. Validation and path expansion happen in
//! [`crate::builder::resolver`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::language::{CppStandard, Language};

/// Whether `s` is a valid C identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A dotted module path such as `extended.extended`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModuleName(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid module name `{name}`: {reason}")]
pub struct InvalidModuleName {
    pub name: String,
    pub reason: String,
}

impl ModuleName {
    pub fn new(name: &str) -> Result<Self, InvalidModuleName> {
        let invalid = |reason: &str| InvalidModuleName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        for segment in name.split('.') {
            if segment.is_empty() {
                return Err(invalid("empty path segment"));
            }
            if !is_c_identifier(segment) {
                return Err(invalid(&format!(
                    "segment `{}` is not an identifier",
                    segment
                )));
            }
        }

        Ok(ModuleName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, outermost package first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The last segment, which names the shared object itself.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Relative install location: `seg0/seg1/.../leaf<suffix>`.
    pub fn install_path(&self, suffix: &str) -> PathBuf {
        let mut path = PathBuf::new();
        let segments: Vec<&str> = self.segments().collect();
        if let Some((leaf, packages)) = segments.split_last() {
            for package in packages {
                path.push(package);
            }
            path.push(format!("{}{}", leaf, suffix));
        }
        path
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleName {
    type Err = InvalidModuleName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleName::new(s)
    }
}

/// A preprocessor definition: `NAME` or `NAME=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid define `{0}`: macro name must be a C identifier")]
pub struct DefineParseError(pub String);

impl Define {
    pub fn flag(name: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl FromStr for Define {
    type Err = DefineParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (s, None),
        };

        if !is_c_identifier(name) {
            return Err(DefineParseError(s.to_string()));
        }

        Ok(Define {
            name: name.to_string(),
            value,
        })
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// Symbol visibility policy for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Every external symbol is exported.
    #[default]
    Default,
    /// Only the declared exports and symbols tagged with the export macro.
    Hidden,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Default => "default",
            Visibility::Hidden => "hidden",
        }
    }
}

/// A `[[extension]]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExtensionDecl {
    pub name: String,
    pub sources: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub undef_macros: Vec<String>,
    pub library_dirs: Vec<PathBuf>,
    /// Helper library names or system libraries (`m`, `z`, ...).
    pub libraries: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
    pub export_symbols: Vec<String>,
    pub export_macro: Option<String>,
    pub visibility: Visibility,
    pub language: Option<Language>,
    pub cpp_std: Option<CppStandard>,
    /// A failure to build this extension is reported but does not fail the build.
    pub optional: bool,
    /// Extra files whose changes force a rebuild (headers, generated files).
    pub depends: Vec<PathBuf>,
}

/// A `[[library]]` table: a helper static library linked into extensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LibraryDecl {
    pub name: String,
    pub sources: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub export_macro: Option<String>,
    pub language: Option<Language>,
    pub cpp_std: Option<CppStandard>,
    /// Other helper libraries this one needs at link time.
    pub libraries: Vec<String>,
}
