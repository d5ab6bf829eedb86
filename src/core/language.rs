//! Source languages and C++ standards.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source language of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    C,
    #[serde(rename = "c++", alias = "cpp", alias = "cxx")]
    Cxx,
}

impl Language {
    /// Get the language name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
        }
    }

    /// Infer the language of a source file from its extension.
    ///
    /// `.C` (upper case) is C++ by GCC convention; everything else is
    /// matched case-sensitively too.
    pub fn from_path(path: &Path) -> Option<Language> {
        match path.extension()?.to_str()? {
            "c" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "c++" | "C" => Some(Language::Cxx),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// C++ standard version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CppStandard {
    #[serde(rename = "11", alias = "c++11")]
    Cpp11,
    #[serde(rename = "14", alias = "c++14")]
    Cpp14,
    #[serde(rename = "17", alias = "c++17")]
    Cpp17,
    #[serde(rename = "20", alias = "c++20")]
    Cpp20,
    #[serde(rename = "23", alias = "c++23")]
    Cpp23,
}

impl CppStandard {
    /// GCC/Clang spelling, used as `-std=<value>`.
    pub fn as_flag_value(&self) -> &'static str {
        match self {
            CppStandard::Cpp11 => "c++11",
            CppStandard::Cpp14 => "c++14",
            CppStandard::Cpp17 => "c++17",
            CppStandard::Cpp20 => "c++20",
            CppStandard::Cpp23 => "c++23",
        }
    }

    /// MSVC spelling, used as `/std:<value>`.
    ///
    /// MSVC has no C++11 mode; its oldest selectable standard is C++14.
    pub fn as_msvc_flag_value(&self) -> &'static str {
        match self {
            CppStandard::Cpp11 | CppStandard::Cpp14 => "c++14",
            CppStandard::Cpp17 => "c++17",
            CppStandard::Cpp20 => "c++20",
            CppStandard::Cpp23 => "c++latest",
        }
    }
}

/// Error returned when parsing an invalid C++ standard string.
#[derive(Debug, Clone, Error)]
#[error("invalid C++ standard '{0}', valid values: 11, 14, 17, 20, 23")]
pub struct CppStandardParseError(pub String);

impl std::str::FromStr for CppStandard {
    type Err = CppStandardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "11" | "c++11" => Ok(CppStandard::Cpp11),
            "14" | "c++14" => Ok(CppStandard::Cpp14),
            "17" | "c++17" => Ok(CppStandard::Cpp17),
            "20" | "c++20" => Ok(CppStandard::Cpp20),
            "23" | "c++23" => Ok(CppStandard::Cpp23),
            _ => Err(CppStandardParseError(s.to_string())),
        }
    }
}

impl std::fmt::Display for CppStandard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C++{}", &self.as_flag_value()[3..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("foo/foo.c")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("a.cpp")), Some(Language::Cxx));
        assert_eq!(Language::from_path(Path::new("a.cc")), Some(Language::Cxx));
        assert_eq!(Language::from_path(Path::new("a.C")), Some(Language::Cxx));
        assert_eq!(Language::from_path(Path::new("a.h")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_language_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            language: Language,
        }
        let w: Wrapper = toml::from_str("language = \"c++\"").unwrap();
        assert_eq!(w.language, Language::Cxx);
        let w: Wrapper = toml::from_str("language = \"c\"").unwrap();
        assert_eq!(w.language, Language::C);
    }

    #[test]
    fn test_cpp_standard() {
        assert_eq!("17".parse::<CppStandard>().unwrap(), CppStandard::Cpp17);
        assert_eq!("c++20".parse::<CppStandard>().unwrap(), CppStandard::Cpp20);
        assert!("98".parse::<CppStandard>().is_err());
        assert_eq!(CppStandard::Cpp11.as_msvc_flag_value(), "c++14");
        assert_eq!(CppStandard::Cpp23.to_string(), "C++23");
    }
}
