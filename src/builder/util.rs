//! Shared utilities for the builder module.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Parse a version string into semver::Version, handling incomplete versions.
///
/// Handles versions like "13.2.0", "15.0.0-apple", or versions with only
/// major.minor parts such as "19.38".
pub fn parse_version_flexible(version_str: &str) -> Option<semver::Version> {
    // Remove any suffix after the first non-version character
    let clean_version = version_str
        .trim()
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()
        .unwrap_or(version_str);

    if let Ok(v) = clean_version.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = clean_version.split('.').collect();
    let major = parts.first().and_then(|s| s.parse().ok())?;
    let minor = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let patch = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);

    Some(semver::Version::new(major, minor, patch))
}

/// Find the first dotted version number in compiler banner output.
///
/// `gcc (Ubuntu 13.2.0-4ubuntu3) 13.2.0` yields 13.2.0; MSVC's
/// `Version 19.38.33133 for x64` yields 19.38.33133.
pub fn version_from_banner(banner: &str) -> Option<semver::Version> {
    for line in banner.lines() {
        for word in line.split_whitespace() {
            if word.starts_with(|c: char| c.is_ascii_digit()) && word.contains('.') {
                if let Some(version) = parse_version_flexible(word) {
                    return Some(version);
                }
            }
        }
    }
    None
}

/// Severity of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// A single diagnostic line reported by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerMessage {
    pub level: DiagnosticLevel,
    pub file: PathBuf,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

static GCC_DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+?):(?P<line>\d+):(?:(?P<col>\d+):)?\s*(?:fatal\s+)?(?P<level>warning|error):\s*(?P<msg>.*)$")
        .expect("valid regex")
});

static MSVC_DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+?)\((?P<line>\d+)(?:,(?P<col>\d+))?\)\s*:\s*(?:fatal\s+)?(?P<level>warning|error)\s+(?P<code>[A-Z]+\d+)\s*:\s*(?P<msg>.*)$")
        .expect("valid regex")
});

/// Extract warnings and errors from compiler output.
///
/// Both GCC/Clang (`file:line:col: warning: msg`) and MSVC
/// (`file(line): warning C4101: msg`) formats are recognized; other lines
/// such as notes and source excerpts are skipped.
pub fn parse_compiler_messages(output: &str) -> Vec<CompilerMessage> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_end();
            if let Some(caps) = GCC_DIAGNOSTIC.captures(line) {
                return Some(message_from(&caps, caps["msg"].to_string()));
            }
            if let Some(caps) = MSVC_DIAGNOSTIC.captures(line) {
                let message = format!("{}: {}", &caps["code"], &caps["msg"]);
                return Some(message_from(&caps, message));
            }
            None
        })
        .collect()
}

fn message_from(caps: &regex::Captures<'_>, message: String) -> CompilerMessage {
    let level = if &caps["level"] == "error" {
        DiagnosticLevel::Error
    } else {
        DiagnosticLevel::Warning
    };

    CompilerMessage {
        level,
        file: PathBuf::from(&caps["file"]),
        line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
        column: caps.name("col").and_then(|m| m.as_str().parse().ok()),
        message,
    }
}
