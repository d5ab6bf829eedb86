//! Toolchain detection functions.

use std::path::{Path, PathBuf};

use anyhow::Result;
use which::which;

use crate::util::config::ToolchainConfig;
use crate::util::diagnostic::NoToolchainError;
use crate::util::process::ProcessBuilder;

use super::{CompilerFamily, EnvWrapper, GccToolchain, MsvcToolchain, Toolchain};

/// Detect the available toolchain.
///
/// Tries to find a C compiler and related tools with the following priority:
/// 1. Toolchain config (`cc`, `cxx`, `ar` in `toolchain.toml`)
/// 2. Environment variables (CC, CXX, AR)
/// 3. On Windows, `cl`/`lib`/`link` from an already configured developer prompt
/// 4. `cc`/`gcc`/`clang` plus `ar` on PATH
///
/// Fails with [`NoToolchainError`] when nothing usable is found.
///
/// Environment variables from the config's `env` table are injected into
/// every command of the detected toolchain.
pub fn detect_toolchain(config: &ToolchainConfig) -> Result<Box<dyn Toolchain>> {
    let env: Vec<(String, String)> = config
        .toolchain
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(toolchain) = try_detect_from_config(config) {
        return Ok(wrap(toolchain, env));
    }

    if cfg!(target_os = "windows") {
        if let Some(toolchain) = try_detect_msvc() {
            return Ok(wrap(toolchain, env));
        }
    }

    if let Some(toolchain) = try_detect_gcc() {
        return Ok(wrap(toolchain, env));
    }

    Err(NoToolchainError.into())
}

fn wrap<T: Toolchain + 'static>(toolchain: T, env: Vec<(String, String)>) -> Box<dyn Toolchain> {
    if env.is_empty() {
        Box::new(toolchain)
    } else {
        Box::new(EnvWrapper::new(toolchain, env))
    }
}

/// Try to create a toolchain from config file settings.
fn try_detect_from_config(config: &ToolchainConfig) -> Option<GccToolchain> {
    let tc = &config.toolchain;

    let cc = tc.cc.clone()?;
    if !cc.exists() && which(&cc).is_err() {
        tracing::warn!("Configured C compiler not found: {}", cc.display());
        return None;
    }

    let cxx = tc
        .cxx
        .clone()
        .or_else(|| env_path("CXX"))
        .unwrap_or_else(|| GccToolchain::infer_cxx(&cc));

    let Some(ar) = tc
        .ar
        .clone()
        .or_else(|| env_path("AR"))
        .or_else(|| which("ar").ok())
        .or_else(|| which("llvm-ar").ok())
    else {
        tracing::warn!("Archiver (ar) not found");
        return None;
    };

    let family = detect_compiler_family(&cc);

    tracing::debug!(
        "Using toolchain from config: cc={}, ar={}",
        cc.display(),
        ar.display()
    );

    Some(GccToolchain::new(cc, cxx, ar, family))
}

/// Use MSVC when running inside a configured developer environment.
///
/// Visual Studio installations are not searched; `cl` must already be on
/// PATH with INCLUDE and LIB set.
fn try_detect_msvc() -> Option<MsvcToolchain> {
    let cl = which("cl").ok()?;
    if std::env::var_os("INCLUDE").is_none() || std::env::var_os("LIB").is_none() {
        tracing::debug!("cl.exe found but INCLUDE/LIB are not set");
        return None;
    }

    let lib = which("lib").ok()?;
    let link = which("link").ok()?;
    Some(MsvcToolchain::new(cl, lib, link))
}

/// Try to detect GCC/Clang toolchain.
fn try_detect_gcc() -> Option<GccToolchain> {
    let cc = env_path("CC").or_else(|| {
        which("cc")
            .or_else(|_| which("gcc"))
            .or_else(|_| which("clang"))
            .ok()
    })?;

    let cxx = env_path("CXX").unwrap_or_else(|| {
        which("c++")
            .or_else(|_| which("g++"))
            .or_else(|_| which("clang++"))
            .unwrap_or_else(|_| GccToolchain::infer_cxx(&cc))
    });

    let ar = env_path("AR").or_else(|| which("ar").ok())?;

    let family = detect_compiler_family(&cc);

    Some(GccToolchain::new(cc, cxx, ar, family))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Detect whether the compiler is GCC, Clang, or Apple Clang.
///
/// The binary name decides when it is unambiguous; otherwise the
/// `--version` banner is consulted. Unknown compilers are treated as GCC.
pub fn detect_compiler_family(cc: &Path) -> CompilerFamily {
    let name = cc
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name == "cl" || name == "cl.exe" {
        return CompilerFamily::Msvc;
    }

    let banner = version_banner(cc);

    if name.contains("clang") || banner.contains("clang") {
        if banner.contains("apple") {
            return CompilerFamily::AppleClang;
        }
        return CompilerFamily::Clang;
    }

    CompilerFamily::Gcc
}

fn version_banner(cc: &Path) -> String {
    ProcessBuilder::new(cc)
        .arg("--version")
        .exec()
        .map(|output| String::from_utf8_lossy(&output.stdout).to_lowercase())
        .unwrap_or_default()
}
