//! In-place installation of built extensions into the source tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::orchestrator::BuildReport;
use crate::util::fs::ensure_dir;

/// Copy every available extension module to `root/<install path>`.
///
/// Returns the installed paths.
pub fn install_inplace(root: &Path, report: &BuildReport) -> Result<Vec<PathBuf>> {
    let mut installed = Vec::new();

    for outcome in report.artifacts() {
        let Some(install_path) = &outcome.install_path else {
            continue;
        };
        let destination = root.join(install_path);

        if let Some(parent) = destination.parent() {
            ensure_dir(parent)?;
        }
        std::fs::copy(&outcome.artifact, &destination).with_context(|| {
            format!(
                "failed to copy {} -> {}",
                outcome.artifact.display(),
                destination.display()
            )
        })?;
        make_executable(&destination)?;

        tracing::debug!(
            "Copied {} -> {}",
            outcome.artifact.display(),
            destination.display()
        );
        installed.push(destination);
    }

    if !installed.is_empty() {
        tracing::info!("Installed {} extension(s) in place", installed.len());
    }

    Ok(installed)
}

/// Grant execute permission wherever read permission is granted.
#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let mode = metadata.permissions().mode();
    let mode = mode | ((mode & 0o444) >> 2);

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
