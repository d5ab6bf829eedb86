//! Implementation of `keel clean`.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::extension::ModuleName;
use crate::core::manifest::Manifest;
use crate::core::platform::TargetPlatform;
use crate::util::config::{load_config, project_config_path};
use crate::util::context::{target_dir, GlobalContext};
use crate::util::fs::{find_files_with_suffix, relative_path, remove_dir_all_if_exists};

/// Options for the clean command.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Only remove this profile's output (None = the whole target directory)
    pub profile: Option<String>,

    /// Also remove extension modules installed into the source tree
    pub inplace: bool,
}

/// Paths removed by a clean.
#[derive(Debug, Default)]
pub struct CleanResult {
    pub removed: Vec<PathBuf>,
}

/// Remove build output for the project described by `manifest`.
pub fn clean(manifest: &Manifest, gctx: &GlobalContext, opts: &CleanOptions) -> Result<CleanResult> {
    let mut result = CleanResult::default();

    let target = match &opts.profile {
        Some(profile) => target_dir(&manifest.root).join(profile),
        None => target_dir(&manifest.root),
    };
    if target.exists() {
        remove_dir_all_if_exists(&target)?;
        tracing::debug!("Removed {}", target.display());
        result.removed.push(target);
    }

    if opts.inplace {
        let config = load_config(Some(&gctx.config_path()), &project_config_path(&manifest.root));
        let suffix = config
            .build
            .extension_suffix
            .or_else(|| manifest.build.extension_suffix.clone())
            .unwrap_or_else(|| TargetPlatform::host().default_extension_suffix().to_string());

        for path in inplace_modules(manifest, &suffix) {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            tracing::debug!("Removed {}", path.display());
            result.removed.push(path);
        }
    }

    Ok(result)
}

/// Extension modules present in the source tree at a declared install path.
fn inplace_modules(manifest: &Manifest, suffix: &str) -> Vec<PathBuf> {
    let install_paths: HashSet<PathBuf> = manifest
        .extensions
        .iter()
        .filter_map(|ext| ModuleName::new(&ext.name).ok())
        .map(|name| name.install_path(suffix))
        .collect();

    find_files_with_suffix(&manifest.root, suffix)
        .into_iter()
        .filter(|path| install_paths.contains(&relative_path(&manifest.root, path)))
        .collect()
}
