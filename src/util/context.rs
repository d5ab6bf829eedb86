//! Process-wide state shared by every command: where keel was invoked,
//! where user-wide configuration lives, and how chatty to be.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::{self, ManifestError};
use crate::util::config::KEEL_DIR;

#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    /// `~/.keel`, or `.keel` relative to cwd when there is no home directory.
    home: PathBuf,
    verbose: bool,
}

impl GlobalContext {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = match directories::BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(KEEL_DIR),
            None => PathBuf::from(KEEL_DIR),
        };
        GlobalContext {
            cwd,
            home,
            verbose: false,
        }
    }

    /// Point user-wide configuration somewhere other than `~/.keel`.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn toolchain_config_path(&self) -> PathBuf {
        self.home.join("toolchain.toml")
    }

    /// The nearest `Keel.toml` at or above cwd.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        manifest::find_manifest(&self.cwd)
    }
}

/// `<root>/.keel`
pub fn keel_dir(root: &Path) -> PathBuf {
    root.join(KEEL_DIR)
}

/// `<root>/.keel/target`; one subdirectory per profile.
pub fn target_dir(root: &Path) -> PathBuf {
    keel_dir(root).join("target")
}
