//! Build fingerprinting for incremental builds.
//!
//! Fingerprints capture all inputs to a build step, allowing us to skip
//! rebuilding when nothing has changed and the output still exists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::builder::context::CompilerIdentity;
use crate::builder::plan::{CompileStep, OutputStep};
use crate::builder::toolchain::CommandSpec;
use crate::util::fs::write_string;
use crate::util::hash::{digest_file, FieldHasher};

/// Fingerprint for one compiled source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileFingerprint {
    /// Source file hash
    pub source_hash: String,

    /// Compiler identity
    pub compiler: String,

    /// Hash of the full command line
    pub command_hash: String,

    /// Hashes of the unit's `depends` files
    pub depends_hashes: BTreeMap<PathBuf, String>,
}

impl CompileFingerprint {
    /// Create a fingerprint for a compile step.
    pub fn for_step(
        step: &CompileStep,
        compiler: &CompilerIdentity,
        depends: &[PathBuf],
    ) -> Result<Self> {
        Ok(CompileFingerprint {
            source_hash: digest_file(&step.source)?,
            compiler: compiler.to_string(),
            command_hash: command_hash(&step.command),
            depends_hashes: hash_existing(depends)?,
        })
    }
}

/// Fingerprint for an archive or link step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFingerprint {
    /// Object file hashes
    pub object_hashes: BTreeMap<PathBuf, String>,

    /// Helper archive hashes
    pub archive_hashes: BTreeMap<PathBuf, String>,

    /// Hash of the full command line and any version script
    pub command_hash: String,

    /// Compiler identity
    pub compiler: String,
}

impl LinkFingerprint {
    /// Create a fingerprint for a unit's output step.
    pub fn for_step(step: &OutputStep, compiler: &CompilerIdentity) -> Result<Self> {
        let mut fp = FieldHasher::new();
        fp.field(&command_hash(step.command()));

        let archives: &[PathBuf] = match step {
            OutputStep::Archive(_) => &[],
            OutputStep::Link(link) => {
                if let Some(script) = &link.version_script {
                    fp.field(&script.content);
                }
                &link.archives
            }
        };

        Ok(LinkFingerprint {
            object_hashes: hash_existing(step.objects())?,
            archive_hashes: hash_existing(archives)?,
            command_hash: fp.finish_short(),
            compiler: compiler.to_string(),
        })
    }
}

fn command_hash(command: &CommandSpec) -> String {
    let mut fp = FieldHasher::new();
    fp.field(&command.program.to_string_lossy());
    fp.fields(command.args.iter().map(String::as_str));
    for (key, value) in &command.env {
        fp.field(key).field(value);
    }
    fp.finish_short()
}

fn hash_existing(paths: &[PathBuf]) -> Result<BTreeMap<PathBuf, String>> {
    let mut hashes = BTreeMap::new();
    for path in paths {
        if path.exists() {
            hashes.insert(path.clone(), digest_file(path)?);
        }
    }
    Ok(hashes)
}

/// Fingerprint cache for one profile's target directory.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FingerprintCache {
    /// Compile fingerprints by object path
    pub compile: BTreeMap<PathBuf, CompileFingerprint>,

    /// Archive and link fingerprints by output path
    pub link: BTreeMap<PathBuf, LinkFingerprint>,
}

impl FingerprintCache {
    /// Load the fingerprint cache. A missing or unreadable cache is empty.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return FingerprintCache::default(),
        };

        match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt fingerprint cache {}: {}",
                    path.display(),
                    e
                );
                FingerprintCache::default()
            }
        }
    }

    /// Save fingerprint cache to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_string(path, &serde_json::to_string_pretty(self)?)
    }

    /// Whether the object must be recompiled.
    pub fn needs_compile(&self, object: &Path, current: &CompileFingerprint) -> bool {
        if !object.exists() {
            return true;
        }
        match self.compile.get(object) {
            Some(cached) => cached != current,
            None => true,
        }
    }

    /// Whether the output must be archived or linked again.
    pub fn needs_link(&self, output: &Path, current: &LinkFingerprint) -> bool {
        if !output.exists() {
            return true;
        }
        match self.link.get(output) {
            Some(cached) => cached != current,
            None => true,
        }
    }

    /// Update compile fingerprint.
    pub fn update_compile(&mut self, object: PathBuf, fingerprint: CompileFingerprint) {
        self.compile.insert(object, fingerprint);
    }

    /// Update link fingerprint.
    pub fn update_link(&mut self, output: PathBuf, fingerprint: LinkFingerprint) {
        self.link.insert(output, fingerprint);
    }
}
