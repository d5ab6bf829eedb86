//! Build script execution.
//!
//! A project may name a script in `[build] script`. It runs in the project
//! root before any native unit, so it can generate sources; with
//! `script-only = true` it is responsible for every artifact.

use anyhow::{bail, Result};

use crate::builder::plan::ScriptStep;
use crate::util::process::ProcessBuilder;

/// Run the build script, failing with its output if it exits non-zero.
pub fn run_script(step: &ScriptStep) -> Result<()> {
    let process = ProcessBuilder::new(&step.program)
        .args(&step.args)
        .envs(&step.env)
        .cwd(&step.cwd);

    tracing::info!("Running build script `{}`", process.display_command());

    let output = process.exec()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        tracing::debug!("[script] {}", line);
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "build script `{}` failed with exit code {:?}\n{}",
            process.display_command(),
            output.status.code(),
            stderr.trim_end()
        );
    }

    Ok(())
}
