//! Native step execution.
//!
//! Runs the commands of a [`BuildPlan`](crate::builder::plan::BuildPlan):
//! compile steps in parallel on the rayon pool, archive and link steps one
//! at a time.

use std::fmt;
use std::path::Path;

use rayon::prelude::*;
use thiserror::Error;

use crate::builder::plan::{CompileStep, OutputStep};
use crate::builder::toolchain::CommandSpec;
use crate::util::fs::ensure_dir;

/// Which kind of step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Compile,
    Archive,
    Link,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKind::Compile => "compilation",
            StepKind::Archive => "archiving",
            StepKind::Link => "linking",
        })
    }
}

/// A build step that did not succeed.
#[derive(Debug, Clone, Error)]
#[error("{kind} of `{target}` failed\n  command: {command}\n{output}")]
pub struct StepFailed {
    pub kind: StepKind,
    /// Source file or artifact the step was producing
    pub target: String,
    /// The command line that was run
    pub command: String,
    /// Compiler output (stderr, then stdout)
    pub output: String,
}

/// Output of a successful step, possibly containing warnings.
pub type StepOutput = String;

/// Set the size of the global rayon pool. Only the first call has an effect.
pub fn init_thread_pool(jobs: Option<usize>) {
    if let Some(jobs) = jobs.filter(|j| *j > 0) {
        if rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .is_err()
        {
            tracing::debug!("Thread pool already initialized; ignoring -j {}", jobs);
        }
    }
}

/// Compile `steps` in parallel, calling `on_done` as each one finishes.
///
/// Results are in the same order as `steps`.
pub fn compile_all<F>(steps: &[&CompileStep], on_done: F) -> Vec<Result<StepOutput, StepFailed>>
where
    F: Fn(&CompileStep) + Sync,
{
    steps
        .par_iter()
        .map(|step| {
            let result = compile(step);
            on_done(step);
            result
        })
        .collect()
}

/// Compile a single source file.
pub fn compile(step: &CompileStep) -> Result<StepOutput, StepFailed> {
    let target = step.source.display().to_string();
    prepare_output(&step.object, StepKind::Compile, &target, &step.command)?;

    tracing::debug!(
        "Compiling {} -> {} ({})",
        step.source.display(),
        step.object.display(),
        step.language.as_str()
    );

    run(&step.command, StepKind::Compile, target)
}

/// Run a unit's archive or link step.
pub fn produce(step: &OutputStep) -> Result<StepOutput, StepFailed> {
    let target = step.output().display().to_string();

    match step {
        OutputStep::Archive(archive) => {
            prepare_output(&archive.output, StepKind::Archive, &target, &archive.command)?;
            // `ar rcs` adds to an existing archive; start over so removed sources drop out
            if archive.output.exists() {
                std::fs::remove_file(&archive.output).map_err(|e| {
                    io_failure(StepKind::Archive, &target, &archive.command, e)
                })?;
            }

            tracing::debug!("Archiving {}", archive.output.display());
            run(&archive.command, StepKind::Archive, target)
        }
        OutputStep::Link(link) => {
            prepare_output(&link.output, StepKind::Link, &target, &link.command)?;
            if let Some(script) = &link.version_script {
                prepare_output(&script.path, StepKind::Link, &target, &link.command)?;
                std::fs::write(&script.path, &script.content)
                    .map_err(|e| io_failure(StepKind::Link, &target, &link.command, e))?;
            }

            tracing::debug!("Linking {}", link.output.display());
            run(&link.command, StepKind::Link, target)
        }
    }
}

fn run(command: &CommandSpec, kind: StepKind, target: String) -> Result<StepOutput, StepFailed> {
    let output = command.to_process().exec().map_err(|e| StepFailed {
        kind,
        target: target.clone(),
        command: command.display(),
        output: format!("{:#}", e),
    })?;

    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        text.push_str(&stdout);
    }

    if !output.status.success() {
        return Err(StepFailed {
            kind,
            target,
            command: command.display(),
            output: text,
        });
    }

    Ok(text)
}

fn prepare_output(
    output: &Path,
    kind: StepKind,
    target: &str,
    command: &CommandSpec,
) -> Result<(), StepFailed> {
    match output.parent() {
        Some(parent) => ensure_dir(parent).map_err(|e| StepFailed {
            kind,
            target: target.to_string(),
            command: command.display(),
            output: format!("{:#}", e),
        }),
        None => Ok(()),
    }
}

fn io_failure(kind: StepKind, target: &str, command: &CommandSpec, err: std::io::Error) -> StepFailed {
    StepFailed {
        kind,
        target: target.to_string(),
        command: command.display(),
        output: err.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::builder::plan::{ArchiveStep, LinkStep, VersionScript};
    use crate::core::language::Language;
    use crate::test_support::{fake_toolchain, fake_toolchain_calls};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn compile_step(tools: &Path, dir: &Path, name: &str) -> CompileStep {
        let source = dir.join(name);
        let object = dir.join("obj").join(format!("{}.o", name));
        CompileStep {
            command: CommandSpec::new(tools.join("gcc"))
                .arg("-c")
                .arg(source.display().to_string())
                .arg("-o")
                .arg(object.display().to_string()),
            source,
            object,
            language: Language::C,
        }
    }

    #[test]
    fn test_compile_all_reports_each_step() {
        let tmp = TempDir::new().unwrap();
        let tools = tmp.path().join("tools");
        fake_toolchain(&tools);

        let good = compile_step(&tools, tmp.path(), "good.c");
        let noisy = compile_step(&tools, tmp.path(), "noisy.c");
        let broken = compile_step(&tools, tmp.path(), "broken.c");

        let done = AtomicUsize::new(0);
        let results = compile_all(&[&good, &noisy, &broken], |_| {
            done.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert!(results[0].is_ok());
        assert!(good.object.is_file());

        let warnings = results[1].as_ref().unwrap();
        assert!(warnings.contains("warning: unused variable"));

        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.kind, StepKind::Compile);
        assert!(err.output.contains("error: expected ';'"));
        assert!(err.to_string().contains("compilation of"));
    }

    #[test]
    fn test_missing_program_is_step_failure() {
        let tmp = TempDir::new().unwrap();
        let step = CompileStep {
            source: tmp.path().join("a.c"),
            object: tmp.path().join("a.o"),
            language: Language::C,
            command: CommandSpec::new(tmp.path().join("no-such-compiler")),
        };

        let err = compile(&step).unwrap_err();
        assert_eq!(err.kind, StepKind::Compile);
        assert!(err.command.contains("no-such-compiler"));
    }

    #[test]
    fn test_link_writes_version_script_first() {
        let tmp = TempDir::new().unwrap();
        let tools = tmp.path().join("tools");
        fake_toolchain(&tools);

        let output = tmp.path().join("lib").join("ext.so");
        let script = tmp.path().join("exports").join("ext.map");
        let step = OutputStep::Link(LinkStep {
            objects: vec![],
            archives: vec![],
            output: output.clone(),
            version_script: Some(VersionScript {
                path: script.clone(),
                content: "{ global: PyInit_ext; local: *; };\n".to_string(),
            }),
            command: CommandSpec::new(tools.join("gcc"))
                .arg("-shared")
                .arg("-o")
                .arg(output.display().to_string()),
        });

        produce(&step).unwrap();
        assert!(output.is_file());
        assert!(std::fs::read_to_string(&script).unwrap().contains("PyInit_ext"));
    }

    #[test]
    fn test_archive_replaces_existing() {
        let tmp = TempDir::new().unwrap();
        let tools = tmp.path().join("tools");
        fake_toolchain(&tools);

        let output = tmp.path().join("deps").join("libmylib.a");
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(&output, "stale").unwrap();

        let step = OutputStep::Archive(ArchiveStep {
            objects: vec![PathBuf::from("a.o")],
            output: output.clone(),
            command: CommandSpec::new(tools.join("ar"))
                .arg("rcs")
                .arg(output.display().to_string())
                .arg("a.o"),
        });

        produce(&step).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap().trim(), "archive");
        assert!(fake_toolchain_calls(&tools)
            .iter()
            .any(|line| line.starts_with("ar rcs")));
    }
}
