//! Build orchestration with progress reporting.
//!
//! Runs the units of a [`BuildPlan`] in order, deciding per unit whether it
//! is fresh, must be rebuilt, or cannot be built because a helper library
//! it needs failed. Failures of optional extensions are tolerated.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::builder::context::BuildContext;
use crate::builder::events::{BuildEvent, EventSink};
use crate::builder::fingerprint::{CompileFingerprint, FingerprintCache, LinkFingerprint};
use crate::builder::native::{self, StepFailed};
use crate::builder::plan::{BuildPlan, CompileStep, UnitPlan};
use crate::builder::unit::UnitKind;
use crate::builder::util::parse_compiler_messages;
use crate::util::diagnostic::BuildFailedError;

/// Final state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitStatus {
    /// At least one step ran and the artifact is up to date
    Built,
    /// Nothing needed to run
    Fresh,
    /// A required unit failed to build
    Failed,
    /// An optional extension failed or could not be built
    SkippedOptional,
    /// A required unit whose helper library is unavailable
    Blocked,
}

impl UnitStatus {
    /// Whether the unit's artifact is available.
    pub fn is_ok(&self) -> bool {
        matches!(self, UnitStatus::Built | UnitStatus::Fresh)
    }

    /// Whether this status fails the build.
    pub fn is_failure(&self) -> bool {
        matches!(self, UnitStatus::Failed | UnitStatus::Blocked)
    }
}

/// What happened to one unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    pub name: String,
    pub kind: UnitKind,
    pub status: UnitStatus,
    /// Artifact inside the target directory
    pub artifact: PathBuf,
    /// Relative install location, for extensions
    pub install_path: Option<PathBuf>,
    /// Failure description, for failed and skipped units
    pub error: Option<String>,
}

/// Result of executing a plan.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub outcomes: Vec<UnitOutcome>,
    pub duration: Duration,
}

impl BuildReport {
    /// Outcome of a unit by name.
    pub fn outcome(&self, name: &str) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Extensions whose module is available.
    pub fn artifacts(&self) -> Vec<&UnitOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.kind == UnitKind::Extension && o.status.is_ok())
            .collect()
    }

    /// Names of required units that failed or were blocked.
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_failure())
            .map(|o| o.name.as_str())
            .collect()
    }

    /// Names of optional extensions that were skipped.
    pub fn skipped(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == UnitStatus::SkippedOptional)
            .map(|o| o.name.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    /// Fail with an error naming every failed unit.
    pub fn ensure_success(&self) -> Result<(), BuildFailedError> {
        let failed = self.failed();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(BuildFailedError {
                failed: failed.into_iter().map(str::to_string).collect(),
            })
        }
    }
}

/// Options controlling execution.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// Keep building independent units after a required unit fails
    pub keep_going: bool,
    /// Ignore fingerprints and rebuild everything
    pub force: bool,
    /// Show an indicatif progress bar
    pub progress_bar: bool,
}

/// Runs a build plan.
pub struct Orchestrator<'a> {
    ctx: &'a BuildContext,
    options: OrchestratorOptions,
    events: &'a dyn EventSink,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: &'a BuildContext, options: OrchestratorOptions, events: &'a dyn EventSink) -> Self {
        Orchestrator {
            ctx,
            options,
            events,
        }
    }

    /// Execute `plan` and report what happened to every scheduled unit.
    ///
    /// Only infrastructure problems are returned as errors; unit failures
    /// are part of the report.
    pub fn execute(&self, plan: &BuildPlan) -> Result<BuildReport> {
        let start = Instant::now();
        let fingerprints_path = &self.ctx.layout.fingerprints;
        let mut cache = if self.options.force {
            FingerprintCache::default()
        } else {
            FingerprintCache::load(fingerprints_path)
        };

        let total = plan.step_count();
        let progress = BuildProgress::new(total);
        let bar = self.progress_bar(total);

        self.events
            .emit(&BuildEvent::started(&plan.profile, plan.units.len(), total));
        tracing::info!(
            "Building {} unit(s) [{}]",
            plan.units.len(),
            self.ctx.profile_name
        );

        let mut outcomes = Vec::with_capacity(plan.units.len());
        let mut unavailable: HashSet<&str> = HashSet::new();

        for unit in &plan.units {
            let missing = unit
                .helper_deps
                .iter()
                .find(|dep| unavailable.contains(dep.as_str()));

            let outcome = match missing {
                Some(dep) => {
                    progress.skip(unit.compile.len() + 1);
                    self.blocked(unit, dep)
                }
                None => self.build_unit(unit, &mut cache, &progress, bar.as_ref()),
            };

            if let Some(bar) = &bar {
                bar.set_position(progress.done() as u64);
            }
            self.events
                .emit(&BuildEvent::progress(progress.done() as u64, total as u64));

            if !outcome.status.is_ok() {
                unavailable.insert(unit.name.as_str());
            }
            let stop = outcome.status.is_failure() && !self.options.keep_going;
            outcomes.push(outcome);

            if stop {
                tracing::debug!("Stopping after failure of `{}`", unit.name);
                break;
            }
        }

        // Successful steps stay cached even when the build fails
        if let Err(e) = cache.save(fingerprints_path) {
            tracing::warn!("Could not save fingerprints: {:#}", e);
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        let report = BuildReport {
            outcomes,
            duration: start.elapsed(),
        };

        self.events.emit(&BuildEvent::finished(
            report.is_success(),
            report.duration.as_millis() as u64,
            report.failed().into_iter().map(str::to_string).collect(),
        ));

        Ok(report)
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.options.progress_bar || total <= 1 {
            return None;
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }

    fn blocked(&self, unit: &UnitPlan, dep: &str) -> UnitOutcome {
        let cause = format!("helper library `{}` is unavailable", dep);
        let status = if unit.optional {
            tracing::warn!("Skipping optional extension `{}`: {}", unit.name, cause);
            UnitStatus::SkippedOptional
        } else {
            tracing::error!("Cannot build `{}`: {}", unit.name, cause);
            UnitStatus::Blocked
        };

        self.events.emit(&BuildEvent::UnitSkipped {
            unit: unit.name.clone(),
            cause: cause.clone(),
            optional: unit.optional,
        });

        outcome(unit, status, Some(cause))
    }

    fn build_unit(
        &self,
        unit: &UnitPlan,
        cache: &mut FingerprintCache,
        progress: &BuildProgress,
        bar: Option<&ProgressBar>,
    ) -> UnitOutcome {
        if let Some(bar) = bar {
            bar.set_message(unit.name.clone());
        }

        match self.run_unit(unit, cache, progress, bar) {
            Ok(ran) => {
                let status = if ran {
                    tracing::info!("Built {} `{}`", unit.kind.as_str(), unit.name);
                    UnitStatus::Built
                } else {
                    tracing::debug!("`{}` is fresh", unit.name);
                    UnitStatus::Fresh
                };

                self.events.emit(&BuildEvent::CompilerArtifact {
                    unit: unit.name.clone(),
                    kind: unit.kind.as_str().to_string(),
                    filename: unit.output.output().to_path_buf(),
                    install_path: unit.install_path.clone(),
                    fresh: !ran,
                });

                outcome(unit, status, None)
            }
            Err(failure) => {
                let message = failure.to_string();
                if unit.optional {
                    tracing::warn!(
                        "Optional extension `{}` failed to build and will be skipped\n{}",
                        unit.name,
                        message
                    );
                    self.events.emit(&BuildEvent::UnitSkipped {
                        unit: unit.name.clone(),
                        cause: format!("{} failed", failure.kind),
                        optional: true,
                    });
                    outcome(unit, UnitStatus::SkippedOptional, Some(message))
                } else {
                    tracing::error!("{}", message);
                    outcome(unit, UnitStatus::Failed, Some(message))
                }
            }
        }
    }

    /// Run whatever is stale in `unit`. Returns whether any step ran.
    fn run_unit(
        &self,
        unit: &UnitPlan,
        cache: &mut FingerprintCache,
        progress: &BuildProgress,
        bar: Option<&ProgressBar>,
    ) -> Result<bool, StepFailed> {
        let compiler = &self.ctx.compiler;

        let mut stale: Vec<(&CompileStep, Option<CompileFingerprint>)> = Vec::new();
        for step in &unit.compile {
            match CompileFingerprint::for_step(step, compiler, &unit.depends) {
                Ok(fp) if !self.options.force && !cache.needs_compile(&step.object, &fp) => {
                    progress.step_done();
                }
                Ok(fp) => stale.push((step, Some(fp))),
                Err(e) => {
                    // Let the compiler report the unreadable source
                    tracing::debug!("Cannot fingerprint {}: {:#}", step.source.display(), e);
                    stale.push((step, None));
                }
            }
        }

        let steps: Vec<&CompileStep> = stale.iter().map(|(step, _)| *step).collect();
        let results = native::compile_all(&steps, |_| {
            progress.step_done();
            if let Some(bar) = bar {
                bar.set_position(progress.done() as u64);
            }
        });

        let mut first_failure = None;
        for ((step, fp), result) in stale.into_iter().zip(results) {
            match result {
                Ok(output) => {
                    self.report_messages(&unit.name, &output);
                    if let Some(fp) = fp {
                        cache.update_compile(step.object.clone(), fp);
                    }
                }
                Err(failure) => {
                    self.report_failure(&unit.name, &failure);
                    first_failure.get_or_insert(failure);
                }
            }
        }
        if let Some(failure) = first_failure {
            // The output step is never attempted
            progress.skip(1);
            return Err(failure);
        }

        let compiled = !steps.is_empty();
        let link_fp = LinkFingerprint::for_step(&unit.output, compiler).ok();
        let output_fresh = !compiled
            && !self.options.force
            && link_fp
                .as_ref()
                .is_some_and(|fp| !cache.needs_link(unit.output.output(), fp));

        if output_fresh {
            progress.step_done();
            return Ok(false);
        }

        let result = native::produce(&unit.output);
        progress.step_done();
        match result {
            Ok(output) => {
                self.report_messages(&unit.name, &output);
                if let Some(fp) = link_fp {
                    cache.update_link(unit.output.output().to_path_buf(), fp);
                }
                Ok(true)
            }
            Err(failure) => {
                self.report_failure(&unit.name, &failure);
                Err(failure)
            }
        }
    }

    fn report_messages(&self, unit: &str, output: &str) {
        for msg in parse_compiler_messages(output) {
            tracing::warn!(
                "{}:{}: {}",
                msg.file.display(),
                msg.line.map(|l| l.to_string()).unwrap_or_default(),
                msg.message
            );
            self.events.emit(&BuildEvent::from_compiler_message(unit, &msg));
        }
    }

    fn report_failure(&self, unit: &str, failure: &StepFailed) {
        let messages = parse_compiler_messages(&failure.output);
        if messages.is_empty() {
            self.events.emit(&BuildEvent::error(unit, failure.output.trim()));
        }
        for msg in messages {
            self.events.emit(&BuildEvent::from_compiler_message(unit, &msg));
        }
    }
}

fn outcome(unit: &UnitPlan, status: UnitStatus, error: Option<String>) -> UnitOutcome {
    UnitOutcome {
        name: unit.name.clone(),
        kind: unit.kind,
        status,
        artifact: unit.output.output().to_path_buf(),
        install_path: unit.install_path.clone(),
        error,
    }
}

/// Step counter shared with worker threads.
#[derive(Clone)]
pub struct BuildProgress {
    done: Arc<AtomicUsize>,
    total: usize,
}

impl BuildProgress {
    /// Create a new progress tracker.
    pub fn new(total: usize) -> Self {
        BuildProgress {
            done: Arc::new(AtomicUsize::new(0)),
            total,
        }
    }

    /// Record a finished (or fresh) step.
    pub fn step_done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    /// Record steps that will never run.
    pub fn skip(&self, steps: usize) {
        self.done.fetch_add(steps, Ordering::SeqCst);
    }

    /// Steps accounted for so far.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Get total expected steps.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Get total progress as a fraction.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done() as f64 / self.total as f64
        }
    }

    /// Check if build is complete.
    pub fn is_complete(&self) -> bool {
        self.done() >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_progress() {
        let progress = BuildProgress::new(4);
        assert_eq!(progress.fraction(), 0.0);

        progress.step_done();
        progress.skip(2);
        assert_eq!(progress.done(), 3);
        assert!(!progress.is_complete());

        progress.step_done();
        assert!(progress.is_complete());
        assert_eq!(BuildProgress::new(0).fraction(), 1.0);
    }

    #[test]
    fn test_build_progress_thread_safe() {
        let progress = BuildProgress::new(100);
        std::thread::scope(|s| {
            for _ in 0..4 {
                let p = progress.clone();
                s.spawn(move || {
                    for _ in 0..25 {
                        p.step_done();
                    }
                });
            }
        });
        assert!(progress.is_complete());
    }

    fn report(statuses: &[(&str, UnitKind, UnitStatus)]) -> BuildReport {
        BuildReport {
            outcomes: statuses
                .iter()
                .map(|(name, kind, status)| UnitOutcome {
                    name: name.to_string(),
                    kind: *kind,
                    status: *status,
                    artifact: PathBuf::from(format!("{}.so", name)),
                    install_path: None,
                    error: None,
                })
                .collect(),
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_report_success_and_failure() {
        let ok = report(&[
            ("mylib", UnitKind::HelperLib, UnitStatus::Fresh),
            ("a", UnitKind::Extension, UnitStatus::Built),
            ("b", UnitKind::Extension, UnitStatus::SkippedOptional),
        ]);
        assert!(ok.ensure_success().is_ok());
        assert_eq!(ok.artifacts().len(), 1);
        assert_eq!(ok.skipped(), vec!["b"]);

        let bad = report(&[
            ("mylib", UnitKind::HelperLib, UnitStatus::Failed),
            ("a", UnitKind::Extension, UnitStatus::Blocked),
        ]);
        let err = bad.ensure_success().unwrap_err();
        assert_eq!(err.failed, vec!["mylib", "a"]);
        assert!(err.to_string().contains("mylib"));
    }
}
