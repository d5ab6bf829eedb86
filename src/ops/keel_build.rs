//! Implementation of `keel build`.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::builder::events::{EventSink, JsonEventSink, NullEventSink};
use crate::builder::inplace::install_inplace;
use crate::builder::native::init_thread_pool;
use crate::builder::orchestrator::{BuildReport, Orchestrator, OrchestratorOptions};
use crate::builder::plan::{BuildPlan, ScriptStep};
use crate::builder::resolver::{self, ResolveOptions};
use crate::builder::script::run_script;
use crate::builder::toolchain::{detect_toolchain, Toolchain};
use crate::builder::BuildContext;
use crate::core::manifest::Manifest;
use crate::util::config::{
    load_config, load_toolchain_config, project_config_path, project_toolchain_config_path, Config,
    ToolchainConfig,
};
use crate::util::context::{keel_dir, GlobalContext};

/// How build progress is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    /// Log lines and a progress bar on stderr
    #[default]
    Human,
    /// One JSON event per line on stdout
    Json,
}

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Build in release mode
    pub release: bool,

    /// Named profile; overrides `release`
    pub profile: Option<String>,

    /// Specific extensions to build (empty = all)
    pub extensions: Vec<String>,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Keep building independent units after a required unit fails
    pub keep_going: bool,

    /// Ignore fingerprints
    pub force: bool,

    /// Copy built extensions into the source tree
    pub inplace: bool,

    /// Emit compile_commands.json
    pub emit_compile_commands: bool,

    /// Stop after planning and return the plan
    pub plan_only: bool,

    pub message_format: MessageFormat,
}

impl BuildOptions {
    /// Name of the selected profile.
    pub fn profile_name(&self) -> &str {
        match &self.profile {
            Some(name) => name,
            None if self.release => "release",
            None => "debug",
        }
    }
}

/// Build result.
#[derive(Debug)]
pub struct BuildResult {
    /// Whether the artifacts are tied to this platform: any native
    /// extension or build script makes them so.
    pub platform_specific: bool,

    /// Built extension modules inside the target directory
    pub artifacts: Vec<PathBuf>,

    /// Extension modules copied into the source tree (`--inplace`)
    pub installed: Vec<PathBuf>,

    /// Build plan (with `plan_only`)
    pub plan: Option<BuildPlan>,

    /// What happened to every unit (absent with `plan_only` or a script-only build)
    pub report: Option<BuildReport>,
}

/// Configuration files merged for one build.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: Config,
    pub toolchain: ToolchainConfig,
}

impl LoadedConfig {
    /// Load global then project configuration.
    pub fn load(gctx: &GlobalContext, manifest: &Manifest) -> Self {
        LoadedConfig {
            config: load_config(
                Some(&gctx.config_path()),
                &project_config_path(&manifest.root),
            ),
            toolchain: load_toolchain_config(
                Some(&gctx.toolchain_config_path()),
                &project_toolchain_config_path(&manifest.root),
            ),
        }
    }
}

/// Build the project described by `manifest`.
pub fn build(manifest: &Manifest, gctx: &GlobalContext, opts: &BuildOptions) -> Result<BuildResult> {
    let loaded = LoadedConfig::load(gctx, manifest);
    let config = &loaded.config.build;

    let profile_name = opts.profile_name();
    let profile = manifest.profile(profile_name)?;

    let keep_going = opts.keep_going || config.keep_going || manifest.build.keep_going;
    let emit_compile_commands = opts.emit_compile_commands || config.emit_compile_commands;
    init_thread_pool(opts.jobs.or(config.jobs));

    let native = manifest.has_native_units() && !manifest.build.script_only;
    let platform_specific = native || manifest.build.script.is_some();

    // The toolchain is only required when something is compiled natively
    let ctx = if native {
        Some(BuildContext::new(
            &manifest.root,
            profile_name,
            profile,
            &loaded.toolchain,
        )?)
    } else {
        None
    };

    if !opts.plan_only {
        let toolchain: Option<Arc<dyn Toolchain>> = match &ctx {
            Some(ctx) => Some(Arc::clone(&ctx.toolchain)),
            None => detect_toolchain(&loaded.toolchain).ok().map(Arc::from),
        };
        if let Some(script) = ScriptStep::from_settings(
            &manifest.build,
            &manifest.root,
            profile_name,
            toolchain.as_deref(),
        ) {
            run_script(&script)?;
            if script.script_only {
                return Ok(BuildResult {
                    platform_specific,
                    artifacts: Vec::new(),
                    installed: Vec::new(),
                    plan: None,
                    report: None,
                });
            }
        }
    }

    let Some(ctx) = ctx else {
        tracing::info!("Nothing to build natively for `{}`", manifest.name());
        return Ok(BuildResult {
            platform_specific,
            artifacts: Vec::new(),
            installed: Vec::new(),
            plan: None,
            report: None,
        });
    };

    let resolve_opts = ResolveOptions::new(
        manifest,
        &ctx.platform,
        config.extension_suffix.as_deref(),
    );
    let units = resolver::resolve(manifest, &resolve_opts)?;
    let units = resolver::select(units, &opts.extensions)?;

    let plan = BuildPlan::new(&ctx, &units)?;
    tracing::debug!(
        "Planned {} unit(s), {} compile step(s)",
        plan.units.len(),
        plan.compile_count()
    );

    if opts.plan_only {
        return Ok(BuildResult {
            platform_specific,
            artifacts: Vec::new(),
            installed: Vec::new(),
            plan: Some(plan),
            report: None,
        });
    }

    if emit_compile_commands {
        let path = keel_dir(&manifest.root).join("compile_commands.json");
        plan.emit_compile_commands(&ctx, &path)
            .context("failed to emit compile_commands.json")?;
    }

    let sink: Box<dyn EventSink> = match opts.message_format {
        MessageFormat::Human => Box::new(NullEventSink),
        MessageFormat::Json => Box::new(JsonEventSink),
    };
    let orchestrator = Orchestrator::new(
        &ctx,
        OrchestratorOptions {
            keep_going,
            force: opts.force,
            // Debug logs would tear the bar
            progress_bar: opts.message_format == MessageFormat::Human
                && !gctx.is_verbose()
                && std::io::stderr().is_terminal(),
        },
        sink.as_ref(),
    );
    let report = orchestrator.execute(&plan)?;

    let installed = if opts.inplace {
        install_inplace(&manifest.root, &report)?
    } else {
        Vec::new()
    };

    report.ensure_success()?;

    let skipped = report.skipped();
    if !skipped.is_empty() {
        tracing::warn!("Optional extension(s) not built: {}", skipped.join(", "));
    }
    tracing::info!(
        "Finished `{}` profile in {:.2}s",
        profile_name,
        report.duration.as_secs_f64()
    );

    Ok(BuildResult {
        platform_specific,
        artifacts: report
            .artifacts()
            .into_iter()
            .map(|o| o.artifact.clone())
            .collect(),
        installed,
        plan: None,
        report: Some(report),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_name_selection() {
        let mut opts = BuildOptions::default();
        assert_eq!(opts.profile_name(), "debug");

        opts.release = true;
        assert_eq!(opts.profile_name(), "release");

        opts.profile = Some("asan".to_string());
        assert_eq!(opts.profile_name(), "asan");
    }
}

#[cfg(all(test, unix))]
mod build_tests {
    use super::*;
    use crate::builder::orchestrator::UnitStatus;
    use crate::test_support::assertions::assert_error_contains;
    use crate::test_support::{fake_toolchain, fake_toolchain_calls, ProjectFixture, WrittenProject};
    use std::path::Path;

    fn gctx(project: &WrittenProject) -> GlobalContext {
        GlobalContext::with_cwd(project.root().to_path_buf()).with_home(project.path("home"))
    }

    /// Point the project at the fake toolchain through `.keel/toolchain.toml`.
    fn use_fake_toolchain(project: &WrittenProject) -> PathBuf {
        let tools = project.path("tools");
        let config = fake_toolchain(&tools);
        let path = project_toolchain_config_path(project.root());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();
        tools
    }

    fn compile_calls(tools: &Path) -> usize {
        fake_toolchain_calls(tools)
            .iter()
            .filter(|line| line.contains(" -c "))
            .count()
    }

    #[test]
    fn test_build_foo_extension() {
        let project = ProjectFixture::foo_extension().write();
        let tools = use_fake_toolchain(&project);

        let result = build(&project.manifest(), &gctx(&project), &BuildOptions::default()).unwrap();

        assert!(result.platform_specific);
        assert_eq!(result.artifacts.len(), 1);
        assert!(result.artifacts[0].is_file());
        assert!(result.artifacts[0].starts_with(project.path(".keel/target/debug/lib")));
        assert_eq!(compile_calls(&tools), 1);

        let report = result.report.unwrap();
        assert_eq!(report.outcome("foo").unwrap().status, UnitStatus::Built);
    }

    #[test]
    fn test_build_inplace_and_compile_commands() {
        let project = ProjectFixture::extended_with_mylib().write();
        use_fake_toolchain(&project);

        let opts = BuildOptions {
            inplace: true,
            emit_compile_commands: true,
            ..Default::default()
        };
        let result = build(&project.manifest(), &gctx(&project), &opts).unwrap();

        assert_eq!(result.installed.len(), 1);
        assert!(result.installed[0].is_file());
        assert!(result.installed[0].starts_with(project.root()));
        assert!(project.path(".keel/compile_commands.json").is_file());
    }

    #[test]
    fn test_plan_only_does_not_compile() {
        let project = ProjectFixture::extended_with_mylib().write();
        let tools = use_fake_toolchain(&project);

        let opts = BuildOptions {
            plan_only: true,
            ..Default::default()
        };
        let result = build(&project.manifest(), &gctx(&project), &opts).unwrap();

        let plan = result.plan.unwrap();
        assert_eq!(plan.units.len(), 2);
        assert!(result.report.is_none());
        assert_eq!(compile_calls(&tools), 0);
    }

    #[test]
    fn test_unknown_extension_selection() {
        let project = ProjectFixture::foo_extension().write();
        use_fake_toolchain(&project);

        let opts = BuildOptions {
            extensions: vec!["bar".to_string()],
            ..Default::default()
        };
        assert_error_contains(
            build(&project.manifest(), &gctx(&project), &opts),
            "no extension named `bar`",
        );
    }

    #[test]
    fn test_failed_build_names_unit() {
        let project = ProjectFixture::new(
            r#"[package]
name = "broken"

[[extension]]
name = "broken"
sources = ["broken.c"]
"#,
        )
        .file("broken.c", "int broken(void) { return 0 }\n")
        .write();
        use_fake_toolchain(&project);

        assert_error_contains(
            build(&project.manifest(), &gctx(&project), &BuildOptions::default()),
            "failed to build broken",
        );
    }

    #[test]
    fn test_script_only_build() {
        use std::os::unix::fs::PermissionsExt;

        let project = ProjectFixture::new(
            r#"[package]
name = "scripted"

[build]
script = "build.sh"
script-only = true
"#,
        )
        .file("build.sh", "#!/bin/sh\necho \"$KEEL_PROFILE\" > built.txt\n")
        .write();
        std::fs::set_permissions(
            project.path("build.sh"),
            std::fs::Permissions::from_mode(0o755),
        )
        .unwrap();

        let opts = BuildOptions {
            release: true,
            ..Default::default()
        };
        let result = build(&project.manifest(), &gctx(&project), &opts).unwrap();

        assert!(result.platform_specific);
        assert!(result.report.is_none());
        assert_eq!(
            std::fs::read_to_string(project.path("built.txt")).unwrap().trim(),
            "release"
        );
    }

    #[test]
    fn test_declarations_only_project_is_not_platform_specific() {
        let project = ProjectFixture::new("[package]\nname = \"pure\"\n").write();

        let result = build(&project.manifest(), &gctx(&project), &BuildOptions::default()).unwrap();
        assert!(!result.platform_specific);
        assert!(result.artifacts.is_empty());
    }
}
