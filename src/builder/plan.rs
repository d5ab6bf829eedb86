//! Build plan generation.
//!
//! A BuildPlan describes every command needed to build the resolved units:
//! compile steps per source, then one archive step per helper library or
//! one link step per extension. Commands are fully rendered here so the
//! plan can be inspected (`keel build --plan`), fingerprinted, and executed
//! without consulting the toolchain again.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::context::BuildContext;
use crate::builder::exports::export_symbols;
use crate::builder::resolver::{effective_cpp_std, link_order};
use crate::builder::toolchain::{
    version_script, ArchiveInput, CommandSpec, CompileInput, CxxOptions, LinkInput, Toolchain,
};
use crate::builder::unit::{BuildUnit, UnitKind};
use crate::core::extension::Define;
use crate::core::language::Language;
use crate::core::manifest::BuildSettings;
use crate::util::context::target_dir;
use crate::util::fs::{relative_path, resolve_path, write_string};
use crate::util::hash::short_digest;

/// A complete build plan.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// Profile the plan was made for
    pub profile: String,

    /// Units in execution order (helper libraries before their dependents)
    pub units: Vec<UnitPlan>,
}

/// Everything needed to build one unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitPlan {
    pub name: String,
    pub kind: UnitKind,
    pub optional: bool,

    /// Helper libraries this unit needs, directly or transitively
    pub helper_deps: Vec<String>,

    /// Extra files whose contents are part of every compile fingerprint
    pub depends: Vec<PathBuf>,

    /// Symbols the linked module exports, for extensions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,

    pub compile: Vec<CompileStep>,

    pub output: OutputStep,

    /// Relative install location, for extensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
}

/// A single compilation step.
#[derive(Debug, Clone, Serialize)]
pub struct CompileStep {
    /// Source file
    pub source: PathBuf,

    /// Output object file
    pub object: PathBuf,

    /// Source language (C or C++)
    pub language: Language,

    pub command: CommandSpec,
}

/// The step that produces a unit's final artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputStep {
    /// Create a static library from object files
    Archive(ArchiveStep),
    /// Link objects into a loadable module
    Link(LinkStep),
}

/// A step to create a static library.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveStep {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
    pub command: CommandSpec,
}

/// A step to link an extension module.
#[derive(Debug, Clone, Serialize)]
pub struct LinkStep {
    pub objects: Vec<PathBuf>,

    /// Helper archives linked in, for fingerprinting
    pub archives: Vec<PathBuf>,

    pub output: PathBuf,

    /// Linker version script written before linking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_script: Option<VersionScript>,

    pub command: CommandSpec,
}

/// A generated linker version script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionScript {
    pub path: PathBuf,
    pub content: String,
}

impl OutputStep {
    /// The artifact this step produces.
    pub fn output(&self) -> &Path {
        match self {
            OutputStep::Archive(step) => &step.output,
            OutputStep::Link(step) => &step.output,
        }
    }

    pub fn command(&self) -> &CommandSpec {
        match self {
            OutputStep::Archive(step) => &step.command,
            OutputStep::Link(step) => &step.command,
        }
    }

    /// Object files consumed by this step.
    pub fn objects(&self) -> &[PathBuf] {
        match self {
            OutputStep::Archive(step) => &step.objects,
            OutputStep::Link(step) => &step.objects,
        }
    }
}

impl UnitPlan {
    pub fn is_extension(&self) -> bool {
        self.kind == UnitKind::Extension
    }
}

impl BuildPlan {
    /// Create a build plan for `units`, which must be in resolver order.
    pub fn new(ctx: &BuildContext, units: &[BuildUnit]) -> Result<Self> {
        let mut plans = Vec::with_capacity(units.len());

        for unit in units {
            let exports = match unit.kind {
                UnitKind::HelperLib => Vec::new(),
                UnitKind::Extension => export_symbols(unit, &ctx.platform)?,
            };

            let compile = compile_steps(ctx, unit, &exports);
            let objects: Vec<PathBuf> = compile.iter().map(|s| s.object.clone()).collect();

            let helper_deps = link_order(units, &unit.name);
            let output = match unit.kind {
                UnitKind::HelperLib => archive_step(ctx, unit, objects),
                UnitKind::Extension => {
                    link_step(ctx, units, unit, &helper_deps, &exports, objects)?
                }
            };

            plans.push(UnitPlan {
                name: unit.name.clone(),
                kind: unit.kind,
                optional: unit.optional,
                helper_deps,
                depends: unit.depends.clone(),
                exports,
                compile,
                output,
                install_path: unit.install_path.clone(),
            });
        }

        Ok(BuildPlan {
            profile: ctx.profile_name.clone(),
            units: plans,
        })
    }

    /// Find a unit by name.
    pub fn unit(&self, name: &str) -> Option<&UnitPlan> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Get the number of compile steps.
    pub fn compile_count(&self) -> usize {
        self.units.iter().map(|u| u.compile.len()).sum()
    }

    /// Total number of steps, compile and output.
    pub fn step_count(&self) -> usize {
        self.compile_count() + self.units.len()
    }

    /// Emit compile_commands.json for IDE integration.
    pub fn emit_compile_commands(&self, ctx: &BuildContext, path: &Path) -> Result<()> {
        let commands: Vec<CompileCommand> = self
            .units
            .iter()
            .flat_map(|unit| &unit.compile)
            .map(|step| {
                let mut arguments = Vec::with_capacity(step.command.args.len() + 1);
                arguments.push(step.command.program.display().to_string());
                arguments.extend(step.command.args.iter().cloned());

                CompileCommand {
                    directory: ctx.root.display().to_string(),
                    file: step.source.display().to_string(),
                    arguments,
                    output: Some(step.object.display().to_string()),
                }
            })
            .collect();

        write_string(path, &serde_json::to_string_pretty(&commands)?)?;

        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// compile_commands.json entry.
#[derive(Debug, Serialize)]
struct CompileCommand {
    directory: String,
    file: String,
    arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

fn compile_steps(ctx: &BuildContext, unit: &BuildUnit, exports: &[String]) -> Vec<CompileStep> {
    let toolchain = ctx.toolchain();
    let obj_dir = ctx.unit_obj_dir(unit);

    let mut defines = unit.defines.clone();
    if let Some(name) = &unit.exports.macro_name {
        defines.push(Define::with_value(
            name.clone(),
            toolchain.export_attribute(&ctx.platform),
        ));
    }

    let mut unit_flags = toolchain.pic_flags(&ctx.platform);
    if unit.kind == UnitKind::Extension {
        unit_flags.extend(
            toolchain.visibility_flags(unit.exports.visibility, exports, &ctx.platform),
        );
    }
    unit_flags.extend(unit.extra_compile_args.iter().cloned());

    let cxx_opts = CxxOptions {
        std: effective_cpp_std(unit),
    };

    unit.sources
        .iter()
        .map(|source| {
            let object = obj_dir.join(object_name(
                &ctx.root,
                &source.path,
                toolchain.object_extension(),
            ));

            let mut cflags = ctx.profile_cflags(source.language);
            cflags.extend(unit_flags.iter().cloned());

            let input = CompileInput {
                source: source.path.clone(),
                output: object.clone(),
                include_dirs: unit.include_dirs.clone(),
                defines: defines.clone(),
                undefines: unit.undefines.clone(),
                cflags,
            };

            let opts = (source.language == Language::Cxx).then_some(&cxx_opts);
            let command = toolchain.compile_command(&input, source.language, opts);

            CompileStep {
                source: source.path.clone(),
                object,
                language: source.language,
                command,
            }
        })
        .collect()
}

/// Object path for `source`, mirroring its location under the root.
///
/// Sources outside the root are placed under `_external/<hash>/` so they
/// cannot collide or escape the object directory.
fn object_name(root: &Path, source: &Path, object_ext: &str) -> PathBuf {
    let relative = relative_path(root, source);
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let object_file = format!("{}.{}", file_name, object_ext);

    if escapes {
        let parent = source.parent().unwrap_or(Path::new(""));
        return Path::new("_external")
            .join(short_digest(&parent.to_string_lossy()))
            .join(object_file);
    }

    relative.with_file_name(object_file)
}

fn archive_step(ctx: &BuildContext, unit: &BuildUnit, objects: Vec<PathBuf>) -> OutputStep {
    let output = ctx.helper_lib_path(&unit.name);
    let command = ctx.toolchain().archive_command(&ArchiveInput {
        objects: objects.clone(),
        output: output.clone(),
    });

    OutputStep::Archive(ArchiveStep {
        objects,
        output,
        command,
    })
}

fn link_step(
    ctx: &BuildContext,
    units: &[BuildUnit],
    unit: &BuildUnit,
    helper_deps: &[String],
    exports: &[String],
    objects: Vec<PathBuf>,
) -> Result<OutputStep> {
    let toolchain = ctx.toolchain();
    let install_path = unit
        .install_path()
        .with_context(|| format!("extension `{}` has no install path", unit.name))?;
    let output = ctx.module_output_path(install_path);

    let helpers: Vec<&BuildUnit> = helper_deps
        .iter()
        .filter_map(|name| units.iter().find(|u| &u.name == name))
        .collect();

    let mut lib_dirs = Vec::new();
    if !helpers.is_empty() {
        lib_dirs.push(ctx.layout.deps_dir.clone());
    }
    lib_dirs.extend(unit.library_dirs.iter().cloned());

    // Helper archives first, then the system libraries they and the unit need
    let mut libs: Vec<String> = helper_deps.to_vec();
    for lib in helpers
        .iter()
        .flat_map(|h| h.system_libs.iter())
        .chain(unit.system_libs.iter())
    {
        if !libs.contains(lib) {
            libs.push(lib.clone());
        }
    }

    let visibility = unit.exports.visibility;
    let version_script = if toolchain.needs_version_script(visibility, exports, &ctx.platform) {
        Some(VersionScript {
            path: ctx.version_script_path(unit),
            content: version_script(exports),
        })
    } else {
        None
    };

    let mut ldflags = ctx.profile_ldflags();
    ldflags.extend(toolchain.export_link_args(
        exports,
        visibility,
        &ctx.platform,
        version_script.as_ref().map(|v| v.path.as_path()),
    ));
    ldflags.extend(unit.extra_link_args.iter().cloned());

    let driver = if unit.link_language == Language::Cxx || helpers.iter().any(|h| h.has_cxx()) {
        Language::Cxx
    } else {
        Language::C
    };

    let archives: Vec<PathBuf> = helper_deps
        .iter()
        .map(|name| ctx.helper_lib_path(name))
        .collect();

    let command = toolchain.link_shared_command(
        &LinkInput {
            objects: objects.clone(),
            output: output.clone(),
            lib_dirs,
            libs,
            ldflags,
        },
        driver,
        &ctx.platform,
    );

    Ok(OutputStep::Link(LinkStep {
        objects,
        archives,
        output,
        version_script,
        command,
    }))
}

/// How to run the project's build script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptStep {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    /// The script produces every artifact
    pub script_only: bool,
}

impl ScriptStep {
    /// Describe the `[build] script` invocation, if one is configured.
    ///
    /// With a `runner` (e.g. `python3 -u`) the script path is appended to
    /// the runner's words; otherwise the script is executed directly.
    pub fn from_settings(
        settings: &BuildSettings,
        root: &Path,
        profile_name: &str,
        toolchain: Option<&dyn Toolchain>,
    ) -> Option<ScriptStep> {
        let script = resolve_path(root, settings.script.as_deref()?);

        let (program, mut args) = match settings.runner.as_deref().map(str::split_whitespace) {
            Some(mut words) => match words.next() {
                Some(first) => (PathBuf::from(first), words.map(str::to_string).collect()),
                None => (script.clone(), Vec::new()),
            },
            None => (script.clone(), Vec::new()),
        };
        if program != script {
            args.push(script.display().to_string());
        }

        let mut env = BTreeMap::new();
        env.insert("KEEL_PROFILE".to_string(), profile_name.to_string());
        env.insert(
            "KEEL_TARGET_DIR".to_string(),
            target_dir(root).join(profile_name).display().to_string(),
        );
        if let Some(toolchain) = toolchain {
            env.insert(
                "CC".to_string(),
                toolchain.compiler_path().display().to_string(),
            );
            env.insert(
                "CXX".to_string(),
                toolchain.cxx_compiler_path().display().to_string(),
            );
        }

        Some(ScriptStep {
            program,
            args,
            cwd: root.to_path_buf(),
            env,
            script_only: settings.script_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::context::tests::gcc_context;
    use crate::builder::resolver::{resolve, ResolveOptions};
    use crate::core::manifest::Profile;
    use crate::test_support::ProjectFixture;

    fn opts() -> ResolveOptions {
        ResolveOptions {
            extension_suffix: ".so".to_string(),
        }
    }

    #[test]
    fn test_plan_foo_extension() {
        let project = ProjectFixture::foo_extension().write();
        let units = resolve(&project.manifest(), &opts()).unwrap();
        let ctx = gcc_context(project.root(), Profile::debug());

        let plan = BuildPlan::new(&ctx, &units).unwrap();
        assert_eq!(plan.units.len(), 1);
        assert_eq!(plan.compile_count(), 1);

        let foo = &plan.units[0];
        let compile = &foo.compile[0];
        assert_eq!(
            compile.object,
            ctx.layout.obj_dir.join("foo").join("foo").join("foo.c.o")
        );
        assert_eq!(compile.command.program, PathBuf::from("gcc"));
        assert!(compile.command.args.contains(&"-fPIC".to_string()));
        assert!(compile.command.args.contains(&"-O0".to_string()));
        // Default visibility: nothing hidden, no version script
        assert!(!compile.command.args.contains(&"-fvisibility=hidden".to_string()));

        let OutputStep::Link(link) = &foo.output else {
            panic!("expected a link step");
        };
        assert_eq!(link.output, ctx.layout.lib_dir.join("foo.so"));
        assert!(link.version_script.is_none());
        assert!(link.command.args.contains(&"-shared".to_string()));
        assert_eq!(link.command.program, PathBuf::from("gcc"));
    }

    #[test]
    fn test_plan_extension_with_helper_library() {
        let project = ProjectFixture::extended_with_mylib().write();
        let units = resolve(&project.manifest(), &opts()).unwrap();
        let ctx = gcc_context(project.root(), Profile::debug());

        let plan = BuildPlan::new(&ctx, &units).unwrap();
        let names: Vec<&str> = plan.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["mylib", "extended.extended"]);

        let mylib = &plan.units[0];
        let OutputStep::Archive(archive) = &mylib.output else {
            panic!("expected an archive step");
        };
        assert_eq!(archive.output, ctx.layout.deps_dir.join("libmylib.a"));
        let args = &mylib.compile[0].command.args;
        assert!(args.contains(&"-DMYLIB_EXPORT=__attribute__((visibility(\"default\")))".to_string()));
        assert!(args.contains(&"-fPIC".to_string()));

        let ext = &plan.units[1];
        assert_eq!(ext.helper_deps, vec!["mylib"]);
        assert_eq!(ext.install_path, Some(Path::new("extended").join("extended.so")));
        assert_eq!(ext.compile[0].command.program, PathBuf::from("g++"));
        assert_eq!(ext.exports, vec!["PyInit_extended"]);
        // The version script restricts exports; hiding at compile time would drop them
        assert!(!ext.compile[0]
            .command
            .args
            .contains(&"-fvisibility=hidden".to_string()));

        let OutputStep::Link(link) = &ext.output else {
            panic!("expected a link step");
        };
        assert_eq!(link.command.program, PathBuf::from("g++"));
        assert_eq!(link.archives, vec![ctx.layout.deps_dir.join("libmylib.a")]);
        assert!(link
            .command
            .args
            .contains(&format!("-L{}", ctx.layout.deps_dir.display())));
        assert!(link.command.args.contains(&"-lmylib".to_string()));

        let script = link.version_script.as_ref().expect("hidden unit needs a version script");
        assert!(script.content.contains("PyInit_extended;"));
        assert!(link
            .command
            .args
            .contains(&format!("-Wl,--version-script={}", script.path.display())));
    }

    #[test]
    fn test_plan_hidden_extension_keeps_tagged_exports() {
        let project = ProjectFixture::new(
            r#"[package]
name = "vis"

[[extension]]
name = "vis"
sources = ["vis.c"]
export-macro = "VIS_EXPORT"
visibility = "hidden"
"#,
        )
        .file(
            "vis.c",
            "VIS_EXPORT int tagged_api(void) { return 1; }\nint untagged(void) { return 2; }\nvoid *PyInit_vis(void) { return 0; }\n",
        )
        .write();
        let units = resolve(&project.manifest(), &opts()).unwrap();
        let ctx = gcc_context(project.root(), Profile::debug());

        let plan = BuildPlan::new(&ctx, &units).unwrap();
        let vis = &plan.units[0];
        assert_eq!(vis.exports, vec!["PyInit_vis", "tagged_api"]);

        let args = &vis.compile[0].command.args;
        assert!(args.iter().any(|a| a.starts_with("-DVIS_EXPORT=")));
        assert!(!args.contains(&"-fvisibility=hidden".to_string()));

        let OutputStep::Link(link) = &vis.output else {
            panic!("expected a link step");
        };
        let script = link.version_script.as_ref().expect("hidden unit needs a version script");
        assert!(script.content.contains("PyInit_vis;"));
        assert!(script.content.contains("tagged_api;"));
        assert!(!script.content.contains("untagged"));
    }

    #[test]
    fn test_object_name() {
        let root = Path::new("/proj");
        assert_eq!(
            object_name(root, Path::new("/proj/src/a.c"), "o"),
            PathBuf::from("src/a.c.o")
        );

        let external = object_name(root, Path::new("/elsewhere/b.cpp"), "obj");
        assert!(external.starts_with("_external"));
        assert_eq!(external.file_name().unwrap(), "b.cpp.obj");
    }

    #[test]
    fn test_emit_compile_commands() {
        let project = ProjectFixture::foo_extension().write();
        let units = resolve(&project.manifest(), &opts()).unwrap();
        let ctx = gcc_context(project.root(), Profile::debug());
        let plan = BuildPlan::new(&ctx, &units).unwrap();

        let path = project.path("compile_commands.json");
        plan.emit_compile_commands(&ctx, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["arguments"][0], "gcc");
        assert!(entries[0]["file"].as_str().unwrap().ends_with("foo.c"));
    }

    #[test]
    fn test_plan_serializes() {
        let project = ProjectFixture::extended_with_mylib().write();
        let units = resolve(&project.manifest(), &opts()).unwrap();
        let ctx = gcc_context(project.root(), Profile::release());
        let plan = BuildPlan::new(&ctx, &units).unwrap();

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["units"][0]["output"]["type"], "archive");
        assert_eq!(json["units"][1]["output"]["type"], "link");
        assert_eq!(json["units"][1]["kind"], "extension");
    }

    #[test]
    fn test_script_step() {
        let settings = BuildSettings {
            script: Some(PathBuf::from("build.py")),
            runner: Some("python3 -u".to_string()),
            ..Default::default()
        };

        let step = ScriptStep::from_settings(&settings, Path::new("/proj"), "release", None).unwrap();
        assert_eq!(step.program, PathBuf::from("python3"));
        assert_eq!(step.args, vec!["-u", "/proj/build.py"]);
        assert_eq!(step.cwd, PathBuf::from("/proj"));
        assert_eq!(step.env["KEEL_PROFILE"], "release");
        assert_eq!(step.env["KEEL_TARGET_DIR"], "/proj/.keel/target/release");
        assert!(!step.env.contains_key("CC"));

        let direct = BuildSettings {
            script: Some(PathBuf::from("build.sh")),
            ..Default::default()
        };
        let step = ScriptStep::from_settings(&direct, Path::new("/proj"), "debug", None).unwrap();
        assert_eq!(step.program, PathBuf::from("/proj/build.sh"));
        assert!(step.args.is_empty());

        assert!(ScriptStep::from_settings(&BuildSettings::default(), Path::new("/proj"), "debug", None).is_none());
    }
}
