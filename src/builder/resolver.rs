//! Extension descriptor resolution.
//!
//! Turns the raw `[[library]]` and `[[extension]]` declarations of a
//! manifest into normalized [`BuildUnit`]s: names validated, source globs
//! expanded, languages assigned, paths made absolute, and helper libraries
//! ordered so that every library comes before the units that link it.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::builder::unit::{BuildUnit, ExportSpec, SourceFile, UnitKind};
use crate::core::extension::{
    is_c_identifier, Define, DefineParseError, ExtensionDecl, InvalidModuleName, LibraryDecl,
    ModuleName, Visibility,
};
use crate::core::language::{CppStandard, Language};
use crate::core::manifest::Manifest;
use crate::core::platform::TargetPlatform;
use crate::util::fs::{glob_files, is_glob_pattern, resolve_path};

/// Errors produced while resolving declarations into build units.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidModuleName(#[from] InvalidModuleName),

    #[error("invalid library name `{0}`: must be a C identifier")]
    InvalidLibraryName(String),

    #[error("`{unit}` declares no sources")]
    NoSources { unit: String },

    #[error("source `{}` of `{unit}` does not exist", path.display())]
    SourceNotFound { unit: String, path: PathBuf },

    #[error("pattern `{pattern}` of `{unit}` matched no files")]
    GlobNoMatch { unit: String, pattern: String },

    #[error("invalid source pattern `{pattern}` in `{unit}`: {message}")]
    InvalidGlob {
        unit: String,
        pattern: String,
        message: String,
    },

    #[error("cannot infer the language of `{}` in `{unit}`; set `language`", path.display())]
    UnknownLanguage { unit: String, path: PathBuf },

    #[error("in `{unit}`: {source}")]
    InvalidDefine {
        unit: String,
        #[source]
        source: DefineParseError,
    },

    #[error("invalid macro name `{name}` in `{unit}`")]
    InvalidMacroName { unit: String, name: String },

    #[error("invalid export symbol `{name}` in `{unit}`")]
    InvalidSymbol { unit: String, name: String },

    #[error("helper libraries form a dependency cycle through `{0}`")]
    LibraryCycle(String),

    #[error("extensions `{first}` and `{second}` would both install to `{}`", path.display())]
    DuplicateInstallPath {
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("no extension named `{name}` (available: {available})")]
    UnknownExtension { name: String, available: String },
}

/// Inputs to resolution that do not come from the manifest.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Suffix appended to the module leaf to form the install file name
    pub extension_suffix: String,
}

impl ResolveOptions {
    /// Pick the extension suffix: explicit override, then manifest, then
    /// the platform default.
    pub fn new(manifest: &Manifest, platform: &TargetPlatform, suffix_override: Option<&str>) -> Self {
        let extension_suffix = suffix_override
            .map(str::to_string)
            .or_else(|| manifest.build.extension_suffix.clone())
            .unwrap_or_else(|| platform.default_extension_suffix().to_string());

        ResolveOptions { extension_suffix }
    }
}

/// Resolve every declaration in `manifest`.
///
/// Helper libraries come first, in dependency order, followed by the
/// extensions in declaration order.
pub fn resolve(manifest: &Manifest, opts: &ResolveOptions) -> Result<Vec<BuildUnit>, ResolveError> {
    let root = manifest.root.as_path();
    let library_names: HashSet<&str> = manifest.libraries.iter().map(|l| l.name.as_str()).collect();

    let mut libraries = Vec::with_capacity(manifest.libraries.len());
    for decl in &manifest.libraries {
        libraries.push(resolve_library(manifest, decl, &library_names)?);
    }
    let mut units = order_libraries(libraries)?;

    let mut install_paths: HashMap<String, (String, PathBuf)> = HashMap::new();
    for decl in &manifest.extensions {
        let unit = resolve_extension(manifest, decl, &library_names, opts)?;

        if let Some(path) = &unit.install_path {
            // Case-insensitive filesystems would merge these
            let key = path.to_string_lossy().to_lowercase();
            if let Some((first, _)) = install_paths.get(&key) {
                return Err(ResolveError::DuplicateInstallPath {
                    first: first.clone(),
                    second: unit.name.clone(),
                    path: path.clone(),
                });
            }
            install_paths.insert(key, (unit.name.clone(), path.clone()));
        }

        units.push(unit);
    }

    tracing::debug!(
        "Resolved {} unit(s) from {}",
        units.len(),
        root.join(crate::core::manifest::MANIFEST_NAME).display()
    );

    Ok(units)
}

/// Restrict `units` to the named extensions and the helper libraries they
/// transitively need. An empty selection keeps everything.
pub fn select(units: Vec<BuildUnit>, names: &[String]) -> Result<Vec<BuildUnit>, ResolveError> {
    if names.is_empty() {
        return Ok(units);
    }

    for name in names {
        if !units.iter().any(|u| u.is_extension() && &u.name == name) {
            let available: Vec<&str> = units
                .iter()
                .filter(|u| u.is_extension())
                .map(|u| u.name.as_str())
                .collect();
            return Err(ResolveError::UnknownExtension {
                name: name.clone(),
                available: if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                },
            });
        }
    }

    let mut keep: HashSet<String> = names.iter().cloned().collect();
    for name in names {
        for lib in helper_closure(&units, name) {
            keep.insert(lib);
        }
    }

    Ok(units.into_iter().filter(|u| keep.contains(&u.name)).collect())
}

/// Every helper library `unit_name` needs, directly or through other
/// helpers, ordered dependents before dependencies (link order).
pub fn link_order(units: &[BuildUnit], unit_name: &str) -> Vec<String> {
    let closure: HashSet<String> = helper_closure(units, unit_name).into_iter().collect();

    // Units are in dependency order; walking backwards puts dependents first
    units
        .iter()
        .rev()
        .filter(|u| u.kind == UnitKind::HelperLib && closure.contains(&u.name))
        .map(|u| u.name.clone())
        .collect()
}

fn helper_closure(units: &[BuildUnit], unit_name: &str) -> Vec<String> {
    let by_name: HashMap<&str, &BuildUnit> = units.iter().map(|u| (u.name.as_str(), u)).collect();

    let mut visited = HashSet::new();
    let mut stack: Vec<&str> = by_name
        .get(unit_name)
        .map(|u| u.helper_libs.iter().map(String::as_str).collect())
        .unwrap_or_default();

    while let Some(current) = stack.pop() {
        if !visited.insert(current.to_string()) {
            continue;
        }
        if let Some(unit) = by_name.get(current) {
            stack.extend(unit.helper_libs.iter().map(String::as_str));
        }
    }

    visited.into_iter().collect()
}

/// Sort helper libraries so dependencies come first, rejecting cycles.
fn order_libraries(libraries: Vec<BuildUnit>) -> Result<Vec<BuildUnit>, ResolveError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..libraries.len()).map(|i| graph.add_node(i)).collect();
    let index: HashMap<&str, usize> = libraries
        .iter()
        .enumerate()
        .map(|(i, u)| (u.name.as_str(), i))
        .collect();

    // Edge dependency -> dependent, so a topological sort yields dependencies first
    for (i, unit) in libraries.iter().enumerate() {
        for dep in &unit.helper_libs {
            if let Some(&j) = index.get(dep.as_str()) {
                graph.add_edge(nodes[j], nodes[i], ());
            }
        }
    }

    let order = toposort(&graph, None)
        .map_err(|cycle| ResolveError::LibraryCycle(libraries[graph[cycle.node_id()]].name.clone()))?;

    let mut slots: Vec<Option<BuildUnit>> = libraries.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|node| slots[graph[node]].take())
        .collect())
}

fn resolve_library(
    manifest: &Manifest,
    decl: &LibraryDecl,
    library_names: &HashSet<&str>,
) -> Result<BuildUnit, ResolveError> {
    if !is_c_identifier(&decl.name) {
        return Err(ResolveError::InvalidLibraryName(decl.name.clone()));
    }
    let unit = decl.name.as_str();
    let root = manifest.root.as_path();

    let sources = assign_languages(unit, expand_sources(root, unit, &decl.sources)?, decl.language)?;
    let (helper_libs, system_libs) = split_libraries(&decl.libraries, library_names);
    let export_macro = validate_macro(unit, decl.export_macro.as_deref())?;

    Ok(BuildUnit {
        name: decl.name.clone(),
        kind: UnitKind::HelperLib,
        module: None,
        link_language: link_language(&sources, decl.language),
        cpp_std: decl.cpp_std,
        include_dirs: include_dirs(manifest, &decl.include_dirs),
        defines: parse_defines(unit, &decl.defines)?,
        undefines: Vec::new(),
        library_dirs: Vec::new(),
        helper_libs,
        system_libs,
        extra_compile_args: decl.extra_compile_args.clone(),
        extra_link_args: Vec::new(),
        exports: ExportSpec {
            symbols: Vec::new(),
            macro_name: export_macro,
            visibility: Visibility::Default,
        },
        depends: Vec::new(),
        optional: false,
        install_path: None,
        sources,
    })
}

fn resolve_extension(
    manifest: &Manifest,
    decl: &ExtensionDecl,
    library_names: &HashSet<&str>,
    opts: &ResolveOptions,
) -> Result<BuildUnit, ResolveError> {
    let module = ModuleName::new(&decl.name)?;
    let unit = decl.name.as_str();
    let root = manifest.root.as_path();

    let sources = assign_languages(unit, expand_sources(root, unit, &decl.sources)?, decl.language)?;
    let (helper_libs, system_libs) = split_libraries(&decl.libraries, library_names);

    for name in &decl.undef_macros {
        if !is_c_identifier(name) {
            return Err(ResolveError::InvalidMacroName {
                unit: unit.to_string(),
                name: name.clone(),
            });
        }
    }
    let export_macro = validate_macro(unit, decl.export_macro.as_deref())?;

    let mut symbols = Vec::new();
    for symbol in &decl.export_symbols {
        if !is_c_identifier(symbol) {
            return Err(ResolveError::InvalidSymbol {
                unit: unit.to_string(),
                name: symbol.clone(),
            });
        }
        if !symbols.contains(symbol) {
            symbols.push(symbol.clone());
        }
    }
    if let Some(init) = manifest.build.init_symbol_for(module.leaf()) {
        if !is_c_identifier(&init) {
            return Err(ResolveError::InvalidSymbol {
                unit: unit.to_string(),
                name: init,
            });
        }
        if !symbols.contains(&init) {
            symbols.push(init);
        }
    }

    let depends = dedup_paths(decl.depends.iter().map(|p| resolve_path(root, p)));
    for path in &depends {
        if !path.exists() {
            tracing::warn!("`{}` depends on missing file {}", unit, path.display());
        }
    }

    Ok(BuildUnit {
        name: decl.name.clone(),
        kind: UnitKind::Extension,
        install_path: Some(module.install_path(&opts.extension_suffix)),
        module: Some(module),
        link_language: link_language(&sources, decl.language),
        cpp_std: decl.cpp_std,
        include_dirs: include_dirs(manifest, &decl.include_dirs),
        defines: parse_defines(unit, &decl.defines)?,
        undefines: decl.undef_macros.clone(),
        library_dirs: dedup_paths(decl.library_dirs.iter().map(|p| resolve_path(root, p))),
        helper_libs,
        system_libs,
        extra_compile_args: decl.extra_compile_args.clone(),
        extra_link_args: decl.extra_link_args.clone(),
        exports: ExportSpec {
            symbols,
            macro_name: export_macro,
            visibility: decl.visibility,
        },
        depends,
        optional: decl.optional,
        sources,
    })
}

/// Expand source entries into existing files, keeping declaration order.
fn expand_sources(root: &Path, unit: &str, entries: &[String]) -> Result<Vec<PathBuf>, ResolveError> {
    if entries.is_empty() {
        return Err(ResolveError::NoSources {
            unit: unit.to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in entries {
        if is_glob_pattern(entry) {
            let matched = glob_files(root, entry).map_err(|e| ResolveError::InvalidGlob {
                unit: unit.to_string(),
                pattern: entry.clone(),
                message: format!("{:#}", e),
            })?;
            if matched.is_empty() {
                return Err(ResolveError::GlobNoMatch {
                    unit: unit.to_string(),
                    pattern: entry.clone(),
                });
            }
            files.extend(matched.iter().map(|p| resolve_path(root, p)));
        } else {
            let path = resolve_path(root, Path::new(entry));
            if !path.is_file() {
                return Err(ResolveError::SourceNotFound {
                    unit: unit.to_string(),
                    path,
                });
            }
            files.push(path);
        }
    }

    Ok(dedup_paths(files))
}

fn assign_languages(
    unit: &str,
    paths: Vec<PathBuf>,
    declared: Option<Language>,
) -> Result<Vec<SourceFile>, ResolveError> {
    paths
        .into_iter()
        .map(|path| match Language::from_path(&path).or(declared) {
            Some(language) => Ok(SourceFile { path, language }),
            None => Err(ResolveError::UnknownLanguage {
                unit: unit.to_string(),
                path,
            }),
        })
        .collect()
}

fn link_language(sources: &[SourceFile], declared: Option<Language>) -> Language {
    if declared == Some(Language::Cxx) || sources.iter().any(|s| s.language == Language::Cxx) {
        Language::Cxx
    } else {
        Language::C
    }
}

/// Project-wide include dirs first, then the unit's own.
fn include_dirs(manifest: &Manifest, own: &[PathBuf]) -> Vec<PathBuf> {
    let root = manifest.root.as_path();
    let dirs = dedup_paths(
        manifest
            .build
            .include_dirs
            .iter()
            .chain(own)
            .map(|p| resolve_path(root, p)),
    );

    for dir in &dirs {
        if !dir.is_dir() {
            tracing::warn!("include directory {} does not exist", dir.display());
        }
    }

    dirs
}

fn parse_defines(unit: &str, raw: &[String]) -> Result<Vec<Define>, ResolveError> {
    raw.iter()
        .map(|d| {
            d.parse().map_err(|source| ResolveError::InvalidDefine {
                unit: unit.to_string(),
                source,
            })
        })
        .collect()
}

fn validate_macro(unit: &str, name: Option<&str>) -> Result<Option<String>, ResolveError> {
    match name {
        Some(name) if !is_c_identifier(name) => Err(ResolveError::InvalidMacroName {
            unit: unit.to_string(),
            name: name.to_string(),
        }),
        other => Ok(other.map(str::to_string)),
    }
}

/// Split `libraries` into declared helper libraries and system libraries.
fn split_libraries(libraries: &[String], library_names: &HashSet<&str>) -> (Vec<String>, Vec<String>) {
    let mut helpers = Vec::new();
    let mut system = Vec::new();
    for lib in libraries {
        let target = if library_names.contains(lib.as_str()) {
            &mut helpers
        } else {
            &mut system
        };
        if !target.contains(lib) {
            target.push(lib.clone());
        }
    }
    (helpers, system)
}

fn dedup_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// The C++ standard a unit compiles with, if it has any C++ sources.
pub fn effective_cpp_std(unit: &BuildUnit) -> Option<CppStandard> {
    if unit.has_cxx() {
        unit.cpp_std
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::TargetOs;
    use crate::test_support::ProjectFixture;

    fn opts() -> ResolveOptions {
        ResolveOptions {
            extension_suffix: ".so".to_string(),
        }
    }

    #[test]
    fn test_resolve_foo_extension() {
        let project = ProjectFixture::foo_extension().write();
        let units = resolve(&project.manifest(), &opts()).unwrap();

        assert_eq!(units.len(), 1);
        let foo = &units[0];
        assert_eq!(foo.kind, UnitKind::Extension);
        assert_eq!(foo.sources.len(), 1);
        assert_eq!(foo.sources[0].path, project.path("foo/foo.c"));
        assert_eq!(foo.sources[0].language, Language::C);
        assert_eq!(foo.link_language, Language::C);
        assert_eq!(foo.exports.symbols, vec!["PyInit_foo"]);
        assert_eq!(foo.install_path, Some(PathBuf::from("foo.so")));
    }

    #[test]
    fn test_resolve_helper_library_first() {
        let project = ProjectFixture::extended_with_mylib().write();
        let units = resolve(&project.manifest(), &opts()).unwrap();

        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["mylib", "extended.extended"]);

        let mylib = &units[0];
        assert_eq!(mylib.kind, UnitKind::HelperLib);
        assert_eq!(mylib.exports.macro_name.as_deref(), Some("MYLIB_EXPORT"));
        assert_eq!(mylib.sources[0].path, project.path("lib/mylib/src/mylib.c"));

        let ext = &units[1];
        assert_eq!(ext.link_language, Language::Cxx);
        assert_eq!(ext.helper_libs, vec!["mylib"]);
        assert!(ext.system_libs.is_empty());
        assert_eq!(ext.exports.visibility, Visibility::Hidden);
        assert_eq!(ext.exports.symbols, vec!["PyInit_extended"]);
        assert_eq!(
            ext.install_path,
            Some(Path::new("extended").join("extended.so"))
        );
    }

    #[test]
    fn test_global_include_dirs_come_first_and_dedupe() {
        let project = ProjectFixture::new(
            r#"[package]
name = "demo"

[build]
include-dirs = ["include"]

[[extension]]
name = "demo"
sources = ["demo.c", "./demo.c"]
include-dirs = ["src", "include"]
library-dirs = ["libs"]
libraries = ["m", "m"]
defines = ["FOO", "BAR=1"]
undef-macros = ["NDEBUG"]
export-symbols = ["demo_api", "PyInit_demo"]
"#,
        )
        .file("demo.c", "int x;")
        .file("include/demo.h", "")
        .file("src/other.h", "")
        .write();

        let units = resolve(&project.manifest(), &opts()).unwrap();
        let unit = &units[0];

        assert_eq!(unit.sources.len(), 1);
        assert_eq!(
            unit.include_dirs,
            vec![project.path("include"), project.path("src")]
        );
        assert_eq!(unit.library_dirs, vec![project.path("libs")]);
        assert_eq!(unit.system_libs, vec!["m"]);
        assert_eq!(
            unit.defines,
            vec![Define::flag("FOO"), Define::with_value("BAR", "1")]
        );
        assert_eq!(unit.undefines, vec!["NDEBUG"]);
        // The init symbol is only added once
        assert_eq!(unit.exports.symbols, vec!["demo_api", "PyInit_demo"]);
    }

    #[test]
    fn test_missing_source_and_empty_glob() {
        let project = ProjectFixture::new(
            "[package]\nname = \"x\"\n\n[[extension]]\nname = \"x\"\nsources = [\"missing.c\"]\n",
        )
        .write();
        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::SourceNotFound { .. }));

        let project = ProjectFixture::new(
            "[package]\nname = \"x\"\n\n[[extension]]\nname = \"x\"\nsources = [\"src/*.c\"]\n",
        )
        .write();
        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::GlobNoMatch { ref pattern, .. } if pattern == "src/*.c"));

        let project = ProjectFixture::new(
            "[package]\nname = \"x\"\n\n[[extension]]\nname = \"x\"\nsources = []\n",
        )
        .write();
        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::NoSources { .. }));
    }

    #[test]
    fn test_unknown_language_needs_declaration() {
        let manifest = |language: &str| {
            format!(
                "[package]\nname = \"x\"\n\n[[extension]]\nname = \"x\"\nsources = [\"x.m\"]\n{}",
                language
            )
        };

        let project = ProjectFixture::new(manifest("")).file("x.m", "").write();
        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownLanguage { .. }));

        let project = ProjectFixture::new(manifest("language = \"c++\"\n"))
            .file("x.m", "")
            .write();
        let units = resolve(&project.manifest(), &opts()).unwrap();
        assert_eq!(units[0].sources[0].language, Language::Cxx);
    }

    #[test]
    fn test_invalid_names_and_macros() {
        let project = ProjectFixture::new(
            "[package]\nname = \"x\"\n\n[[extension]]\nname = \"pkg.bad-name\"\nsources = [\"x.c\"]\n",
        )
        .file("x.c", "")
        .write();
        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidModuleName(_)));

        let project = ProjectFixture::new(
            "[package]\nname = \"x\"\n\n[[extension]]\nname = \"x\"\nsources = [\"x.c\"]\nexport-macro = \"NOT A MACRO\"\n",
        )
        .file("x.c", "")
        .write();
        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidMacroName { .. }));

        let project = ProjectFixture::new(
            "[package]\nname = \"x\"\n\n[[extension]]\nname = \"x\"\nsources = [\"x.c\"]\ndefines = [\"2BAD\"]\n",
        )
        .file("x.c", "")
        .write();
        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidDefine { .. }));
    }

    #[test]
    fn test_library_order_and_cycle() {
        let project = ProjectFixture::new(
            r#"[package]
name = "x"

[[library]]
name = "top"
sources = ["top.c"]
libraries = ["base", "z"]

[[library]]
name = "base"
sources = ["base.c"]

[[extension]]
name = "x"
sources = ["x.c"]
libraries = ["top"]
"#,
        )
        .file("top.c", "")
        .file("base.c", "")
        .file("x.c", "")
        .write();

        let units = resolve(&project.manifest(), &opts()).unwrap();
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["base", "top", "x"]);
        assert_eq!(units[1].system_libs, vec!["z"]);
        assert_eq!(link_order(&units, "x"), vec!["top", "base"]);

        let project = ProjectFixture::new(
            r#"[package]
name = "x"

[[library]]
name = "a"
sources = ["a.c"]
libraries = ["b"]

[[library]]
name = "b"
sources = ["b.c"]
libraries = ["a"]
"#,
        )
        .file("a.c", "")
        .file("b.c", "")
        .write();

        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::LibraryCycle(_)));
    }

    #[test]
    fn test_duplicate_install_path() {
        let project = ProjectFixture::new(
            r#"[package]
name = "x"

[[extension]]
name = "pkg.Mod"
sources = ["a.c"]

[[extension]]
name = "pkg.mod"
sources = ["b.c"]
"#,
        )
        .file("a.c", "")
        .file("b.c", "")
        .write();

        let err = resolve(&project.manifest(), &opts()).unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateInstallPath { .. }));
    }

    #[test]
    fn test_select() {
        let project = ProjectFixture::extended_with_mylib().write();
        let units = resolve(&project.manifest(), &opts()).unwrap();

        let selected = select(units.clone(), &["extended.extended".to_string()]).unwrap();
        assert_eq!(selected.len(), 2);

        let all = select(units.clone(), &[]).unwrap();
        assert_eq!(all.len(), 2);

        let err = select(units, &["nope".to_string()]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nope"));
        assert!(message.contains("extended.extended"));
    }

    #[test]
    fn test_extension_suffix_precedence() {
        let project = ProjectFixture::foo_extension().write();
        let manifest = project.manifest();
        let windows = TargetPlatform::new(TargetOs::Windows);

        assert_eq!(ResolveOptions::new(&manifest, &windows, None).extension_suffix, ".dll");
        assert_eq!(
            ResolveOptions::new(&manifest, &windows, Some(".pyd")).extension_suffix,
            ".pyd"
        );
    }
}
