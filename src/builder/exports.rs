//! The export list of an extension module.
//!
//! On ELF and Mach-O targets a hidden-visibility extension is restricted to
//! its export list at link time, so the list has to name every symbol the
//! module must keep: the declared exports (including the init symbol) and
//! the symbols tagged with the unit's export macro. Tagged symbols are found
//! by scanning the unit's sources, its `depends` files, and the quoted
//! headers they include.
//!
//! Only names with C linkage can be matched; a tagged C++ function keeps its
//! mangled name and is not exported.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::builder::unit::BuildUnit;
use crate::core::extension::Visibility;
use crate::core::platform::TargetPlatform;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").expect("valid regex"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*").expect("valid regex"));

/// Preprocessor directives, including backslash-continued lines.
static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#(?:[^\n]*\\\n)*[^\n]*").expect("valid regex"));

static QUOTED_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]*"([^"]+)""#).expect("valid regex")
});

const C_KEYWORDS: &[&str] = &[
    "char", "const", "double", "enum", "extern", "float", "inline", "int", "long", "short",
    "signed", "static", "struct", "union", "unsigned", "void", "volatile",
];

/// Symbols `unit` exports from its linked module, declared ones first.
///
/// Tagged symbols are only collected where the link step enforces the
/// list: hidden units with an export macro on non-Windows targets. On
/// Windows the macro expands to `dllexport`, which exports them already.
pub fn export_symbols(unit: &BuildUnit, platform: &TargetPlatform) -> Result<Vec<String>> {
    let mut symbols = unit.exports.symbols.clone();

    let Some(macro_name) = unit.exports.macro_name.as_deref() else {
        return Ok(symbols);
    };
    if unit.exports.visibility != Visibility::Hidden || platform.is_windows() {
        return Ok(symbols);
    }

    let roots = unit
        .sources
        .iter()
        .map(|s| s.path.as_path())
        .chain(unit.depends.iter().map(PathBuf::as_path));

    for symbol in tagged_symbols(roots, &unit.include_dirs, macro_name)? {
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }

    Ok(symbols)
}

/// Names declared with `macro_name` in `roots` and the quoted headers they
/// include, searched for next to the including file and then in
/// `include_dirs`.
pub fn tagged_symbols<'a>(
    roots: impl IntoIterator<Item = &'a Path>,
    include_dirs: &[PathBuf],
    macro_name: &str,
) -> Result<Vec<String>> {
    let declaration = Regex::new(&format!(
        r"\b{}\b[^;{{}}()=]*?\b([A-Za-z_][A-Za-z0-9_]*)\s*[(;=\[]",
        regex::escape(macro_name)
    ))
    .with_context(|| format!("invalid export macro `{}`", macro_name))?;

    let mut pending: Vec<PathBuf> = roots.into_iter().map(Path::to_path_buf).collect();
    let mut visited = HashSet::new();
    let mut symbols = Vec::new();

    while let Some(path) = pending.pop() {
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if !visited.insert(key) {
            continue;
        }

        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {} for exports", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);

        let base = path.parent().unwrap_or(Path::new(""));
        for include in QUOTED_INCLUDE.captures_iter(&text) {
            if let Some(header) = find_header(&include[1], base, include_dirs) {
                pending.push(header);
            }
        }

        let code = strip_comments_and_directives(&text);
        for found in declaration.captures_iter(&code) {
            let name = &found[1];
            if !C_KEYWORDS.contains(&name) && !symbols.iter().any(|s| s == name) {
                symbols.push(name.to_string());
            }
        }
    }

    Ok(symbols)
}

fn find_header(name: &str, base: &Path, include_dirs: &[PathBuf]) -> Option<PathBuf> {
    std::iter::once(base)
        .chain(include_dirs.iter().map(PathBuf::as_path))
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn strip_comments_and_directives(text: &str) -> String {
    let text = BLOCK_COMMENT.replace_all(text, " ");
    let text = LINE_COMMENT.replace_all(&text, " ");
    DIRECTIVE.replace_all(&text, " ").into_owned()
}
