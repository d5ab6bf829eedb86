//! Test fixtures for common test scenarios.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::manifest::{Manifest, MANIFEST_NAME};

/// The sample extension module: one C file exporting its init symbol.
pub const FOO_C: &str = r#"static int foo_state = 0;

void *PyInit_foo(void) {
    foo_state += 1;
    return &foo_state;
}
"#;

/// Helper library header guarding its export macro per platform.
pub const MYLIB_H: &str = r#"#ifndef MYLIB_H
#define MYLIB_H

#ifndef MYLIB_EXPORT
#if defined _WIN32 || defined __CYGWIN__
  #ifdef __GNUC__
    #define MYLIB_EXPORT __attribute__ ((dllexport))
  #else
    #define MYLIB_EXPORT __declspec(dllexport)
  #endif
#else
  #define MYLIB_EXPORT __attribute__ ((visibility("default")))
#endif
#endif

#ifdef __cplusplus
extern "C" {
#endif

MYLIB_EXPORT int mylib_answer(void);

#ifdef __cplusplus
}
#endif

#endif
"#;

pub const MYLIB_C: &str = r#"#include "mylib.h"

int mylib_answer(void) {
    return 42;
}
"#;

pub const EXTENDED_CPP: &str = r#"#include "mylib.h"

extern "C" void *PyInit_extended(void) {
    static int answer = mylib_answer();
    return &answer;
}
"#;

/// A project written to a temporary directory.
pub struct ProjectFixture {
    manifest: String,
    files: Vec<(PathBuf, String)>,
}

/// A fixture that has been written to disk. Dropping it removes the project.
pub struct WrittenProject {
    dir: TempDir,
}

impl ProjectFixture {
    /// Start a project from manifest text.
    pub fn new(manifest: impl Into<String>) -> Self {
        ProjectFixture {
            manifest: manifest.into(),
            files: Vec::new(),
        }
    }

    /// Add a file, path relative to the project root.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// `foo/foo.c` built as extension `foo`.
    pub fn foo_extension() -> Self {
        ProjectFixture::new(
            r#"[package]
name = "foo"
version = "0.1.0"

[[extension]]
name = "foo"
sources = ["foo/foo.c"]
"#,
        )
        .file("foo/foo.c", FOO_C)
    }

    /// C++ extension `extended.extended` linking helper library `mylib`.
    pub fn extended_with_mylib() -> Self {
        ProjectFixture::new(
            r#"[package]
name = "extended"
version = "0.1.0"

[[library]]
name = "mylib"
sources = ["lib/mylib/src/*.c"]
include-dirs = ["lib/mylib/include"]
export-macro = "MYLIB_EXPORT"

[[extension]]
name = "extended.extended"
sources = ["src/extended/extended.cpp"]
include-dirs = ["lib/mylib/include"]
libraries = ["mylib"]
visibility = "hidden"
"#,
        )
        .file("lib/mylib/include/mylib.h", MYLIB_H)
        .file("lib/mylib/src/mylib.c", MYLIB_C)
        .file("src/extended/extended.cpp", EXTENDED_CPP)
    }

    /// Write the project to a fresh temporary directory.
    pub fn write(self) -> WrittenProject {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(dir.path().join(MANIFEST_NAME), &self.manifest)
            .expect("failed to write manifest");

        for (path, content) in &self.files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).expect("failed to create fixture dir");
            }
            std::fs::write(&full, content).expect("failed to write fixture file");
        }

        WrittenProject { dir }
    }
}

impl WrittenProject {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest::load(&self.dir.path().join(MANIFEST_NAME)).expect("fixture manifest is invalid")
    }
}

/// Fake GCC-style compiler used by orchestration tests.
///
/// It understands `-c SRC -o OUT` and `-shared -o OUT`, writes OUT from the
/// contents of its file arguments so outputs change with inputs, and
/// appends every invocation to `calls.log` next to itself. Any argument
/// containing `broken` fails with a GCC-style error; any containing `noisy`
/// prints a warning.
#[cfg(unix)]
pub const FAKE_CC: &str = r#"#!/bin/sh
echo "cc $*" >> "$(dirname "$0")/calls.log"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  case "$a" in
    *broken*) echo "$a:1:1: error: expected ';' before '}' token" >&2; exit 1;;
    *noisy*) echo "$a:3:5: warning: unused variable 'x' [-Wunused-variable]" >&2;;
  esac
  prev="$a"
done
if [ -n "$out" ]; then
  mkdir -p "$(dirname "$out")"
  {
    echo built
    for a in "$@"; do
      if [ "$a" != "$out" ] && [ -f "$a" ]; then cat "$a"; fi
    done
  } > "$out.tmp"
  mv "$out.tmp" "$out"
fi
exit 0
"#;

/// Fake archiver: `ar rcs OUT OBJS...`; OUT holds the objects' contents.
#[cfg(unix)]
pub const FAKE_AR: &str = r#"#!/bin/sh
echo "ar $*" >> "$(dirname "$0")/calls.log"
out="$2"
shift 2
mkdir -p "$(dirname "$out")"
{
  echo archive
  for o in "$@"; do
    if [ -f "$o" ]; then cat "$o"; fi
  done
} > "$out"
exit 0
"#;

/// Install the fake toolchain into `dir` and return a toolchain config
/// pointing at it.
#[cfg(unix)]
pub fn fake_toolchain(dir: &Path) -> crate::util::config::ToolchainConfig {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir).expect("failed to create toolchain dir");
    let mut config = crate::util::config::ToolchainConfig::default();

    for (name, script) in [("gcc", FAKE_CC), ("g++", FAKE_CC), ("ar", FAKE_AR)] {
        let path = dir.join(name);
        std::fs::write(&path, script).expect("failed to write fake tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod fake tool");
    }

    config.toolchain.cc = Some(dir.join("gcc"));
    config.toolchain.cxx = Some(dir.join("g++"));
    config.toolchain.ar = Some(dir.join("ar"));
    config
}

/// Lines recorded by the fake toolchain in `dir`.
#[cfg(unix)]
pub fn fake_toolchain_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_files() {
        let project = ProjectFixture::extended_with_mylib().write();
        assert!(project.path("Keel.toml").is_file());
        assert!(project.path("lib/mylib/include/mylib.h").is_file());

        let manifest = project.manifest();
        assert_eq!(manifest.name(), "extended");
        assert_eq!(manifest.libraries.len(), 1);
    }
}
