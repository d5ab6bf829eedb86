//! User-facing error reporting.
//!
//! Every error shown to the user should name the root cause and, where one
//! exists, a concrete next step.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::builder::resolver::ResolveError;
use crate::core::manifest::ManifestError;

/// Next steps attached to well-known failures.
pub mod suggestions {
    pub const NO_MANIFEST: &str = "Create a `Keel.toml` declaring at least one [[extension]]";

    pub const EXTENSION_NOT_FOUND: &str = "Run `keel build --plan` to see the declared extensions";

    pub const BUILD_FAILED: &str = "Run `keel build --verbose` to see every compiler invocation";

    pub const NO_TOOLCHAIN: &str =
        "Set CC/CXX or add `cc = \"/path/to/cc\"` to `.keel/toolchain.toml`";
}

/// An error rendered for the terminal: the message, the chain of causes,
/// and suggested fixes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub causes: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            causes: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Build a diagnostic from an error chain, attaching the suggestion
    /// known for its root type.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let mut diag = Diagnostic::error(err.to_string());
        for cause in err.chain().skip(1) {
            diag = diag.with_cause(cause.to_string());
        }

        if let Some(unknown) = err.downcast_ref::<UnknownExtensionError>() {
            if let Some(available) = &unknown.available {
                diag = diag.with_cause(available.clone());
            }
        }

        match suggestion_for(err) {
            Some(suggestion) => diag.with_suggestion(suggestion),
            None => diag,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format for terminal output, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let (error, help) = if color {
            ("\x1b[1;31merror\x1b[0m", "\x1b[1;32mhelp\x1b[0m")
        } else {
            ("error", "help")
        };

        let mut output = format!("{}: {}\n", error, self.message);
        for cause in &self.causes {
            output.push_str(&format!("  = {}\n", cause));
        }
        for suggestion in &self.suggestions {
            output.push_str(&format!("{}: {}\n", help, suggestion));
        }
        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

fn suggestion_for(err: &anyhow::Error) -> Option<&'static str> {
    if err.downcast_ref::<BuildFailedError>().is_some() {
        Some(suggestions::BUILD_FAILED)
    } else if err.downcast_ref::<NoToolchainError>().is_some() {
        Some(suggestions::NO_TOOLCHAIN)
    } else if err.downcast_ref::<UnknownExtensionError>().is_some() {
        Some(suggestions::EXTENSION_NOT_FOUND)
    } else if let Some(ManifestError::NotFound { .. }) = err.downcast_ref::<ManifestError>() {
        Some(suggestions::NO_MANIFEST)
    } else if let Some(ResolveError::UnknownExtension { .. }) = err.downcast_ref::<ResolveError>() {
        Some(suggestions::EXTENSION_NOT_FOUND)
    } else {
        None
    }
}

/// One or more required units failed to build.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to build {}", failed.join(", "))]
#[diagnostic(code(keel::build::failed))]
pub struct BuildFailedError {
    /// Names of the units that failed or were blocked.
    pub failed: Vec<String>,
}

/// A unit was requested that the manifest does not declare.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("no extension named `{name}`")]
#[diagnostic(code(keel::resolve::unknown_extension))]
pub struct UnknownExtensionError {
    pub name: String,
    #[help]
    pub available: Option<String>,
}

/// No C compiler could be located.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("no C compiler found; keel requires gcc, clang, or cl")]
#[diagnostic(code(keel::toolchain::not_found))]
pub struct NoToolchainError;

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("failed to compile `foo`")
            .with_cause("cc exited with status 1")
            .with_suggestion(suggestions::BUILD_FAILED);

        let output = diag.format(false);
        assert_eq!(
            output,
            "error: failed to compile `foo`\n  = cc exited with status 1\n\
             help: Run `keel build --verbose` to see every compiler invocation\n"
        );
    }

    #[test]
    fn test_from_error_collects_chain() {
        let err = Err::<(), _>(NoToolchainError)
            .context("failed to create build context")
            .unwrap_err();

        let diag = Diagnostic::from_error(&err);
        assert_eq!(diag.message, "failed to create build context");
        assert_eq!(diag.causes, vec![NoToolchainError.to_string()]);
        assert_eq!(diag.suggestions, vec![suggestions::NO_TOOLCHAIN.to_string()]);
    }

    #[test]
    fn test_from_error_suggestions() {
        let err = anyhow::Error::new(ManifestError::NotFound {
            dir: PathBuf::from("/tmp/project"),
        });
        assert_eq!(
            Diagnostic::from_error(&err).suggestions,
            vec![suggestions::NO_MANIFEST.to_string()]
        );

        let err = anyhow::Error::new(UnknownExtensionError {
            name: "bar".to_string(),
            available: Some("declared units: foo".to_string()),
        });
        let diag = Diagnostic::from_error(&err);
        assert_eq!(diag.causes, vec!["declared units: foo".to_string()]);
        assert_eq!(diag.suggestions, vec![suggestions::EXTENSION_NOT_FOUND.to_string()]);

        let err = anyhow::anyhow!("something else");
        assert!(Diagnostic::from_error(&err).suggestions.is_empty());
    }

    #[test]
    fn test_build_failed_message_lists_units() {
        let err = BuildFailedError {
            failed: vec!["mylib".to_string(), "extended.extended".to_string()],
        };
        assert_eq!(err.to_string(), "failed to build mylib, extended.extended");
    }
}
