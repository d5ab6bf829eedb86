//! Implementation of `keel flags`: the exact command lines for one unit.

use anyhow::Result;
use serde::Serialize;

use crate::builder::plan::BuildPlan;
use crate::builder::resolver::{self, ResolveOptions};
use crate::builder::BuildContext;
use crate::core::manifest::Manifest;
use crate::util::diagnostic::UnknownExtensionError;

/// Compile and link (or archive) commands of one unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFlags {
    pub unit: String,
    /// One command line per source file
    pub compile: Vec<String>,
    /// Link command for extensions, archive command for helper libraries
    pub output: String,
}

/// Plan the whole project and return the commands of unit `name`.
pub fn unit_flags(
    manifest: &Manifest,
    ctx: &BuildContext,
    suffix_override: Option<&str>,
    name: &str,
) -> Result<UnitFlags> {
    let opts = ResolveOptions::new(manifest, &ctx.platform, suffix_override);
    let units = resolver::resolve(manifest, &opts)?;
    let plan = BuildPlan::new(ctx, &units)?;

    let unit = plan.unit(name).ok_or_else(|| {
        let available: Vec<&str> = plan.units.iter().map(|u| u.name.as_str()).collect();
        UnknownExtensionError {
            name: name.to_string(),
            available: (!available.is_empty())
                .then(|| format!("declared units: {}", available.join(", "))),
        }
    })?;

    Ok(UnitFlags {
        unit: unit.name.clone(),
        compile: unit.compile.iter().map(|s| s.command.display()).collect(),
        output: unit.output.command().display(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::context::tests::gcc_context;
    use crate::core::manifest::Profile;
    use crate::test_support::assertions::assert_error_contains;
    use crate::test_support::ProjectFixture;

    #[test]
    fn test_flags_for_extension() {
        let project = ProjectFixture::extended_with_mylib().write();
        let manifest = project.manifest();
        let ctx = gcc_context(project.root(), Profile::debug());

        let flags = unit_flags(&manifest, &ctx, Some(".so"), "extended.extended").unwrap();

        assert_eq!(flags.compile.len(), 1);
        assert!(flags.compile[0].contains("-fPIC"));
        assert!(flags.output.contains("-shared"));
        assert!(flags.output.contains("-lmylib"));
    }

    #[test]
    fn test_flags_for_helper_library() {
        let project = ProjectFixture::extended_with_mylib().write();
        let manifest = project.manifest();
        let ctx = gcc_context(project.root(), Profile::debug());

        let flags = unit_flags(&manifest, &ctx, None, "mylib").unwrap();
        assert!(flags.output.contains("rcs"));
    }

    #[test]
    fn test_flags_unknown_unit() {
        let project = ProjectFixture::foo_extension().write();
        let manifest = project.manifest();
        let ctx = gcc_context(project.root(), Profile::debug());

        assert_error_contains(unit_flags(&manifest, &ctx, None, "bar"), "no extension named `bar`");
    }
}
