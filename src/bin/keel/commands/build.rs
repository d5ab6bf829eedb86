//! `keel build` command

use anyhow::Result;

use crate::cli::{BuildArgs, MessageFormatArg};
use keel::core::Manifest;
use keel::ops::keel_build::{build, BuildOptions, MessageFormat};
use keel::util::GlobalContext;

pub fn execute(args: BuildArgs, verbose: bool) -> Result<()> {
    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(verbose);

    let manifest_path = ctx.find_manifest()?;
    let manifest = Manifest::load(&manifest_path)?;

    let message_format = match args.message_format {
        MessageFormatArg::Human => MessageFormat::Human,
        MessageFormatArg::Json => MessageFormat::Json,
    };

    let opts = BuildOptions {
        release: args.release,
        profile: args.profile,
        extensions: args.extensions,
        jobs: args.jobs,
        keep_going: args.keep_going,
        force: args.force,
        inplace: args.inplace,
        emit_compile_commands: args.emit_compile_commands,
        plan_only: args.plan,
        message_format,
    };

    let result = build(&manifest, &ctx, &opts)?;

    if let Some(plan) = &result.plan {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    if message_format == MessageFormat::Human {
        for artifact in &result.artifacts {
            eprintln!("    Finished {}", artifact.display());
        }
        for installed in &result.installed {
            eprintln!("   Installed {}", installed.display());
        }
    }

    Ok(())
}
