//! `keel flags` command

use anyhow::Result;

use crate::cli::FlagsArgs;
use keel::builder::BuildContext;
use keel::core::Manifest;
use keel::ops::{unit_flags, LoadedConfig};
use keel::util::GlobalContext;

pub fn execute(args: FlagsArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let manifest = Manifest::load(&ctx.find_manifest()?)?;
    let loaded = LoadedConfig::load(&ctx, &manifest);

    let profile_name = if args.release { "release" } else { "debug" };
    let build_ctx = BuildContext::new(
        &manifest.root,
        profile_name,
        manifest.profile(profile_name)?,
        &loaded.toolchain,
    )?;

    let flags = unit_flags(
        &manifest,
        &build_ctx,
        loaded.config.build.extension_suffix.as_deref(),
        &args.name,
    )?;

    if !args.link {
        println!("# Compile commands for `{}`:", flags.unit);
        for command in &flags.compile {
            println!("  {}", command);
        }
    }

    if !args.compile && !args.link {
        println!();
    }

    if !args.compile {
        println!("# Link command for `{}`:", flags.unit);
        println!("  {}", flags.output);
    }

    Ok(())
}
