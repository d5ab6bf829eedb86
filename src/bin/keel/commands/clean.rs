//! `keel clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use keel::core::Manifest;
use keel::ops::keel_clean::{clean, CleanOptions};
use keel::util::GlobalContext;

pub fn execute(args: CleanArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let manifest = Manifest::load(&ctx.find_manifest()?)?;

    let opts = CleanOptions {
        profile: args.release.then(|| "release".to_string()),
        inplace: args.inplace,
    };

    let result = clean(&manifest, &ctx, &opts)?;
    for path in &result.removed {
        eprintln!("     Removed {}", path.display());
    }

    Ok(())
}
