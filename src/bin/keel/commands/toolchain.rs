//! `keel toolchain` command

use anyhow::Result;

use crate::cli::{ToolchainArgs, ToolchainCommands};
use keel::builder::BuildContext;
use keel::core::{find_manifest, Manifest, Profile};
use keel::util::config::{load_toolchain_config, project_toolchain_config_path, ToolchainConfig};
use keel::util::GlobalContext;

pub fn execute(args: ToolchainArgs) -> Result<()> {
    match args.command {
        ToolchainCommands::Show => show_toolchain(),
    }
}

fn show_toolchain() -> Result<()> {
    let ctx = GlobalContext::new()?;

    // Outside a project only the user-wide toolchain.toml applies
    let root = find_manifest(ctx.cwd())
        .ok()
        .and_then(|path| Manifest::load(&path).ok())
        .map(|manifest| manifest.root)
        .unwrap_or_else(|| ctx.cwd().to_path_buf());

    let config = load_toolchain_config(
        Some(&ctx.toolchain_config_path()),
        &project_toolchain_config_path(&root),
    );

    let build_ctx = BuildContext::new(&root, "debug", Profile::debug(), &config)?;
    let toolchain = build_ctx.toolchain();
    let platform = build_ctx.platform;

    println!("Toolchain:");
    println!();
    println!("  Compiler: {}", build_ctx.compiler);
    println!("  CC:       {}", toolchain.compiler_path().display());
    println!("  CXX:      {}", toolchain.cxx_compiler_path().display());
    println!("  AR:       {}", toolchain.archiver_path().display());
    println!();
    println!("  Platform:          {}", platform.os.as_str());
    println!("  Extension suffix:  {}", platform.default_extension_suffix());
    println!("  Export attribute:  {}", toolchain.export_attribute(&platform));
    println!();

    print_overrides(&config);

    println!("Environment:");
    for var in ["CC", "CXX", "AR"] {
        if let Ok(value) = std::env::var(var) {
            println!("  {}={}", var, value);
        }
    }

    Ok(())
}

fn print_overrides(config: &ToolchainConfig) {
    let tc = &config.toolchain;
    if !config.has_tool_overrides()
        && tc.cflags.is_empty()
        && tc.cxxflags.is_empty()
        && tc.ldflags.is_empty()
        && tc.env.is_empty()
    {
        return;
    }

    println!("Overrides (toolchain.toml):");
    if !tc.cflags.is_empty() {
        println!("  cflags:   {}", tc.cflags.join(" "));
    }
    if !tc.cxxflags.is_empty() {
        println!("  cxxflags: {}", tc.cxxflags.join(" "));
    }
    if !tc.ldflags.is_empty() {
        println!("  ldflags:  {}", tc.ldflags.join(" "));
    }
    for (key, value) in &tc.env {
        println!("  env:      {}={}", key, value);
    }
    println!();
}
