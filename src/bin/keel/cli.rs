//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// keel - build native C/C++ extension modules
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the extension modules of the current project
    Build(BuildArgs),

    /// Remove build artifacts
    Clean(CleanArgs),

    /// Show the compile and link commands of an extension
    Flags(FlagsArgs),

    /// Toolchain information
    Toolchain(ToolchainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build in release mode
    #[arg(short, long)]
    pub release: bool,

    /// Build with a profile declared in Keel.toml
    #[arg(long, conflicts_with = "release")]
    pub profile: Option<String>,

    /// Only build these extensions (and the libraries they need)
    #[arg(long = "ext", value_name = "NAME")]
    pub extensions: Vec<String>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Keep building other units after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Rebuild everything, ignoring fingerprints
    #[arg(long)]
    pub force: bool,

    /// Copy built extensions into the source tree
    #[arg(long)]
    pub inplace: bool,

    /// Emit compile_commands.json
    #[arg(long)]
    pub emit_compile_commands: bool,

    /// Print the build plan as JSON (no build)
    #[arg(long)]
    pub plan: bool,

    /// Output format for build messages
    #[arg(long, value_enum, default_value_t = MessageFormatArg::Human)]
    pub message_format: MessageFormatArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormatArg {
    Human,
    Json,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Only clean the release profile
    #[arg(short, long)]
    pub release: bool,

    /// Also remove extension modules installed into the source tree
    #[arg(long)]
    pub inplace: bool,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Extension (or helper library) to show commands for
    pub name: String,

    /// Show compile commands only
    #[arg(long, conflicts_with = "link")]
    pub compile: bool,

    /// Show the link command only
    #[arg(long)]
    pub link: bool,

    /// Show the commands of the release profile
    #[arg(short, long)]
    pub release: bool,
}

#[derive(Args)]
pub struct ToolchainArgs {
    #[command(subcommand)]
    pub command: ToolchainCommands,
}

#[derive(Subcommand)]
pub enum ToolchainCommands {
    /// Show the detected toolchain and its configuration
    Show,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
