//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keelson::util::config::CONFIG_FILE_NAME;

/// Keelson - resolve the native toolkit and probe the host before a build
#[derive(Parser)]
#[command(name = "keelson")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the toolkit and probe the host toolchain
    Resolve(ResolveArgs),

    /// Show the host platform description
    Host(HostArgs),

    /// Check an artifact against its digest file
    Verify(VerifyArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Use the toolkit build tree at this path
    #[arg(long, value_name = "DIR")]
    pub toolkit_path: Option<PathBuf>,

    /// Use this locator executable instead of searching PATH
    #[arg(long, value_name = "FILE")]
    pub toolkit_config: Option<PathBuf>,

    /// Try this prebuilt package name first
    #[arg(long, value_name = "NAME")]
    pub prebuilt_name: Option<String>,

    /// Download prebuilt packages again even if cached
    #[arg(long)]
    pub update_prebuilt: bool,

    /// Fail instead of building without the toolkit
    #[arg(long, conflicts_with = "disable_toolkit")]
    pub require_toolkit: bool,

    /// Do not look for the toolkit at all
    #[arg(long)]
    pub disable_toolkit: bool,

    /// Run log, appended to
    #[arg(long, value_name = "FILE", default_value = "config.log")]
    pub log_file: PathBuf,

    /// Write the resolved configuration as JSON
    #[arg(long, value_name = "FILE")]
    pub emit: Option<PathBuf>,

    /// Host triple to use instead of asking the C compiler
    #[arg(long, env = "KEELSON_TRIPLE")]
    pub triple: Option<String>,
}

#[derive(Args)]
pub struct HostArgs {
    /// Describe this triple instead of the detected host
    #[arg(long)]
    pub triple: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// The downloaded file
    pub artifact: PathBuf,

    /// Its `.md5` or `.sha256` companion
    pub digest_file: PathBuf,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

impl Cli {
    /// Run log for commands that keep one.
    pub fn log_file(&self) -> Option<PathBuf> {
        match &self.command {
            Commands::Resolve(args) => Some(args.log_file.clone()),
            _ => None,
        }
    }
}
