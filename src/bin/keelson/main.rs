//! Keelson CLI - resolve the native toolkit and probe the host

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use keelson::ops::ConfigureError;
use keelson::util::log::{self, RUN_LOG_TARGET};
use keelson::util::shell::{ColorChoice, Shell, Verbosity};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let log_file = cli.log_file();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let verbosity = if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let shell = Arc::new(Shell::new(verbosity, color));

    if let Err(e) = log::init(cli.verbose, shell.use_color(), log_file.as_deref()) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli, shell) {
        report_fatal(&e, log_file.as_deref());
        std::process::exit(1);
    }
}

fn report_fatal(e: &anyhow::Error, log_file: Option<&Path>) {
    tracing::error!(target: RUN_LOG_TARGET, "{:#}", e);

    eprintln!("error: {:#}", e);
    if let Some(hint) = e.downcast_ref::<ConfigureError>().and_then(|c| c.hint()) {
        eprintln!("  hint: {}", hint);
    }
    if let Some(log) = log_file {
        eprintln!("  see {} for details", log.display());
    }
}

fn run(cli: Cli, shell: Arc<Shell>) -> Result<()> {
    let config_path = cli.config;

    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &config_path, shell),
        Commands::Host(args) => commands::host::execute(args, &config_path),
        Commands::Verify(args) => commands::verify::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
