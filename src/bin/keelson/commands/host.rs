//! `keelson host` command

use std::path::Path;

use anyhow::Result;
use keelson::ops::find_cc;
use keelson::util::process::PosixRunner;
use keelson::util::TracingReporter;
use keelson::HostDescriptor;

use crate::cli::HostArgs;
use crate::commands::load_config;

pub fn execute(args: HostArgs, config_path: &Path) -> Result<()> {
    let host = match &args.triple {
        Some(triple) => HostDescriptor::parse(triple),
        None => {
            let config = load_config(config_path)?;
            HostDescriptor::detect(&PosixRunner, &find_cc(&config.tools)?, &TracingReporter)
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&host)?);
        return Ok(());
    }

    println!("triple:  {}", host);
    println!("cpu:     {}", host.cpu);
    println!("vendor:  {}", host.vendor);
    println!("os:      {}", host.os);
    println!("windows: {}", host.is_windows);
    println!("darwin:  {}", host.is_darwin);
    println!("bsd:     {}", host.is_bsd);
    println!("linux:   {}", host.is_linux);

    Ok(())
}
