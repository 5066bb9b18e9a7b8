//! `keelson resolve` command

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use keelson::sources::HttpFetcher;
use keelson::util::config::Requirement;
use keelson::util::fs::write_string;
use keelson::util::shell::{Shell, Status};
use keelson::util::TracingReporter;
use keelson::{CandidateKind, Pipeline};

use crate::cli::ResolveArgs;
use crate::commands::load_config;

pub fn execute(args: ResolveArgs, config_path: &Path, shell: Arc<Shell>) -> Result<()> {
    let mut config = load_config(config_path)?;

    // Command-line flags win over the file and the environment.
    if let Some(path) = args.toolkit_path {
        config.toolkit.path = Some(path);
    }
    if let Some(locator) = args.toolkit_config {
        config.toolkit.locator_override = Some(locator);
    }
    if let Some(name) = args.prebuilt_name {
        config.toolkit.prebuilt_name = Some(name);
    }
    if args.update_prebuilt {
        config.toolkit.update_prebuilt = true;
    }
    if args.require_toolkit {
        config.toolkit.requirement = Requirement::Mandatory;
    }
    if args.disable_toolkit {
        config.toolkit.requirement = Requirement::Disabled;
    }

    tracing::debug!("resolving with {:?}", config);

    let fetcher = HttpFetcher::new(&config.net, Arc::clone(&shell))?;
    let reporter = TracingReporter;

    let resolved = Pipeline::new(&config, &fetcher, &reporter)
        .with_triple(args.triple)
        .run()?;

    shell.status(Status::Found, format!("host {}", resolved.host()));
    let toolkit = resolved.toolkit();
    match toolkit.kind {
        CandidateKind::None => {
            shell.status(Status::Disabled, format!("{} (JIT off)", config.toolkit.name))
        }
        kind => shell.status(
            Status::Using,
            format!(
                "{} from {} ({})",
                config.toolkit.name,
                kind,
                toolkit
                    .locator_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
        ),
    }

    if let Some(emit) = &args.emit {
        write_string(emit, &resolved.to_json()?)?;
        shell.status(Status::Info, format!("wrote {}", emit.display()));
    }

    shell.status(
        Status::Finished,
        format!("{} facts recorded", resolved.facts().count()),
    );
    Ok(())
}
