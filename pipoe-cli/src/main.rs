use anyhow::Result;
use clap::Parser;
use pipoe_core::{PipoeConfig, PythonTag, console};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let config = load_config(&args);

    if let Err(err) = init_tracing(config.verbose) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console::error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli, config: PipoeConfig) -> Result<()> {
    tracing::debug!(
        python = config.python.as_str(),
        registry = %config.registry,
        "configuration loaded"
    );

    if let (Some(layers_dir), Some(existing)) = (&args.yocto_layers_dir, &args.existing_packages) {
        return commands::scan::run(layers_dir, existing, &config);
    }

    commands::generate::run(&args, &config).await
}

fn load_config(args: &Cli) -> PipoeConfig {
    apply_overrides(PipoeConfig::from_env(), args)
}

fn apply_overrides(mut config: PipoeConfig, args: &Cli) -> PipoeConfig {

    if let Some(python) = args.python.as_deref().and_then(PythonTag::from_str) {
        config.python = python;
    }
    if let Some(license) = &args.default_license {
        config.default_license = Some(license.clone());
    }
    if let Some(path) = &args.license_map {
        config.license_map = Some(path.clone());
    }
    config.verbose |= args.verbose;

    config
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}
