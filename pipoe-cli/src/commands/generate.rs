use crate::cli::Cli;
use anyhow::Result;
use pipoe_core::license::LicensePrompt;
use pipoe_core::operations::{self, GenerateOptions};
use pipoe_core::{PipoeConfig, PypiRegistry, console};
use std::io::{self, BufRead, Write};

/// Asks on the terminal for licenses the table cannot map.
struct StdinPrompt;

impl LicensePrompt for StdinPrompt {
    fn ask(&self, declared: &str) -> io::Result<String> {
        tokio::task::block_in_place(|| read_license(declared))
    }
}

fn read_license(declared: &str) -> io::Result<String> {
    println!("Failed to translate license: {}", declared);
    print!("Please enter a valid license name: ");
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no license name given",
        ));
    }

    Ok(input.trim().to_string())
}

pub async fn run(args: &Cli, config: &PipoeConfig) -> Result<()> {
    console::header("generate", env!("CARGO_PKG_VERSION"));

    let registry = PypiRegistry::new(config);
    let options = GenerateOptions {
        package: args.package.clone(),
        version: args.version.clone(),
        requirements: args.requirements.clone(),
        follow_extras: args.extras,
        outdir: args.outdir.clone(),
        use_pypi: args.pypi,
        dump_licenses: args.licenses,
        existing_packages: args.existing_packages.clone(),
        write_preferred: !args.no_preferred,
    };

    let report = operations::generate(config, &registry, Box::new(StdinPrompt), &options).await?;

    console::summary(
        report.recipes.len(),
        report.failures.len(),
        console::elapsed_secs(),
    );

    Ok(())
}
