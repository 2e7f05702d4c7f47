use anyhow::Result;
use pipoe_core::{PipoeConfig, console, operations};
use std::path::Path;

pub fn run(layers_dir: &Path, output: &Path, config: &PipoeConfig) -> Result<()> {
    console::header("scan", env!("CARGO_PKG_VERSION"));

    let report = operations::scan(layers_dir, output, config.python)?;
    console::verbose(&format!(
        "{} recipes listed, {} skipped",
        report.packages.len(),
        report.unparsed.len()
    ));

    Ok(())
}
