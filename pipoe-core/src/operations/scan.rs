use crate::config::PythonTag;
use crate::existing::{ScanReport, write_existing_packages};
use crate::{Result, console};
use std::path::Path;

/// Writes the `name==version` list of recipes already present in a layer tree.
pub fn scan(layers_dir: &Path, output: &Path, python: PythonTag) -> Result<ScanReport> {
    let report = write_existing_packages(layers_dir, output, python)?;

    console::info(&format!(
        "Existing packages are available in: {}",
        output.display()
    ));

    Ok(report)
}
