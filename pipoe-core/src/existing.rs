use crate::config::PythonTag;
use crate::resolve::ProcessedSet;
use crate::{PipoeError, Result, console};
use std::fs;
use std::path::{Path, PathBuf};

/// `(name, version)` from a recipe file name such as `python3-webob_1.8.7.bb`.
/// Versions without a dot are rejected.
pub fn parse_recipe_file_name(file_name: &str, python: PythonTag) -> Option<(String, String)> {
    let prefix = format!("{}-", python);
    let stem = file_name.strip_prefix(&prefix)?.strip_suffix(".bb")?;
    let (name, version) = stem.split_once('_')?;

    if name.is_empty() || !version.contains('.') {
        return None;
    }

    Some((name.to_string(), version.to_string()))
}

pub struct ScanReport {
    pub packages: Vec<(String, String)>,
    pub unparsed: Vec<PathBuf>,
}

/// Finds every `{python}-*.bb` below `layers_dir`.
pub fn scan_layers(layers_dir: &Path, python: PythonTag) -> Result<ScanReport> {
    let pattern = format!(
        "{}/**/{}-*.bb",
        glob::Pattern::escape(&layers_dir.to_string_lossy()),
        python
    );

    let paths = glob::glob(&pattern).map_err(|source| PipoeError::Glob {
        pattern: pattern.clone(),
        source,
    })?;

    let mut report = ScanReport {
        packages: Vec::new(),
        unparsed: Vec::new(),
    };

    let mut found: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
    found.sort();

    for path in found {
        let parsed = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| parse_recipe_file_name(name, python));

        match parsed {
            Some(package) => report.packages.push(package),
            None => report.unparsed.push(path),
        }
    }

    Ok(report)
}

/// Scans `layers_dir` and writes a `name==version` list to `output`.
pub fn write_existing_packages(
    layers_dir: &Path,
    output: &Path,
    python: PythonTag,
) -> Result<ScanReport> {
    console::info(&format!(
        "Gathering recipes in Yocto layers directory: {}",
        layers_dir.display()
    ));

    let report = scan_layers(layers_dir, python)?;

    for path in &report.unparsed {
        console::info(&format!("Could not parse: {}", path.display()));
    }

    let mut text = String::new();
    for (name, version) in &report.packages {
        text.push_str(&format!("{}=={}\n", name, version));
    }

    fs::write(output, text).map_err(|source| PipoeError::WriteFile {
        path: output.to_path_buf(),
        source,
    })?;

    Ok(report)
}

/// Seeds a processed set from `name==version` lines; a bare name is seeded
/// without a version.
pub fn parse_existing_packages(text: &str) -> ProcessedSet {
    let mut processed = ProcessedSet::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.split_once("==") {
            Some((name, version)) => processed.seed(name.trim(), Some(version.trim())),
            None => processed.seed(line, None),
        }
    }

    processed
}

pub fn read_existing_packages(path: &Path) -> Result<ProcessedSet> {
    let text = fs::read_to_string(path).map_err(|source| PipoeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let processed = parse_existing_packages(&text);
    console::verbose(&format!(
        "seeded {} existing packages from {}",
        processed.len(),
        path.display()
    ));
    Ok(processed)
}
