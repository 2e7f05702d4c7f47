use crate::existing::read_existing_packages;
use crate::license::{LicenseMap, LicenseNormalizer, LicensePrompt};
use crate::recipe::{self, RecipeOptions};
use crate::registry::Registry;
use crate::requirement::{Requirement, VersionConstraint, read_requirements};
use crate::resolve::{
    PackageRequest, ProcessedSet, ResolveFailure, ResolveOptions, ResolvedPackage, Resolver,
};
use crate::{PipoeConfig, PipoeError, Result, console};
use std::path::PathBuf;

pub const LICENSE_DUMP: &str = "licenses.yaml";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub package: Option<String>,
    pub version: Option<String>,
    pub requirements: Option<PathBuf>,
    pub follow_extras: bool,
    pub outdir: PathBuf,
    pub use_pypi: bool,
    pub dump_licenses: bool,
    pub existing_packages: Option<PathBuf>,
    pub write_preferred: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            package: None,
            version: None,
            requirements: None,
            follow_extras: false,
            outdir: PathBuf::from("./"),
            use_pypi: false,
            dump_licenses: false,
            existing_packages: None,
            write_preferred: true,
        }
    }
}

#[derive(Debug)]
pub struct GenerateReport {
    pub packages: Vec<ResolvedPackage>,
    pub failures: Vec<ResolveFailure>,
    pub conflicts: Vec<PipoeError>,
    pub recipes: Vec<PathBuf>,
    pub license_dump: Option<PathBuf>,
    pub preferred_versions: Option<PathBuf>,
}

fn root_requests(options: &GenerateOptions) -> Result<Vec<PackageRequest>> {
    if let Some(path) = &options.requirements {
        let roots = read_requirements(path)?
            .into_iter()
            .map(|root| PackageRequest::root(&root.name, root.constraint, root.extras))
            .collect();
        return Ok(roots);
    }

    let Some(package) = options.package.as_deref() else {
        return Err(PipoeError::NoPackages);
    };

    let requirement = Requirement::parse(package)?;
    let constraint = match options.version.as_deref() {
        Some(version) => VersionConstraint::from_pin(Some(version)),
        None => requirement.root_constraint(),
    };

    Ok(vec![PackageRequest::root(
        &requirement.name,
        constraint,
        requirement.extras,
    )])
}

/// Resolves the requested packages and writes their recipes into `outdir`.
pub async fn generate(
    config: &PipoeConfig,
    registry: &dyn Registry,
    prompt: Box<dyn LicensePrompt>,
    options: &GenerateOptions,
) -> Result<GenerateReport> {
    let roots = root_requests(options)?;

    let map = match &config.license_map {
        Some(path) => LicenseMap::load(path)?,
        None => LicenseMap::builtin(),
    };
    let licenses = LicenseNormalizer::new(map, config.default_license.clone(), prompt);

    let processed = match &options.existing_packages {
        Some(path) => read_existing_packages(path)?,
        None => ProcessedSet::new(),
    };

    let resolve_options = ResolveOptions {
        follow_extras: options.follow_extras,
    };

    console::step("Gathering info:");
    let mut resolver = Resolver::new(registry, licenses, resolve_options, config.scratch_dir.clone())
        .with_processed(processed);
    let resolution = resolver.resolve(roots).await;

    if !resolution.conflicts.is_empty() {
        console::warn(&format!(
            "{} requests asked for a newer version than the one already resolved",
            resolution.conflicts.len()
        ));
    }

    console::step_with_count("Generating recipes", resolution.packages.len());
    let recipe_options = RecipeOptions {
        python: config.python,
        use_pypi: options.use_pypi,
    };
    let recipes = recipe::write_recipes(&resolution.packages, &options.outdir, recipe_options)?;

    console::info("");

    let license_dump = if options.dump_licenses {
        let path = options.outdir.join(LICENSE_DUMP);
        resolver.licenses().map().write(&path)?;
        console::info(&format!(
            "License mappings are available in: {}",
            path.display()
        ));
        Some(path)
    } else {
        None
    };

    let preferred_versions = if options.write_preferred {
        let path =
            recipe::write_preferred_versions(&resolution.packages, &options.outdir, config.python)?;
        console::info(&format!(
            "PREFERRED_VERSIONS are available in: {}",
            path.display()
        ));
        Some(path)
    } else {
        None
    };

    Ok(GenerateReport {
        packages: resolution.packages,
        failures: resolution.failures,
        conflicts: resolution.conflicts,
        recipes,
        license_dump,
        preferred_versions,
    })
}
