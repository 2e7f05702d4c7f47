use crate::introspect::Introspector;
use crate::license::LicenseNormalizer;
use crate::registry::{Registry, RegistryPackage};
use crate::requirement::{Dependency, VersionConstraint, parse_dependency};
use crate::{PipoeError, Result, console};
use async_recursion::async_recursion;
use pipoe_version::VersionPattern;
use std::path::PathBuf;

pub mod select;
pub mod types;

pub use types::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    /// Follow dependencies gated behind extras for every package.
    pub follow_extras: bool,
}

/// Depth-first resolver owning the run's processed set and license table.
pub struct Resolver<'a> {
    registry: &'a dyn Registry,
    introspector: Introspector<'a>,
    licenses: LicenseNormalizer,
    processed: ProcessedSet,
    options: ResolveOptions,
    resolution: Resolution,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a dyn Registry,
        licenses: LicenseNormalizer,
        options: ResolveOptions,
        scratch_root: Option<PathBuf>,
    ) -> Self {
        Resolver {
            registry,
            introspector: Introspector::new(registry, scratch_root),
            licenses,
            processed: ProcessedSet::new(),
            options,
            resolution: Resolution::default(),
        }
    }

    /// Starts from a pre-seeded set of packages that must not be resolved again.
    pub fn with_processed(mut self, processed: ProcessedSet) -> Self {
        self.processed = processed;
        self
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    pub fn licenses(&self) -> &LicenseNormalizer {
        &self.licenses
    }

    /// Resolves every root in order and returns the packages first resolved
    /// by this call, in pre-order, together with the failed requests.
    pub async fn resolve(&mut self, roots: Vec<PackageRequest>) -> Resolution {
        for root in roots {
            let outcome = self.request(root, 0).await;
            self.record(outcome);
        }

        std::mem::take(&mut self.resolution)
    }

    fn record(&mut self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Failed(failure) => self.resolution.failures.push(failure),
            RequestOutcome::Resolved { name, version } => {
                tracing::trace!("resolved {}=={}", name, version);
            }
            RequestOutcome::Skipped => {}
        }
    }

    #[async_recursion]
    async fn request(&mut self, req: PackageRequest, depth: usize) -> RequestOutcome {
        if let Some(check) = self.processed.check(&req.name, &req.constraint) {
            if let ProcessedCheck::Conflict { resolved } = check {
                let conflict = PipoeError::VersionConflict {
                    name: req.name.clone(),
                    requested: req.constraint.requested().unwrap_or_default().to_string(),
                    resolved,
                };
                tracing::warn!("{}", conflict);
                console::tree_warn(&conflict.to_string());
                self.resolution.conflicts.push(conflict);
            }
            tracing::trace!("skipping {}", req.label());
            return RequestOutcome::Skipped;
        }

        let label = req.label();
        console::tree(depth, &label);

        let package = match self.resolve_package(&req).await {
            Ok(package) => package,
            Err(error) => {
                console::tree_error(depth, &format!("Failed to gather {} ({})", label, error));
                return RequestOutcome::Failed(ResolveFailure {
                    name: req.name,
                    depth,
                    error,
                });
            }
        };

        let dependencies = package.dependencies.clone();
        let (name, version) = (package.name.clone(), package.version.clone());

        self.processed.insert(&package);
        self.resolution.packages.push(package);

        for dep in &dependencies {
            let outcome = self.request(PackageRequest::dependency(dep), depth + 1).await;
            self.record(outcome);
        }

        RequestOutcome::Resolved { name, version }
    }

    async fn concrete_version(&self, req: &PackageRequest) -> Result<Option<String>> {
        match &req.constraint {
            VersionConstraint::Exact(v) | VersionConstraint::UpperBound(v) => Ok(Some(v.clone())),
            VersionConstraint::Wildcard(pattern) => {
                let project = self.registry.project(&req.name).await?;
                let pattern = VersionPattern::parse(pattern);
                console::verbose(&format!("fuzzy version {} for {}", pattern, req.name));

                pattern
                    .select(project.releases.keys().map(|v| v.as_str()))
                    .map(|v| Some(v.to_string()))
                    .ok_or_else(|| PipoeError::VersionNotFound {
                        name: req.name.clone(),
                        pattern: pattern.original().to_string(),
                    })
            }
            VersionConstraint::LowerBound(_) | VersionConstraint::Any => Ok(None),
        }
    }

    async fn resolve_package(&mut self, req: &PackageRequest) -> Result<ResolvedPackage> {
        let pinned = self.concrete_version(req).await?;
        let metadata = match &pinned {
            Some(version) => self.registry.release(&req.name, version).await?,
            None => self.registry.project(&req.name).await?,
        };
        let version = pinned.unwrap_or_else(|| metadata.info.version.clone());
        let info = &metadata.info;

        let license = self
            .licenses
            .normalize(info.license.as_deref(), &info.classifiers)?;

        let artifact = select::source_artifact(&metadata, &version).ok_or_else(|| {
            PipoeError::NoSourceArtifact {
                name: req.name.clone(),
                version: version.clone(),
            }
        })?;

        let facts = self
            .introspector
            .introspect(&req.name, &version, &artifact.url, artifact.digests.as_ref())
            .await?;

        let requires = match &info.requires_dist {
            Some(requires) => requires.clone(),
            None => self.embedded_requires(&metadata, &version).await?,
        };

        Ok(ResolvedPackage {
            name: req.name.clone(),
            version,
            summary: info.summary.clone().unwrap_or_default(),
            homepage: info.homepage().unwrap_or_default().to_string(),
            author: info.author.clone().unwrap_or_default(),
            author_email: info.author_email.clone().unwrap_or_default(),
            license,
            license_file: facts.license_file,
            license_md5: facts.license_md5,
            src_dir: facts.src_dir,
            src_uri: artifact.url,
            src_md5: facts.md5,
            src_sha256: facts.sha256,
            dependencies: self.accepted_dependencies(req, &requires),
            build_dependencies: facts.build_dependencies,
        })
    }

    async fn embedded_requires(&self, metadata: &RegistryPackage, version: &str) -> Result<Vec<String>> {
        let Some(file) = select::smallest_artifact(metadata, version) else {
            return Ok(Vec::new());
        };

        console::verbose(&format!(
            "no requires_dist for {}, reading {}",
            version,
            file.file_name()
        ));
        self.introspector
            .embedded_requires(file.file_name(), &file.url)
            .await
    }

    fn accepted_dependencies(&self, req: &PackageRequest, requires: &[String]) -> Vec<Dependency> {
        let mut dependencies = Vec::new();

        for spec in requires {
            let dep = match parse_dependency(spec) {
                Ok(dep) => dep,
                Err(err) => {
                    console::tree_warn(&err.to_string());
                    continue;
                }
            };

            if let Some(extra) = dep.extra.as_deref()
                && !self.options.follow_extras
                && !req.enabled_extras.iter().any(|e| e == extra)
            {
                continue;
            }

            dependencies.push(dep);
        }

        dependencies
    }
}
