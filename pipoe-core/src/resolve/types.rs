use crate::PipoeError;
use crate::recipe::bb_name;
use crate::requirement::{Dependency, VersionConstraint};
use pipoe_version::{VersionPattern, compare};
use std::cmp::Ordering;

/// One edge of the dependency walk, or a root request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageRequest {
    pub name: String,
    pub constraint: VersionConstraint,
    /// Extra this request was reached through, shown in the trace.
    pub extra: Option<String>,
    /// Extras whose gated dependencies are followed for this package.
    pub enabled_extras: Vec<String>,
}

impl PackageRequest {
    pub fn root(name: &str, constraint: VersionConstraint, extras: Vec<String>) -> Self {
        PackageRequest {
            name: name.to_string(),
            constraint,
            extra: None,
            enabled_extras: extras,
        }
    }

    pub fn dependency(dep: &Dependency) -> Self {
        PackageRequest {
            name: dep.name.clone(),
            constraint: VersionConstraint::from_pin(dep.version.as_deref()),
            extra: dep.extra.clone(),
            enabled_extras: Vec::new(),
        }
    }

    /// `name[extra]==version` as printed in the dependency trace.
    pub fn label(&self) -> String {
        let mut label = self.name.clone();

        if let Some(extra) = &self.extra {
            label.push_str(&format!("[{}]", extra));
        }

        match &self.constraint {
            VersionConstraint::Exact(v) | VersionConstraint::Wildcard(v) => {
                label.push_str(&format!("=={}", v))
            }
            VersionConstraint::UpperBound(v) => label.push_str(&format!("<={}", v)),
            VersionConstraint::LowerBound(v) => label.push_str(&format!(">={}", v)),
            VersionConstraint::Any => {}
        }

        label
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub homepage: String,
    pub author: String,
    pub author_email: String,
    pub license: String,
    pub license_file: String,
    pub license_md5: String,
    pub src_dir: String,
    pub src_uri: String,
    pub src_md5: String,
    pub src_sha256: String,
    pub dependencies: Vec<Dependency>,
    pub build_dependencies: Vec<String>,
}

#[derive(Debug)]
pub struct ResolveFailure {
    pub name: String,
    pub depth: usize,
    pub error: PipoeError,
}

/// Terminal state of one request.
#[derive(Debug)]
pub enum RequestOutcome {
    Resolved { name: String, version: String },
    Skipped,
    Failed(ResolveFailure),
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub packages: Vec<ResolvedPackage>,
    pub failures: Vec<ResolveFailure>,
    /// `VersionConflict` warnings for requests skipped in favour of an older
    /// resolved version.
    pub conflicts: Vec<PipoeError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedEntry {
    pub name: String,
    pub version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessedCheck {
    Satisfied,
    /// Already present at an older version; the request is still dropped.
    Conflict { resolved: String },
}

/// Names already materialized in this run, plus any seeded packages. Names
/// compare in their recipe spelling, so `PySocks` and `pysocks` collide.
#[derive(Clone, Debug, Default)]
pub struct ProcessedSet {
    entries: Vec<ProcessedEntry>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, name: &str, version: Option<&str>) {
        self.entries.push(ProcessedEntry {
            name: bb_name(name),
            version: version.map(|v| v.to_string()),
        });
    }

    pub fn insert(&mut self, package: &ResolvedPackage) {
        self.seed(&package.name, Some(&package.version));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` when the name has not been seen. A request without a concrete
    /// version is satisfied by any entry of the same name.
    pub fn check(&self, name: &str, constraint: &VersionConstraint) -> Option<ProcessedCheck> {
        let name = bb_name(name);
        let mut conflict = None;

        for entry in self.entries.iter().filter(|e| e.name == name) {
            let (Some(requested), Some(resolved)) = (constraint.requested(), entry.version.as_deref())
            else {
                return Some(ProcessedCheck::Satisfied);
            };

            if let VersionConstraint::Wildcard(pattern) = constraint
                && VersionPattern::parse(pattern).matches(resolved)
            {
                return Some(ProcessedCheck::Satisfied);
            }

            if compare(requested, resolved) != Ordering::Greater {
                return Some(ProcessedCheck::Satisfied);
            }

            conflict.get_or_insert(ProcessedCheck::Conflict {
                resolved: resolved.to_string(),
            });
        }

        conflict
    }
}
