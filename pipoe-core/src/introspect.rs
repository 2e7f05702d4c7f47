use crate::registry::{Digests, Registry};
use crate::{PipoeError, Result, console};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod archive;
pub mod descriptor;
pub mod metadata;

pub use archive::ArchiveFormat;

/// Everything learned from a package's source artifact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtifactFacts {
    pub md5: String,
    pub sha256: String,
    pub src_dir: String,
    pub license_file: String,
    pub license_md5: String,
    pub build_dependencies: Vec<String>,
}

pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub struct Introspector<'a> {
    registry: &'a dyn Registry,
    scratch_root: Option<PathBuf>,
}

impl<'a> Introspector<'a> {
    pub fn new(registry: &'a dyn Registry, scratch_root: Option<PathBuf>) -> Self {
        Introspector {
            registry,
            scratch_root,
        }
    }

    fn scratch(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pipoe-");

        let result = match &self.scratch_root {
            Some(root) => {
                fs::create_dir_all(root).map_err(|source| PipoeError::WriteFile {
                    path: root.clone(),
                    source,
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };

        result.map_err(|source| PipoeError::WriteFile {
            path: self.scratch_root.clone().unwrap_or_else(std::env::temp_dir),
            source,
        })
    }

    /// Downloads, unpacks and inspects one source artifact. Scratch space is
    /// owned by this call and removed on every return path.
    pub async fn introspect(
        &self,
        name: &str,
        version: &str,
        uri: &str,
        expected: Option<&Digests>,
    ) -> Result<ArtifactFacts> {
        let format = ArchiveFormat::from_uri(uri)?;
        let data = self.registry.download(uri).await?;

        let scratch = self.scratch()?;
        let facts = inspect_archive(scratch.path(), name, version, format, &data)?;
        verify_digests(uri, expected, &facts)?;

        Ok(facts)
    }

    /// `Requires-Dist` entries embedded in an arbitrary release file.
    pub async fn embedded_requires(&self, file_name: &str, uri: &str) -> Result<Vec<String>> {
        let data = self.registry.download(uri).await?;
        metadata::requires_from_artifact(file_name, &data)
    }
}

/// Writes `data` as `{name}_{version}.{ext}` under `scratch`, unpacks it next
/// to itself and collects checksums, layout and build dependencies.
pub fn inspect_archive(
    scratch: &Path,
    name: &str,
    version: &str,
    format: ArchiveFormat,
    data: &[u8],
) -> Result<ArtifactFacts> {
    let output = scratch.join(format!("{}_{}.{}", name, version, format.extension()));
    if output.exists() {
        remove_file(&output)?;
    }
    fs::write(&output, data).map_err(|source| PipoeError::WriteFile {
        path: output.clone(),
        source,
    })?;

    let unpacked = scratch.join(format!("{}_{}.{}.d", name, version, format.extension()));
    if unpacked.exists() {
        remove_dir(&unpacked)?;
    }
    fs::create_dir_all(&unpacked).map_err(|source| PipoeError::WriteFile {
        path: unpacked.clone(),
        source,
    })?;

    archive::unpack(format, &output, &unpacked)?;

    let src_dir = archive::top_level_dir(&unpacked)?;
    let src_path = unpacked.join(&src_dir);

    let license_file = find_license_file(&src_path)?
        .or_else(|| descriptor_fallback(&src_path))
        .ok_or_else(|| PipoeError::LicenseFileMissing {
            name: name.to_string(),
            version: version.to_string(),
        })?;

    let license_path = src_path.join(&license_file);
    let license_bytes = fs::read(&license_path).map_err(|source| PipoeError::ReadFile {
        path: license_path.clone(),
        source,
    })?;

    let build_dependencies = descriptor::build_dependencies(&src_path)?;

    let facts = ArtifactFacts {
        md5: md5_hex(data),
        sha256: sha256_hex(data),
        src_dir,
        license_file,
        license_md5: md5_hex(&license_bytes),
        build_dependencies,
    };

    remove_file(&output)?;
    remove_dir(&unpacked)?;

    console::verbose(&format!(
        "introspected {}=={}: src_dir={} license_file={} build_deps={}",
        name,
        version,
        facts.src_dir,
        facts.license_file,
        facts.build_dependencies.len()
    ));

    Ok(facts)
}

/// First non-directory entry, by name, whose lowercased name mentions a license.
pub fn find_license_file(src: &Path) -> Result<Option<String>> {
    let entries = fs::read_dir(src).map_err(|source| PipoeError::ReadFile {
        path: src.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
        .filter(|name| {
            let lower = name.to_lowercase();
            lower.contains("license") || lower.contains("copying")
        })
        .collect();
    candidates.sort();

    Ok(candidates.into_iter().next())
}

fn descriptor_fallback(src: &Path) -> Option<String> {
    [descriptor::SETUP_PY, descriptor::PYPROJECT_TOML]
        .into_iter()
        .find(|file| src.join(file).is_file())
        .map(|file| file.to_string())
}

fn verify_digests(uri: &str, expected: Option<&Digests>, facts: &ArtifactFacts) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let checks = [
        ("md5", expected.md5.as_deref(), &facts.md5),
        ("sha256", expected.sha256.as_deref(), &facts.sha256),
    ];

    for (algorithm, wanted, actual) in checks {
        if let Some(wanted) = wanted
            && !wanted.is_empty()
            && !wanted.eq_ignore_ascii_case(actual)
        {
            return Err(PipoeError::ChecksumMismatch {
                uri: uri.to_string(),
                algorithm,
                expected: wanted.to_string(),
                actual: actual.clone(),
            });
        }
    }

    Ok(())
}

fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|source| PipoeError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_dir(path: &Path) -> Result<()> {
    fs::remove_dir_all(path).map_err(|source| PipoeError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}
