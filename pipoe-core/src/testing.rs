use crate::registry::{Digests, Registry, RegistryInfo, RegistryPackage, ReleaseFile};
use crate::{PipoeError, Result};
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub fn tar_gz(files: &[(String, String)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, body.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// One published release of a fake project.
pub struct FakeRelease {
    pub name: String,
    pub version: String,
    pub license: Option<String>,
    pub requires: Option<Vec<String>>,
    /// Publish only a wheel, no source distribution.
    pub wheel_only: bool,
    /// `Requires-Dist` lines embedded in the archive's PKG-INFO.
    pub embedded_requires: Vec<String>,
}

impl FakeRelease {
    pub fn new(name: &str, version: &str, requires: &[&str]) -> Self {
        FakeRelease {
            name: name.to_string(),
            version: version.to_string(),
            license: Some("MIT".to_string()),
            requires: Some(requires.iter().map(|r| r.to_string()).collect()),
            wheel_only: false,
            embedded_requires: Vec::new(),
        }
    }
}

/// In-memory registry serving metadata and gzip tarballs.
#[derive(Default)]
pub struct FakeRegistry {
    projects: BTreeMap<String, (String, BTreeMap<String, RegistryPackage>)>,
    files: BTreeMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, release: FakeRelease) -> Self {
        self.publish(release);
        self
    }

    /// Publishes a release; the last one published becomes the latest.
    pub fn publish(&mut self, release: FakeRelease) {
        let stem = format!("{}-{}", release.name, release.version);
        let mut pkg_info = format!(
            "Metadata-Version: 2.1\nName: {}\nVersion: {}\n",
            release.name, release.version
        );
        for req in &release.embedded_requires {
            pkg_info.push_str(&format!("Requires-Dist: {}\n", req));
        }

        let data = tar_gz(&[
            (format!("{}/LICENSE", stem), format!("{} license", release.name)),
            (format!("{}/PKG-INFO", stem), pkg_info),
            (
                format!("{}/setup.py", stem),
                "setup(\n    setup_requires=['wheel'],\n)\n".to_string(),
            ),
        ]);

        let file = if release.wheel_only {
            ReleaseFile {
                url: format!("https://files.example/{}-py3-none-any.whl", stem),
                packagetype: "bdist_wheel".to_string(),
                size: data.len() as u64,
                filename: None,
                digests: None,
            }
        } else {
            ReleaseFile {
                url: format!("https://files.example/{}.tar.gz", stem),
                packagetype: "sdist".to_string(),
                size: data.len() as u64,
                filename: None,
                digests: Some(Digests {
                    md5: Some(crate::introspect::md5_hex(&data)),
                    sha256: Some(crate::introspect::sha256_hex(&data)),
                }),
            }
        };
        self.files.insert(file.url.clone(), data);

        let info = RegistryInfo {
            version: release.version.clone(),
            summary: Some(format!("The {} package", release.name)),
            home_page: Some(format!("https://{}.example.org", release.name)),
            author: Some("Jane Doe".to_string()),
            author_email: Some("jane@example.org".to_string()),
            license: release.license.clone(),
            requires_dist: release.requires.clone(),
            ..RegistryInfo::default()
        };

        let entry = self
            .projects
            .entry(release.name.clone())
            .or_insert_with(|| (String::new(), BTreeMap::new()));
        entry.0 = release.version.clone();
        entry.1.insert(
            release.version.clone(),
            RegistryPackage {
                info,
                releases: BTreeMap::new(),
                urls: vec![file],
            },
        );
    }

    fn document(&self, name: &str, version: &str) -> Result<RegistryPackage> {
        let (_, versions) = self.projects.get(name).ok_or_else(|| not_found(name, version))?;
        let mut package = versions
            .get(version)
            .cloned()
            .ok_or_else(|| not_found(name, version))?;

        package.releases = versions
            .iter()
            .map(|(v, p)| (v.clone(), p.urls.clone()))
            .collect();
        Ok(package)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn not_found(name: &str, version: &str) -> PipoeError {
    PipoeError::VersionNotFound {
        name: name.to_string(),
        pattern: version.to_string(),
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn project(&self, name: &str) -> Result<RegistryPackage> {
        self.requests.lock().unwrap().push(format!("project {}", name));
        let latest = self
            .projects
            .get(name)
            .map(|(latest, _)| latest.clone())
            .ok_or_else(|| not_found(name, "latest"))?;
        self.document(name, &latest)
    }

    async fn release(&self, name: &str, version: &str) -> Result<RegistryPackage> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("release {}=={}", name, version));
        self.document(name, version)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(format!("download {}", url));
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| not_found(url, "download"))
    }
}
