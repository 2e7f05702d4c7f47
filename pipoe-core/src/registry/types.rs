use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata document served by `{registry}/{name}/json` and
/// `{registry}/{name}/{version}/json`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RegistryPackage {
    pub info: RegistryInfo,
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<ReleaseFile>>,
    #[serde(default)]
    pub urls: Vec<ReleaseFile>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RegistryInfo {
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub home_page: Option<String>,
    #[serde(default)]
    pub project_urls: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub classifiers: Vec<String>,
    #[serde(default)]
    pub requires_dist: Option<Vec<String>>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RegistryInfo {
    pub fn homepage(&self) -> Option<&str> {
        if let Some(home) = self.home_page.as_deref()
            && !home.trim().is_empty()
        {
            return Some(home);
        }

        let urls = self.project_urls.as_ref()?;
        ["Homepage", "homepage", "Home", "home"]
            .iter()
            .find_map(|key| urls.get(*key))
            .map(|s| s.as_str())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReleaseFile {
    pub url: String,
    #[serde(default)]
    pub packagetype: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub digests: Option<Digests>,
}

impl ReleaseFile {
    pub fn is_sdist(&self) -> bool {
        self.packagetype == "sdist"
    }

    pub fn file_name(&self) -> &str {
        match self.filename.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.url.rsplit('/').next().unwrap_or(&self.url),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Digests {
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_registry_document() {
        let json = r#"{
            "info": {
                "version": "2.25.1",
                "summary": "Python HTTP for Humans.",
                "home_page": "https://requests.readthedocs.io",
                "author": "Kenneth Reitz",
                "author_email": "me@kennethreitz.org",
                "license": "Apache 2.0",
                "classifiers": ["License :: OSI Approved :: Apache Software License"],
                "requires_dist": ["idna (<3,>=2.5)"]
            },
            "urls": [
                {"url": "https://files/requests-2.25.1.tar.gz", "packagetype": "sdist", "size": 102161,
                 "digests": {"md5": "abc", "sha256": "def"}}
            ]
        }"#;

        let package: RegistryPackage = serde_json::from_str(json).unwrap();
        assert_eq!(package.info.version, "2.25.1");
        assert!(package.releases.is_empty());
        assert_eq!(package.urls.len(), 1);
        assert!(package.urls[0].is_sdist());
        assert_eq!(package.urls[0].file_name(), "requests-2.25.1.tar.gz");
        assert_eq!(
            package.urls[0].digests.as_ref().and_then(|d| d.md5.as_deref()),
            Some("abc")
        );
    }

    #[test]
    fn homepage_falls_back_to_project_urls() {
        let mut info = RegistryInfo {
            home_page: Some(" ".to_string()),
            ..RegistryInfo::default()
        };
        let mut urls = BTreeMap::new();
        urls.insert("Homepage".to_string(), "https://example.org".to_string());
        info.project_urls = Some(urls);

        assert_eq!(info.homepage(), Some("https://example.org"));
    }
}
