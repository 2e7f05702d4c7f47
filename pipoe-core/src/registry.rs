use crate::{PipoeConfig, PipoeError, Result, console};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use std::time::Instant;

pub mod types;
pub use types::*;

/// Read-only view of a package index.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Metadata for the latest release plus every release's files.
    async fn project(&self, name: &str) -> Result<RegistryPackage>;

    /// Metadata for one concrete release.
    async fn release(&self, name: &str, version: &str) -> Result<RegistryPackage>;

    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct PypiRegistry {
    client: Client,
    base: String,
}

impl PypiRegistry {
    pub fn new(config: &PipoeConfig) -> Self {
        PypiRegistry {
            client: Client::new(),
            base: config.registry.trim_end_matches('/').to_string(),
        }
    }

    pub fn project_url(&self, name: &str) -> String {
        format!("{}/{}/json", self.base, urlencoding::encode(name))
    }

    pub fn release_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/{}/{}/json",
            self.base,
            urlencoding::encode(name),
            urlencoding::encode(version)
        )
    }

    async fn fetch_json(&self, name: &str, url: String) -> Result<RegistryPackage> {
        console::verbose(&format!("registry request: name={} url={}", name, url));
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|source| PipoeError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        console::verbose(&format!(
            "registry response: name={} status={} in {:.3}s",
            name,
            status.as_u16(),
            started.elapsed().as_secs_f64()
        ));

        let package = response
            .error_for_status()
            .map_err(|source| PipoeError::Http {
                url: url.clone(),
                source,
            })?
            .json::<RegistryPackage>()
            .await
            .map_err(|source| PipoeError::Http {
                url: url.clone(),
                source,
            })?;

        console::verbose(&format!(
            "registry decode: name={} version={} releases={} urls={}",
            name,
            package.info.version,
            package.releases.len(),
            package.urls.len()
        ));

        Ok(package)
    }
}

#[async_trait]
impl Registry for PypiRegistry {
    async fn project(&self, name: &str) -> Result<RegistryPackage> {
        let url = self.project_url(name);
        self.fetch_json(name, url).await
    }

    async fn release(&self, name: &str, version: &str) -> Result<RegistryPackage> {
        let url = self.release_url(name, version);
        self.fetch_json(name, url).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| PipoeError::Http {
                url: url.to_string(),
                source,
            })?;

        let bytes = response
            .error_for_status()
            .map_err(|source| PipoeError::Http {
                url: url.to_string(),
                source,
            })?
            .bytes()
            .await
            .map_err(|source| PipoeError::Http {
                url: url.to_string(),
                source,
            })?;

        console::verbose(&format!(
            "downloaded {} ({} bytes) in {:.3}s",
            url,
            bytes.len(),
            started.elapsed().as_secs_f64()
        ));

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_metadata_urls() {
        let config = PipoeConfig {
            registry: "https://pypi.example/pypi/".to_string(),
            ..PipoeConfig::default()
        };
        let registry = PypiRegistry::new(&config);

        assert_eq!(
            registry.project_url("requests"),
            "https://pypi.example/pypi/requests/json"
        );
        assert_eq!(
            registry.release_url("zope.interface", "5.4.0"),
            "https://pypi.example/pypi/zope.interface/5.4.0/json"
        );
    }
}
