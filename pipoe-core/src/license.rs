use crate::{PipoeError, Result, console};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const BUILTIN_TABLE: &str = include_str!("license/licenses.yaml");

/// Classifiers starting with this token describe a license.
pub const CLASSIFIER_PREFIX: &str = "License";

/// Exact-match table from declared license text or classifier to a canonical id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseMap {
    entries: BTreeMap<String, String>,
}

impl LicenseMap {
    pub fn builtin() -> Self {
        Self::from_yaml(BUILTIN_TABLE).unwrap_or_default()
    }

    pub fn from_yaml(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let entries: BTreeMap<String, String> = serde_yaml::from_str(text)?;
        Ok(LicenseMap { entries })
    }

    /// Built-in table with the entries of a previously dumped table on top.
    pub fn load(path: &Path) -> Result<Self> {
        let mut map = Self::builtin();
        map.merge_file(path)?;
        Ok(map)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|source| PipoeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let other = Self::from_yaml(&text).map_err(|source| PipoeError::LicenseMap {
            path: path.to_path_buf(),
            source,
        })?;

        console::verbose(&format!(
            "loaded {} license mappings from {}",
            other.len(),
            path.display()
        ));
        self.entries.extend(other.entries);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.entries)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.to_yaml().map_err(|source| PipoeError::LicenseMap {
            path: path.to_path_buf(),
            source,
        })?;

        fs::write(path, text).map_err(|source| PipoeError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Declared text with surrounding quotes and whitespace removed, or the raw
/// text when nothing else is left.
fn declared_key(declared: &str) -> &str {
    let key = declared.trim_matches(|c: char| c == '\'' || c == '"' || c.is_whitespace());
    if key.is_empty() { declared } else { key }
}

/// Supplies a canonical id for license text the table does not know.
pub trait LicensePrompt: Send + Sync {
    fn ask(&self, declared: &str) -> std::io::Result<String>;
}

/// Answers every unknown license with the same id.
pub struct FixedLicense(pub String);

impl LicensePrompt for FixedLicense {
    fn ask(&self, _declared: &str) -> std::io::Result<String> {
        Ok(self.0.clone())
    }
}

pub struct LicenseNormalizer {
    map: LicenseMap,
    default_license: Option<String>,
    prompt: Box<dyn LicensePrompt>,
}

impl LicenseNormalizer {
    pub fn new(
        map: LicenseMap,
        default_license: Option<String>,
        prompt: Box<dyn LicensePrompt>,
    ) -> Self {
        LicenseNormalizer {
            map,
            default_license,
            prompt,
        }
    }

    pub fn map(&self) -> &LicenseMap {
        &self.map
    }

    /// Table lookup without the interactive fallback.
    pub fn lookup(&self, declared: Option<&str>, classifiers: &[String]) -> Result<String> {
        if let Some(declared) = declared
            && !declared.is_empty()
        {
            if let Some(id) = self
                .map
                .get(declared)
                .or_else(|| self.map.get(declared_key(declared)))
            {
                return Ok(id.to_string());
            }
        }

        for classifier in classifiers
            .iter()
            .filter(|c| c.starts_with(CLASSIFIER_PREFIX))
        {
            if let Some(id) = self.map.get(classifier) {
                return Ok(id.to_string());
            }
        }

        if let Some(default) = &self.default_license {
            return Ok(default.clone());
        }

        Err(PipoeError::UnresolvedLicense {
            declared: declared.unwrap_or_default().to_string(),
        })
    }

    /// Maps a declared license to a canonical id, asking the prompt on a total
    /// miss and remembering the answer under the trimmed declared text.
    pub fn normalize(&mut self, declared: Option<&str>, classifiers: &[String]) -> Result<String> {
        match self.lookup(declared, classifiers) {
            Err(PipoeError::UnresolvedLicense { declared }) => {
                console::verbose(&format!("no license mapping for {:?}", declared));
                let answer = self
                    .prompt
                    .ask(&declared)
                    .map_err(|source| PipoeError::Prompt { source })?;
                let answer = answer.trim().to_string();
                self.map.insert(declared_key(&declared), answer.clone());
                Ok(answer)
            }
            other => other,
        }
    }
}
