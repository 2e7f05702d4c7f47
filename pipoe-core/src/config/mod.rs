use std::env;
use std::fmt;
use std::path::PathBuf;

pub mod rc;
pub use self::rc::*;

pub const DEFAULT_REGISTRY: &str = "https://pypi.org/pypi";

/// Interpreter tag used as the recipe name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PythonTag {
    Python,
    #[default]
    Python3,
}

impl PythonTag {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "python" | "python2" => Some(PythonTag::Python),
            "python3" => Some(PythonTag::Python3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PythonTag::Python => "python",
            PythonTag::Python3 => "python3",
        }
    }

    /// Build class suffix, `setuptools3` for python3 recipes.
    pub fn setuptools_suffix(&self) -> &'static str {
        match self {
            PythonTag::Python => "",
            PythonTag::Python3 => "3",
        }
    }
}

impl fmt::Display for PythonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PipoeConfig {
    pub registry: String,
    pub python: PythonTag,
    pub default_license: Option<String>,
    pub scratch_dir: Option<PathBuf>,
    pub license_map: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for PipoeConfig {
    fn default() -> Self {
        PipoeConfig {
            registry: DEFAULT_REGISTRY.to_string(),
            python: PythonTag::default(),
            default_license: None,
            scratch_dir: None,
            license_map: None,
            verbose: false,
        }
    }
}

impl PipoeConfig {
    pub fn from_env() -> Self {
        let mut config = PipoeConfig::default();

        let settings = read_rc_settings();
        config.apply(settings);

        if let Some(value) = env_value("PIPOE_REGISTRY") {
            config.registry = normalize_registry_url(&value);
        }

        if let Some(value) = env_value("PIPOE_PYTHON")
            && let Some(tag) = PythonTag::from_str(&value)
        {
            config.python = tag;
        }

        if let Some(value) = env_value("PIPOE_DEFAULT_LICENSE") {
            config.default_license = Some(value);
        }

        if let Some(value) = env_value("PIPOE_SCRATCH_DIR") {
            config.scratch_dir = Some(PathBuf::from(value));
        }

        if let Some(value) = env_value("PIPOE_LICENSE_MAP") {
            config.license_map = Some(PathBuf::from(value));
        }

        config.verbose = match env::var("PIPOE_VERBOSE") {
            Ok(value) => {
                let v = value.trim().to_ascii_lowercase();
                matches!(v.as_str(), "1" | "true" | "yes" | "y" | "on")
            }
            Err(_) => false,
        };

        config
    }

    fn apply(&mut self, settings: RcSettings) {
        if let Some(registry) = settings.registry {
            self.registry = registry;
        }

        if let Some(python) = settings.python {
            self.python = python;
        }

        if settings.default_license.is_some() {
            self.default_license = settings.default_license;
        }

        if settings.scratch_dir.is_some() {
            self.scratch_dir = settings.scratch_dir;
        }

        if settings.license_map.is_some() {
            self.license_map = settings.license_map;
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
