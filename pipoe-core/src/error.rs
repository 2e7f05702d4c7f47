use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipoeError {
    #[error("Failed to read file {path:?}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },

    #[error("HTTP request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Extension not supported: {uri}")]
    UnsupportedFormat { uri: String },

    #[error("No sdist package can be found for {name}=={version}")]
    NoSourceArtifact { name: String, version: String },

    #[error("No release of {name} matches version pattern {pattern}")]
    VersionNotFound { name: String, pattern: String },

    #[error("Failed to translate license: {declared}")]
    UnresolvedLicense { declared: String },

    #[error("Package {name} version needed {requested} found {resolved}")]
    VersionConflict {
        name: String,
        requested: String,
        resolved: String,
    },

    #[error("Failed to unpack archive {path:?}: {source}")]
    Archive { path: PathBuf, source: std::io::Error },

    #[error("Failed to read zip archive {path:?}: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("Archive {path:?} has no top-level source directory")]
    MissingSourceDir { path: PathBuf },

    #[error("No license file found for {name}=={version}")]
    LicenseFileMissing { name: String, version: String },

    #[error("{algorithm} mismatch for {uri}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        uri: String,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Invalid license map {path:?}: {source}")]
    LicenseMap {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to read license mapping: {source}")]
    Prompt { source: std::io::Error },

    #[error("Invalid requirement {value:?}: {reason}")]
    InvalidRequirement { value: String, reason: String },

    #[error("Invalid search pattern {pattern}: {source}")]
    Glob {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("No packages provided!")]
    NoPackages,
}
