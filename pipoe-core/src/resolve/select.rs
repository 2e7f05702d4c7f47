use crate::introspect::ArchiveFormat;
use crate::registry::{RegistryPackage, ReleaseFile};

/// Sort key preferring source tarballs over zip archives over anything else,
/// smallest first within a kind.
pub fn artifact_rank(file: &ReleaseFile) -> (u8, u64) {
    let kind = match ArchiveFormat::from_uri(&file.url) {
        Ok(ArchiveFormat::Zip) => 1,
        Ok(_) => 0,
        Err(_) => 2,
    };
    (kind, file.size)
}

/// Files published for `version`, falling back to the `urls` list that the
/// per-version document carries.
pub fn release_files<'a>(package: &'a RegistryPackage, version: &str) -> &'a [ReleaseFile] {
    match package.releases.get(version) {
        Some(files) if !files.is_empty() => files,
        _ => &package.urls,
    }
}

fn info_url(package: &RegistryPackage) -> Option<ReleaseFile> {
    package
        .info
        .url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .map(|url| ReleaseFile {
            url: url.to_string(),
            packagetype: "sdist".to_string(),
            ..ReleaseFile::default()
        })
}

/// The source distribution to introspect, if the release has one.
pub fn source_artifact(package: &RegistryPackage, version: &str) -> Option<ReleaseFile> {
    release_files(package, version)
        .iter()
        .filter(|file| file.is_sdist())
        .min_by_key(|file| artifact_rank(file))
        .cloned()
        .or_else(|| info_url(package).filter(|file| ArchiveFormat::from_uri(&file.url).is_ok()))
}

/// Cheapest file to download when only embedded metadata is needed.
pub fn smallest_artifact(package: &RegistryPackage, version: &str) -> Option<ReleaseFile> {
    release_files(package, version)
        .iter()
        .min_by_key(|file| artifact_rank(file))
        .cloned()
        .or_else(|| info_url(package))
}
