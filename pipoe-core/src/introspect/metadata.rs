use super::archive::{self, ArchiveFormat};
use crate::{PipoeError, Result};
use std::path::{Component, Path};

const REQUIRES_DIST: &str = "Requires-Dist";

fn format_for(file_name: &str) -> Result<ArchiveFormat> {
    if file_name.ends_with(".whl") || file_name.ends_with(".egg") {
        return Ok(ArchiveFormat::Zip);
    }

    ArchiveFormat::from_uri(file_name).map_err(|_| PipoeError::UnsupportedFormat {
        uri: format!("{} (package introspection)", file_name),
    })
}

fn is_metadata_file(path: &Path) -> bool {
    let parts: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    match parts.as_slice() {
        [dir, "METADATA"] => dir.ends_with(".dist-info"),
        ["PKG-INFO"] | [_, "PKG-INFO"] => true,
        _ => false,
    }
}

/// `Requires-Dist` values of an RFC 822 style metadata document.
pub fn parse_requires_dist(text: &str) -> Vec<String> {
    let mut requires = Vec::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if line.is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            if let Some(value) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        requires.extend(current.take());

        if let Some((key, value)) = line.split_once(':')
            && key.trim().eq_ignore_ascii_case(REQUIRES_DIST)
        {
            current = Some(value.trim().to_string());
        }
    }

    requires.extend(current);
    requires.retain(|r| !r.is_empty());
    requires
}

/// Dependency specifiers embedded in a downloaded source archive, wheel or egg.
pub fn requires_from_artifact(file_name: &str, data: &[u8]) -> Result<Vec<String>> {
    let format = format_for(file_name)?;

    match archive::read_member(format, file_name, data, is_metadata_file)? {
        Some(text) => Ok(parse_requires_dist(&text)),
        None => {
            tracing::debug!("no embedded metadata found in {}", file_name);
            Ok(Vec::new())
        }
    }
}
