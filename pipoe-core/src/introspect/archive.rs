use crate::{PipoeError, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use xz2::read::XzDecoder;

/// Source archive layouts the introspector can unpack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    Tgz,
    TarBz2,
    TarXz,
    Zip,
}

const SUFFIXES: [(&str, ArchiveFormat); 6] = [
    (".tar.gz", ArchiveFormat::TarGz),
    (".tgz", ArchiveFormat::Tgz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tar.xz", ArchiveFormat::TarXz),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
];

impl ArchiveFormat {
    pub fn from_uri(uri: &str) -> Result<Self> {
        let path = strip_query(uri);

        SUFFIXES
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix))
            .map(|(_, format)| *format)
            .ok_or_else(|| PipoeError::UnsupportedFormat {
                uri: uri.to_string(),
            })
    }

    /// File extension without the leading dot, as used in recipe variables.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Tgz => "tgz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Zip => "zip",
        }
    }

    pub fn is_tarball(&self) -> bool {
        !matches!(self, ArchiveFormat::Zip)
    }
}

fn strip_query(uri: &str) -> &str {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    &uri[..end]
}

fn tar_decoder<'a, R: Read + 'a>(format: ArchiveFormat, reader: R) -> Box<dyn Read + 'a> {
    match format {
        ArchiveFormat::TarGz | ArchiveFormat::Tgz => Box::new(GzDecoder::new(reader)),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(reader)),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(reader)),
        ArchiveFormat::Tar | ArchiveFormat::Zip => Box::new(reader),
    }
}

/// Unpacks `archive` into the existing directory `dest`.
pub fn unpack(format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|source| PipoeError::ReadFile {
        path: archive.to_path_buf(),
        source,
    })?;

    if format.is_tarball() {
        let mut tar = Archive::new(tar_decoder(format, file));
        tar.unpack(dest).map_err(|source| PipoeError::Archive {
            path: archive.to_path_buf(),
            source,
        })?;
    } else {
        let mut zip = zip::ZipArchive::new(file).map_err(|source| PipoeError::Zip {
            path: archive.to_path_buf(),
            source,
        })?;
        zip.extract(dest).map_err(|source| PipoeError::Zip {
            path: archive.to_path_buf(),
            source,
        })?;
    }

    Ok(())
}

/// Reads the first member accepted by `wanted` without unpacking to disk.
pub fn read_member<F>(
    format: ArchiveFormat,
    name: &str,
    data: &[u8],
    wanted: F,
) -> Result<Option<String>>
where
    F: Fn(&Path) -> bool,
{
    let archive_path = PathBuf::from(name);
    let archive_err = |source| PipoeError::Archive {
        path: archive_path.clone(),
        source,
    };

    if format.is_tarball() {
        let mut tar = Archive::new(tar_decoder(format, Cursor::new(data)));

        for entry in tar.entries().map_err(archive_err)? {
            let mut entry = entry.map_err(archive_err)?;
            let path = entry.path().map_err(archive_err)?.into_owned();

            if wanted(&path) {
                return read_lossy(&mut entry).map(Some).map_err(archive_err);
            }
        }

        return Ok(None);
    }

    let zip_err = |source| PipoeError::Zip {
        path: archive_path.clone(),
        source,
    };
    let mut zip = zip::ZipArchive::new(Cursor::new(data)).map_err(zip_err)?;

    for idx in 0..zip.len() {
        let mut file = zip.by_index(idx).map_err(zip_err)?;
        let path = PathBuf::from(file.name());

        if wanted(&path) {
            return read_lossy(&mut file).map(Some).map_err(archive_err);
        }
    }

    Ok(None)
}

fn read_lossy(reader: &mut impl Read) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The single top-level directory of an unpacked archive.
pub fn top_level_dir(unpacked: &Path) -> Result<String> {
    let entries = fs::read_dir(unpacked).map_err(|source| PipoeError::ReadFile {
        path: unpacked.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
        .collect();
    dirs.sort();

    if dirs.len() > 1 {
        tracing::debug!(
            "{} has {} top-level directories, using {}",
            unpacked.display(),
            dirs.len(),
            dirs[0]
        );
    }

    dirs.into_iter()
        .next()
        .ok_or_else(|| PipoeError::MissingSourceDir {
            path: unpacked.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, body.as_bytes()).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();

        for (path, body) in files {
            writer.start_file(*path, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn detects_formats_from_suffix() {
        assert_eq!(
            ArchiveFormat::from_uri("https://x/pkg-1.0.tar.gz").unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_uri("https://x/pkg-1.0.tar.bz2#sha256=abc").unwrap(),
            ArchiveFormat::TarBz2
        );
        assert_eq!(
            ArchiveFormat::from_uri("pkg-1.0.zip").unwrap().extension(),
            "zip"
        );
        assert!(matches!(
            ArchiveFormat::from_uri("pkg-1.0-py3-none-any.whl"),
            Err(PipoeError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn unpacks_tarball_and_finds_top_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.tar.gz");
        fs::write(
            &archive,
            tar_gz(&[("pkg-1.0/setup.py", "setup()"), ("pkg-1.0/LICENSE", "MIT")]),
        )
        .unwrap();

        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        unpack(ArchiveFormat::TarGz, &archive, &dest).unwrap();

        assert_eq!(top_level_dir(&dest).unwrap(), "pkg-1.0");
        assert!(dest.join("pkg-1.0/LICENSE").is_file());
    }

    #[test]
    fn unpacks_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.zip");
        fs::write(&archive, zip_bytes(&[("pkg-2.0/COPYING", "GPL")])).unwrap();

        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        unpack(ArchiveFormat::Zip, &archive, &dest).unwrap();

        assert_eq!(top_level_dir(&dest).unwrap(), "pkg-2.0");
    }

    #[test]
    fn empty_archive_has_no_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            top_level_dir(dir.path()),
            Err(PipoeError::MissingSourceDir { .. })
        ));
    }

    #[test]
    fn reads_members_in_memory() {
        let data = tar_gz(&[("pkg-1.0/README", "hi"), ("pkg-1.0/PKG-INFO", "Name: pkg")]);
        let text = read_member(ArchiveFormat::TarGz, "pkg.tar.gz", &data, |p| {
            p.ends_with("PKG-INFO")
        })
        .unwrap();
        assert_eq!(text.as_deref(), Some("Name: pkg"));

        let data = zip_bytes(&[("pkg-1.0.dist-info/METADATA", "Name: pkg")]);
        let text = read_member(ArchiveFormat::Zip, "pkg.whl", &data, |p| {
            p.ends_with("METADATA")
        })
        .unwrap();
        assert_eq!(text.as_deref(), Some("Name: pkg"));

        let missing =
            read_member(ArchiveFormat::Zip, "pkg.whl", &data, |p| p.ends_with("nope")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn non_utf8_member_is_decoded_lossily() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("pkg-1.0/PKG-INFO", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"Author: Jos\xe9\nRequires-Dist: six\n").unwrap();
        let data = writer.finish().unwrap().into_inner();

        let text = read_member(ArchiveFormat::Zip, "pkg.zip", &data, |p| {
            p.ends_with("PKG-INFO")
        })
        .unwrap()
        .unwrap();
        assert!(text.contains("Requires-Dist: six"));
        assert!(text.contains('\u{FFFD}'));
    }
}
