use crate::config::PythonTag;
use crate::introspect::ArchiveFormat;
use crate::resolve::ResolvedPackage;
use crate::{PipoeError, Result, console};
use std::fs;
use std::path::{Path, PathBuf};

/// Recipe-system spelling of a package name.
pub fn bb_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

pub fn recipe_file_name(python: PythonTag, name: &str, version: &str) -> String {
    format!("{}-{}_{}.bb", python, bb_name(name), version)
}

fn runtime_name(python: PythonTag, name: &str) -> String {
    format!("{}-{}", python, bb_name(name))
}

fn multiline(text: &str) -> String {
    text.replace('\n', " \\\n")
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RecipeOptions {
    pub python: PythonTag,
    /// Fetch through the registry class instead of an explicit `SRC_URI`.
    pub use_pypi: bool,
}

/// Packagegroup collecting the dependencies gated behind one extra.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtraGroup {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub homepage: String,
    pub author: String,
    pub author_email: String,
    pub dependencies: Vec<String>,
}

/// One group per distinct extra, in order of first appearance. The base
/// package comes first in every group.
pub fn extra_groups(package: &ResolvedPackage) -> Vec<ExtraGroup> {
    let mut groups: Vec<ExtraGroup> = Vec::new();

    for dep in &package.dependencies {
        let Some(extra) = dep.extra.as_deref() else {
            continue;
        };

        let name = format!("{}-{}", package.name, extra);
        let idx = match groups.iter().position(|g| g.name == name) {
            Some(idx) => idx,
            None => {
                groups.push(ExtraGroup {
                    name,
                    version: package.version.clone(),
                    summary: package.summary.clone(),
                    homepage: package.homepage.clone(),
                    author: package.author.clone(),
                    author_email: package.author_email.clone(),
                    dependencies: vec![package.name.clone()],
                });
                groups.len() - 1
            }
        };

        groups[idx].dependencies.push(dep.name.clone());
    }

    groups
}

pub fn render(package: &ResolvedPackage, options: RecipeOptions) -> String {
    let python = options.python;
    let build_dependencies = package.build_dependencies.join(" ");
    let dependencies = package
        .dependencies
        .iter()
        .filter(|dep| dep.extra.is_none())
        .map(|dep| runtime_name(python, &dep.name))
        .collect::<Vec<_>>()
        .join(" ");

    let head = format!(
        r#"
SUMMARY = "{summary}"
HOMEPAGE = "{homepage}"
AUTHOR = "{author} <{author_email}>"
LICENSE = "{license}"
LIC_FILES_CHKSUM = "file://{license_file};md5={license_md5}"
"#,
        summary = multiline(&package.summary),
        homepage = package.homepage,
        author = package.author,
        author_email = package.author_email,
        license = package.license,
        license_file = package.license_file,
        license_md5 = package.license_md5,
    );

    let source = if options.use_pypi {
        let ext = if package.src_uri.ends_with(".tar.gz") {
            String::new()
        } else {
            ArchiveFormat::from_uri(&package.src_uri)
                .map(|format| format!("\nPYPI_PACKAGE_EXT = \"{}\"", format.extension()))
                .unwrap_or_default()
        };

        format!(
            r#"
inherit setuptools{setuptools} pypi

SRC_URI[md5sum] = "{md5}"
SRC_URI[sha256sum] = "{sha256}"

PYPI_PACKAGE = "{pypi_package}"{ext}
"#,
            setuptools = python.setuptools_suffix(),
            md5 = package.src_md5,
            sha256 = package.src_sha256,
            pypi_package = package.name,
            ext = ext,
        )
    } else {
        format!(
            r#"
inherit setuptools{setuptools}

SRC_URI = "{src_uri}"
SRC_URI[md5sum] = "{md5}"
SRC_URI[sha256sum] = "{sha256}"

S = "${{WORKDIR}}/{src_dir}"
"#,
            setuptools = python.setuptools_suffix(),
            src_uri = package.src_uri,
            md5 = package.src_md5,
            sha256 = package.src_sha256,
            src_dir = package.src_dir,
        )
    };

    let tail = format!(
        r#"
DEPENDS += " {build_dependencies}"
RDEPENDS_${{PN}} = "{dependencies}"

BBCLASSEXTEND = "native nativesdk"
"#
    );

    format!("{}{}{}", head, source, tail)
}

pub fn render_extra(group: &ExtraGroup, python: PythonTag) -> String {
    let dependencies = group
        .dependencies
        .iter()
        .map(|dep| runtime_name(python, dep))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"
SUMMARY = "{summary}"
HOMEPAGE = "{homepage}"
AUTHOR = "{author} <{author_email}>"

RDEPENDS_${{PN}} = "{dependencies}"

inherit packagegroup

BBCLASSEXTEND = "native nativesdk"
"#,
        summary = multiline(&group.summary),
        homepage = group.homepage,
        author = group.author,
        author_email = group.author_email,
    )
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| PipoeError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes one recipe per package plus one packagegroup per extra.
pub fn write_recipes(
    packages: &[ResolvedPackage],
    outdir: &Path,
    options: RecipeOptions,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(outdir).map_err(|source| PipoeError::WriteFile {
        path: outdir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();

    for package in packages {
        let file_name = recipe_file_name(options.python, &package.name, &package.version);
        console::info(&format!("  {}", file_name));
        let path = outdir.join(&file_name);
        write_file(&path, &render(package, options))?;
        written.push(path);

        for group in extra_groups(package) {
            let file_name = recipe_file_name(options.python, &group.name, &group.version);
            console::info(&format!("  {}", file_name));
            let path = outdir.join(&file_name);
            write_file(&path, &render_extra(&group, options.python))?;
            written.push(path);
        }
    }

    Ok(written)
}

pub fn preferred_versions(packages: &[ResolvedPackage], python: PythonTag) -> String {
    packages
        .iter()
        .map(|p| {
            format!(
                "PREFERRED_VERSION_{}-{} = \"{}\"",
                python,
                bb_name(&p.name),
                p.version
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes `{python}-versions.inc` into `outdir`.
pub fn write_preferred_versions(
    packages: &[ResolvedPackage],
    outdir: &Path,
    python: PythonTag,
) -> Result<PathBuf> {
    let path = outdir.join(format!("{}-versions.inc", python));
    write_file(&path, &preferred_versions(packages, python))?;
    Ok(path)
}
