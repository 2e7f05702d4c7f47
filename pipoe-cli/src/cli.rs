use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pipoe",
    about = "Generate BitBake recipes for PyPI packages and their dependencies",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// The package to process
    #[arg(short = 'p', long = "package")]
    pub package: Option<String>,

    /// The package version
    #[arg(short = 'v', long = "version")]
    pub version: Option<String>,

    /// The pypi requirements file
    #[arg(short = 'r', long = "requirements")]
    pub requirements: Option<PathBuf>,

    /// Generate recipes for extras
    #[arg(short = 'e', long = "extras")]
    pub extras: bool,

    /// The recipe directory
    #[arg(short = 'o', long = "outdir", default_value = "./")]
    pub outdir: PathBuf,

    /// The python version to use
    #[arg(short = 'y', long = "python", value_parser = ["python", "python3"])]
    pub python: Option<String>,

    /// Output an updated license map upon completion
    #[arg(short = 'l', long = "licenses")]
    pub licenses: bool,

    /// The default license to use when the package license cannot be mapped
    #[arg(short = 'd', long = "default-license")]
    pub default_license: Option<String>,

    /// Use the oe pypi class for recipes
    #[arg(short = 's', long = "pypi")]
    pub pypi: bool,

    /// A license map written by --licenses, merged over the built-in table
    #[arg(long = "license-map")]
    pub license_map: Option<PathBuf>,

    /// Yocto layers directory to scan for existing recipes
    #[arg(long = "yocto-layers-dir")]
    pub yocto_layers_dir: Option<PathBuf>,

    /// The existing packages list, written by a scan or read to skip packages
    #[arg(long = "existing-packages")]
    pub existing_packages: Option<PathBuf>,

    /// Do not write the preferred versions file
    #[arg(long = "no-preferred")]
    pub no_preferred: bool,

    /// Print debug diagnostics
    #[arg(long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "pipoe", "-p", "requests", "-v", "2.25.1", "-e", "-y", "python", "-s", "-l",
        ])
        .unwrap();

        assert_eq!(cli.package.as_deref(), Some("requests"));
        assert_eq!(cli.version.as_deref(), Some("2.25.1"));
        assert!(cli.extras && cli.pypi && cli.licenses);
        assert_eq!(cli.python.as_deref(), Some("python"));
        assert_eq!(cli.outdir, PathBuf::from("./"));
        assert!(!cli.no_preferred);
    }

    #[test]
    fn rejects_unknown_python() {
        assert!(Cli::try_parse_from(["pipoe", "-p", "six", "-y", "python4"]).is_err());
    }
}
