use crate::{PipoeError, Result, console};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static EXTRA_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"extra\s*==\s*['"]([^'"]+)['"]"#).expect("valid regex"));

static MARKER_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]*)['"]"#).expect("valid regex"));

const OPERATORS: [&str; 8] = ["===", "==", "!=", "<=", ">=", "~=", "<", ">"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Compatible,
    Less,
    Greater,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "===" | "==" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            "<=" => Some(Operator::LessEqual),
            ">=" => Some(Operator::GreaterEqual),
            "~=" => Some(Operator::Compatible),
            "<" => Some(Operator::Less),
            ">" => Some(Operator::Greater),
            _ => None,
        }
    }
}

/// A requirement specifier split into its parts, markers left unevaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub constraints: Vec<(Operator, String)>,
    pub marker: Option<String>,
}

/// What a package asks for when it is requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionConstraint {
    Exact(String),
    LowerBound(String),
    UpperBound(String),
    Wildcard(String),
    Any,
}

impl VersionConstraint {
    /// Constraint for a dependency whose version has already been decided.
    pub fn from_pin(version: Option<&str>) -> Self {
        match version {
            None => VersionConstraint::Any,
            Some(v) if v.trim().is_empty() => VersionConstraint::Any,
            Some(v) if pipoe_version::is_wildcard(v) => VersionConstraint::Wildcard(v.to_string()),
            Some(v) => VersionConstraint::Exact(v.to_string()),
        }
    }

    /// Version used for the already-processed check and the progress trace.
    pub fn requested(&self) -> Option<&str> {
        match self {
            VersionConstraint::Exact(v)
            | VersionConstraint::UpperBound(v)
            | VersionConstraint::Wildcard(v) => Some(v),
            VersionConstraint::LowerBound(_) | VersionConstraint::Any => None,
        }
    }
}

/// A runtime dependency as declared by a resolved package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
    pub extra: Option<String>,
}

impl Requirement {
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| PipoeError::InvalidRequirement {
            value: spec.to_string(),
            reason: reason.to_string(),
        };

        let (body, marker) = match spec.split_once(';') {
            Some((body, marker)) => (body.trim(), Some(marker.trim().to_string())),
            None => (spec.trim(), None),
        };

        let name_end = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            .unwrap_or(body.len());
        let name = &body[..name_end];
        if name.is_empty() {
            return Err(invalid("missing package name"));
        }

        let mut rest = body[name_end..].trim_start();
        let mut extras = Vec::new();

        if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(|| invalid("unterminated extras"))?;
            extras = after[..close]
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            rest = after[close + 1..].trim_start();
        }

        let mut constraints = Vec::new();

        if !rest.starts_with('@') {
            let versions = rest.trim_start_matches('(').trim_end_matches(')').trim();
            for clause in versions.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                let op = OPERATORS
                    .iter()
                    .find(|op| clause.starts_with(*op))
                    .ok_or_else(|| invalid("unknown version operator"))?;
                let operator = Operator::parse(op).ok_or_else(|| invalid("unknown version operator"))?;
                let version = clause[op.len()..].trim();
                if version.is_empty() {
                    return Err(invalid("missing version after operator"));
                }
                constraints.push((operator, version.to_string()));
            }
        }

        Ok(Requirement {
            name: name.to_string(),
            extras,
            constraints,
            marker: marker.filter(|m| !m.is_empty()),
        })
    }

    /// Only the first clause decides: `==` and `<=` pin, anything else is open.
    pub fn decided_version(&self) -> Option<String> {
        match self.constraints.first() {
            Some((Operator::Equal, v)) | Some((Operator::LessEqual, v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// The `extra == "..."` clause of the marker when present, otherwise the
    /// last literal of the marker so that platform-conditional dependencies
    /// are gated like extras.
    pub fn decided_extra(&self) -> Option<String> {
        let marker = self.marker.as_deref()?;

        if let Some(caps) = EXTRA_MARKER.captures(marker) {
            return Some(caps[1].to_string());
        }

        MARKER_LITERAL
            .captures_iter(marker)
            .last()
            .map(|caps| caps[1].to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn to_dependency(&self) -> Dependency {
        Dependency {
            name: self.name.clone(),
            version: self.decided_version(),
            extra: self.decided_extra(),
        }
    }

    /// Constraint for a root request, keeping the bound direction.
    pub fn root_constraint(&self) -> VersionConstraint {
        match self.constraints.first() {
            Some((Operator::Equal, v)) => VersionConstraint::from_pin(Some(v)),
            Some((Operator::LessEqual, v)) => VersionConstraint::UpperBound(v.clone()),
            Some((Operator::GreaterEqual, v)) | Some((Operator::Greater, v)) => {
                VersionConstraint::LowerBound(v.clone())
            }
            _ => VersionConstraint::Any,
        }
    }
}

/// Parses a registry dependency specifier.
pub fn parse_dependency(spec: &str) -> Result<Dependency> {
    Requirement::parse(spec).map(|r| r.to_dependency())
}

/// One root request read from a requirements file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootRequirement {
    pub name: String,
    pub constraint: VersionConstraint,
    pub extras: Vec<String>,
}

pub fn parse_requirements(text: &str) -> Vec<RootRequirement> {
    let mut roots = Vec::new();

    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("-e") || line.starts_with('.') {
            console::info(&format!("    Skipping: {}", line));
            continue;
        }

        let parts: Vec<&str> = line.split("==").map(str::trim).collect();
        match parts.as_slice() {
            [name] | [name, _] if Requirement::parse(name).is_ok_and(|r| r.name == *name) => {
                roots.push(RootRequirement {
                    name: name.to_string(),
                    constraint: VersionConstraint::from_pin(parts.get(1).copied()),
                    extras: Vec::new(),
                });
            }
            _ => match Requirement::parse(line) {
                Ok(req) if parts.len() <= 2 => roots.push(RootRequirement {
                    name: req.name.clone(),
                    constraint: req.root_constraint(),
                    extras: req.extras,
                }),
                _ => console::info(&format!("    Unparsed package: {}", line)),
            },
        }
    }

    roots
}

pub fn read_requirements(path: &Path) -> Result<Vec<RootRequirement>> {
    let text = fs::read_to_string(path).map_err(|source| PipoeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_requirements(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_names() {
        let dep = parse_dependency("certifi").unwrap();
        assert_eq!(
            dep,
            Dependency {
                name: "certifi".to_string(),
                version: None,
                extra: None
            }
        );
    }

    #[test]
    fn decides_versions_from_first_clause() {
        assert_eq!(
            parse_dependency("six==1.16.0").unwrap().version.as_deref(),
            Some("1.16.0")
        );
        assert_eq!(parse_dependency("idna (<3,>=2.5)").unwrap().version, None);
        assert_eq!(
            parse_dependency("chardet (<=4,>=3.0.2)").unwrap().version.as_deref(),
            Some("4")
        );
        assert_eq!(parse_dependency("certifi>=2017.4.17").unwrap().version, None);
        assert_eq!(parse_dependency("attrs~=21.0").unwrap().version, None);
        assert_eq!(
            parse_dependency("zope.interface==5.*").unwrap().version.as_deref(),
            Some("5.*")
        );
    }

    #[test]
    fn extracts_extra_from_marker() {
        let dep = parse_dependency("PySocks (!=1.5.7,>=1.5.6) ; extra == 'socks'").unwrap();
        assert_eq!(dep.name, "PySocks");
        assert_eq!(dep.version, None);
        assert_eq!(dep.extra.as_deref(), Some("socks"));

        let dep = parse_dependency(
            r#"win-inet-pton ; (sys_platform == "win32" and python_version == "2.7") and extra == 'socks'"#,
        )
        .unwrap();
        assert_eq!(dep.extra.as_deref(), Some("socks"));
    }

    #[test]
    fn platform_markers_gate_like_extras() {
        let dep = parse_dependency(r#"pywin32 ; sys_platform == "win32""#).unwrap();
        assert_eq!(dep.extra.as_deref(), Some("win32"));
    }

    #[test]
    fn parses_requested_extras_and_urls() {
        let req = Requirement::parse("requests[security, socks] >= 2.0").unwrap();
        assert_eq!(req.extras, vec!["security", "socks"]);
        assert_eq!(
            req.root_constraint(),
            VersionConstraint::LowerBound("2.0".to_string())
        );

        let req = Requirement::parse("pkg @ https://example.org/pkg.tar.gz").unwrap();
        assert!(req.constraints.is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_dependency("").is_err());
        assert!(parse_dependency("pkg ?? 1").is_err());
        assert!(parse_dependency("pkg[extra").is_err());
    }

    #[test]
    fn constraint_from_pin() {
        assert_eq!(VersionConstraint::from_pin(None), VersionConstraint::Any);
        assert_eq!(
            VersionConstraint::from_pin(Some("1.*")),
            VersionConstraint::Wildcard("1.*".to_string())
        );
        assert_eq!(
            VersionConstraint::from_pin(Some("1.0")).requested(),
            Some("1.0")
        );
        assert_eq!(
            VersionConstraint::LowerBound("1.0".to_string()).requested(),
            None
        );
    }

    #[test]
    fn parses_requirements_file() {
        let text = "requests==2.25.1\n\n# comment\nsix\n-e git+https://x\n./local\nflask>=1.0\nrequests[socks]==2.25.1\n";
        let roots = parse_requirements(text);

        assert_eq!(
            roots,
            vec![
                RootRequirement {
                    name: "requests".to_string(),
                    constraint: VersionConstraint::Exact("2.25.1".to_string()),
                    extras: vec![],
                },
                RootRequirement {
                    name: "six".to_string(),
                    constraint: VersionConstraint::Any,
                    extras: vec![],
                },
                RootRequirement {
                    name: "flask".to_string(),
                    constraint: VersionConstraint::LowerBound("1.0".to_string()),
                    extras: vec![],
                },
                RootRequirement {
                    name: "requests".to_string(),
                    constraint: VersionConstraint::Exact("2.25.1".to_string()),
                    extras: vec!["socks".to_string()],
                },
            ]
        );
    }
}
