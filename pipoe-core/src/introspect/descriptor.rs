use crate::recipe::bb_name;
use crate::{PipoeError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

pub const SETUP_PY: &str = "setup.py";
pub const PYPROJECT_TOML: &str = "pyproject.toml";

// Bracketed list whose quoted items may themselves contain brackets.
const LIST: &str = r#"[\[(]((?:[^\])"']|"[^"]*"|'[^']*')*)[\])]"#;

static SETUP_REQUIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*setup_requires[ \t]*=[ \t]*(?:{}|([A-Za-z_][A-Za-z0-9_]*))",
        LIST
    ))
    .expect("valid regex")
});

static DEPENDENCIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)^[ \t]*dependencies[ \t]*=[ \t]*{}", LIST)).expect("valid regex")
});

static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|'([^']*)'|([A-Za-z_][A-Za-z0-9_]*)"#).expect("valid regex")
});

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w\S+").expect("valid regex"));

enum Item {
    Literal(String),
    Name(String),
}

fn items(list: &str) -> Vec<Item> {
    ITEM.captures_iter(list)
        .filter_map(|caps| {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                Some(Item::Literal(m.as_str().to_string()))
            } else {
                caps.get(3).map(|m| Item::Name(m.as_str().to_string()))
            }
        })
        .collect()
}

/// `${PYTHON_PN}-{name}-native` for a requirement string.
pub fn native_token(spec: &str) -> String {
    let name = spec
        .split(['<', '>', '~', '=', '!', ';', '[', ' '])
        .next()
        .unwrap_or_default()
        .trim();
    format!("${{PYTHON_PN}}-{}-native", bb_name(name))
}

fn push_literal(tokens: &mut Vec<String>, literal: &str) {
    if let Some(m) = IDENTIFIER.find(literal.trim()) {
        let token = native_token(m.as_str());
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
}

/// Resolves a bare name inside a list: a module-level `NAME = [...]`
/// assignment is expanded, anything else is taken as a package name.
fn push_name(tokens: &mut Vec<String>, name: &str, text: &str) {
    let assignment = Regex::new(&format!(r"(?m)^[ \t]*{}[ \t]*=[ \t]*{}", regex::escape(name), LIST));

    match assignment.ok().and_then(|re| re.captures(text)) {
        Some(caps) => {
            for item in items(caps.get(1).map(|m| m.as_str()).unwrap_or_default()) {
                if let Item::Literal(literal) = item {
                    push_literal(tokens, &literal);
                }
            }
        }
        None => push_literal(tokens, name),
    }
}

/// Build-time tokens declared by `setup_requires` in a setup script.
pub fn from_setup_py(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let Some(caps) = SETUP_REQUIRES.captures(text) else {
        return tokens;
    };

    if let Some(list) = caps.get(1) {
        for item in items(list.as_str()) {
            match item {
                Item::Literal(literal) => push_literal(&mut tokens, &literal),
                Item::Name(name) => push_name(&mut tokens, &name, text),
            }
        }
    } else if let Some(name) = caps.get(2) {
        push_name(&mut tokens, name.as_str(), text);
    }

    tokens
}

/// Build-time tokens declared by the first `dependencies = [...]` array.
pub fn from_pyproject(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    if let Some(list) = DEPENDENCIES.captures(text).and_then(|caps| caps.get(1)) {
        for item in items(list.as_str()) {
            if let Item::Literal(literal) = item {
                push_literal(&mut tokens, &literal);
            }
        }
    }

    tokens
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }

    let bytes = fs::read(path).map_err(|source| PipoeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Scans both build descriptors of an unpacked source tree.
pub fn build_dependencies(src: &Path) -> Result<Vec<String>> {
    let mut tokens = Vec::new();

    if let Some(text) = read_optional(&src.join(SETUP_PY))? {
        tokens.extend(from_setup_py(&text));
    }

    if let Some(text) = read_optional(&src.join(PYPROJECT_TOML))? {
        for token in from_pyproject(&text) {
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_uses_normalized_name() {
        assert_eq!(
            native_token("setuptools_scm>=3.4"),
            "${PYTHON_PN}-setuptools-scm-native"
        );
        assert_eq!(native_token("Cython"), "${PYTHON_PN}-cython-native");
    }

    #[test]
    fn reads_inline_setup_requires() {
        let text = r#"
from setuptools import setup

setup(
    name="demo",
    setup_requires=["setuptools_scm>=1.15", 'pytest-runner'],
)
"#;
        assert_eq!(
            from_setup_py(text),
            vec![
                "${PYTHON_PN}-setuptools-scm-native",
                "${PYTHON_PN}-pytest-runner-native"
            ]
        );
    }

    #[test]
    fn expands_setup_requires_variable() {
        let text = r#"
SETUP_REQUIRES = [
    "cffi>=1.4.1",
    "wheel",
]

setup(
    setup_requires=SETUP_REQUIRES,
)
"#;
        assert_eq!(
            from_setup_py(text),
            vec!["${PYTHON_PN}-cffi-native", "${PYTHON_PN}-wheel-native"]
        );
    }

    #[test]
    fn reads_multiline_pyproject_dependencies() {
        let text = r#"
[build-system]
requires = ["setuptools>=61"]

[project]
name = "demo"
dependencies = [
    "requests[socks]>=2.0",
    "idna<3,>=2.5",
]
"#;
        assert_eq!(
            from_pyproject(text),
            vec!["${PYTHON_PN}-requests-native", "${PYTHON_PN}-idna-native"]
        );
    }

    #[test]
    fn missing_descriptors_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(build_dependencies(dir.path()).unwrap().is_empty());
        assert!(from_setup_py("setup(name='x')").is_empty());
    }

    #[test]
    fn merges_both_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETUP_PY),
            "setup(\n    setup_requires=['wheel'],\n)\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(PYPROJECT_TOML),
            "dependencies = ['wheel', 'six']",
        )
        .unwrap();

        assert_eq!(
            build_dependencies(dir.path()).unwrap(),
            vec!["${PYTHON_PN}-wheel-native", "${PYTHON_PN}-six-native"]
        );
    }
}
