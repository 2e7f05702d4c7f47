use super::PythonTag;
use directories::BaseDirs;
use std::path::PathBuf;
use std::{env, fs, path::Path};

pub const RC_FILE: &str = ".pipoerc";

/// Values collected from `.pipoerc` files, later files winning.
#[derive(Debug, Clone, Default)]
pub struct RcSettings {
    pub registry: Option<String>,
    pub python: Option<PythonTag>,
    pub default_license: Option<String>,
    pub scratch_dir: Option<PathBuf>,
    pub license_map: Option<PathBuf>,
}

pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::new();
    let mut i = 0;
    let bytes = text.as_bytes();

    while i < bytes.len() {
        if bytes[i] == b'$' {
            if i + 1 < bytes.len()
                && bytes[i + 1] == b'{'
                && let Some(end) = text[i + 2..].find('}')
            {
                let var = &text[i + 2..i + 2 + end];
                let val = env::var(var).unwrap_or_default();
                out.push_str(&val);
                i += 2 + end + 1;
                continue;
            }

            let mut j = i + 1;
            while j < bytes.len()
                && (bytes[j] == b'_' || (bytes[j] as char).is_ascii_alphanumeric())
            {
                j += 1;
            }

            let var = &text[i + 1..j];
            if !var.is_empty() {
                let val = env::var(var).unwrap_or_default();
                out.push_str(&val);
                i = j;
                continue;
            }

            out.push('$');
            i += 1;
        } else {
            let ch = text[i..].chars().next().unwrap_or_default();
            out.push(ch);
            i += ch.len_utf8().max(1);
        }
    }

    out
}

pub fn normalize_registry_url(value: &str) -> String {
    let mut url = if value.starts_with("//") {
        format!("https:{}", value)
    } else {
        value.trim().to_string()
    };

    while url.ends_with('/') {
        url.pop();
    }

    url
}

pub fn read_rc_settings() -> RcSettings {
    let mut settings = RcSettings::default();

    if let Some(base) = BaseDirs::new() {
        apply_rc_file(&base.home_dir().join(RC_FILE), &mut settings);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    apply_rc_file(&cwd.join(RC_FILE), &mut settings);

    settings
}

pub fn apply_rc_file(path: &Path, settings: &mut RcSettings) {
    if !path.is_file() {
        return;
    }

    if let Ok(data) = fs::read_to_string(path) {
        apply_rc_text(&data, settings);
    }
}

pub fn apply_rc_text(data: &str, settings: &mut RcSettings) {
    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let key = key.trim();
        let value = expand_env_vars(value.trim());
        if value.is_empty() {
            continue;
        }

        match key {
            "registry" => settings.registry = Some(normalize_registry_url(&value)),
            "python" => {
                if let Some(tag) = PythonTag::from_str(&value) {
                    settings.python = Some(tag);
                }
            }
            "default-license" | "default_license" => settings.default_license = Some(value),
            "scratch-dir" | "scratch_dir" => settings.scratch_dir = Some(PathBuf::from(value)),
            "license-map" | "license_map" => settings.license_map = Some(PathBuf::from(value)),
            _ => {}
        }
    }
}
