//! `.env` loading and typed environment lookups.

use std::env;
use std::path::Path;

use tracing::debug;

/// Load `KEY=value` pairs from `<dir>/.env` into the process environment.
///
/// Variables that are already set win. Must run before any thread is spawned.
pub fn load_dotenv(dir: &Path) -> usize {
    let path = dir.join(".env");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return 0;
    };
    let mut loaded = 0;
    for (key, value) in parse_dotenv(&content) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
            loaded += 1;
        }
    }
    debug!(path = %path.display(), loaded, "loaded .env");
    loaded
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if quoted {
            value = &value[1..value.len() - 1];
        } else if let Some(idx) = value.find(" #") {
            value = value[..idx].trim_end();
        }
        if !key.is_empty() {
            pairs.push((key, value));
        }
    }
    pairs
}

/// Trimmed value of `key`, with empty treated as unset.
pub fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `1/true/yes/on` are true, `0/false/no/off` are false, anything else falls back.
pub fn env_bool(key: &str, default: bool) -> bool {
    match env_optional(key).map(|s| s.to_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
