//! Android KCM keymap patching.
//!
//! Base layouts are plain `type OVERLAY` keymap files; user remappings are
//! merged in line by line, commenting out any conflicting `map key` lines
//! the base already carries.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_LAYOUT: &str = "type OVERLAY\n";
pub const MODIFICATIONS_COMMENT: &str = "# Custom key mappings:";

/// A parsed `map key [usage] <code> <KEYCODE>` line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MapKey<'a> {
    pub usage: bool,
    pub code: &'a str,
    pub key_code: &'a str,
}

pub fn parse_map_key(line: &str) -> Option<MapKey<'_>> {
    if !line.trim().starts_with("map ") {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 || parts[1] != "key" {
        return None;
    }

    if parts[2] == "usage" {
        if parts.len() != 5 {
            return None;
        }
        Some(MapKey {
            usage: true,
            code: parts[3],
            key_code: parts[4],
        })
    } else {
        if parts.len() != 4 {
            return None;
        }
        Some(MapKey {
            usage: false,
            code: parts[2],
            key_code: parts[3],
        })
    }
}

/// Apply user mappings to a base layout.
///
/// Mapping keys are the full code as typed in the form, e.g. `58` or
/// `usage 0x0007002a`. A mapping the base layout already has is kept once;
/// a conflicting base mapping is commented out and replaced.
pub fn from_layout(layout: &str, mappings: &[(String, String)]) -> String {
    if mappings.is_empty() {
        return layout.to_owned();
    }

    let mut remaining: Vec<(String, String)> = mappings.to_vec();
    let mut result: Vec<String> = Vec::new();

    if !layout.contains("map ") {
        result.push(layout.to_owned());
    } else {
        for line in layout.lines() {
            if let Some(parsed) = parse_map_key(line) {
                let full_code = if parsed.usage {
                    format!("usage {}", parsed.code)
                } else {
                    parsed.code.to_owned()
                };
                if let Some(position) = remaining.iter().position(|(code, _)| *code == full_code) {
                    if remaining[position].1 == parsed.key_code {
                        // Base layout already maps it the same way.
                        remaining.remove(position);
                    } else {
                        result.push(MODIFICATIONS_COMMENT.to_owned());
                        result.push(format!("# {line}"));
                        continue;
                    }
                }
            }
            result.push(line.to_owned());
        }
        // Keep the trailing newline `lines()` swallowed.
        result.push(String::new());
    }

    if !remaining.is_empty() {
        result.push(String::new());
        result.push(MODIFICATIONS_COMMENT.to_owned());
        for (code, key_code) in &remaining {
            result.push(format!("map key {code} {key_code}"));
        }
    }

    result.join("\n")
}

/// Resolve a named layout inside the resources `kcm/` directory. Names are
/// bare file names; anything that could escape the directory is rejected.
pub fn kcm_path(resources: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        bail!("invalid layout name `{name}`");
    }
    Ok(resources.join("kcm").join(name))
}

pub fn read_layout(resources: &Path, name: &str) -> Result<Option<String>> {
    let path = kcm_path(resources, name)?;
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("reading `{}`", path.display()))?;
    Ok(Some(content))
}

/// Build a complete layout from an optional named base plus user mappings.
/// Unknown or absent base names fall back to the minimal overlay layout.
pub fn from_named_layout(
    resources: &Path,
    base: Option<&str>,
    mappings: &[(String, String)],
) -> Result<String> {
    let layout = match base {
        Some(name) => read_layout(resources, name)?,
        None => None,
    };
    Ok(from_layout(
        layout.as_deref().unwrap_or(DEFAULT_LAYOUT),
        mappings,
    ))
}
