use std::path::{Component, Path, PathBuf};

use crate::error::{HostError, Result};

const ILLEGAL_CHARS: [char; 6] = ['<', '>', '"', '|', '?', '*'];

/// Checks a caller-supplied path and anchors relative paths at `workspace`.
pub fn resolve(workspace: &Path, raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(HostError::invalid_path(raw, "path cannot be empty"));
    }

    let path = Path::new(raw);
    if path.components().any(|component| component == Component::ParentDir) {
        return Err(HostError::invalid_path(raw, "path traversal detected"));
    }

    if raw.contains(ILLEGAL_CHARS) || has_stray_colon(raw) {
        return Err(HostError::invalid_path(raw, "path contains illegal characters"));
    }

    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(workspace.join(path))
    }
}

/// A colon is only allowed as a drive prefix such as `C:`.
fn has_stray_colon(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let drive_prefix = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    let rest = if drive_prefix { &raw[2..] } else { raw };
    rest.contains(':')
}

/// Rejects names that would escape their parent folder.
pub fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(HostError::InvalidArgument(format!("invalid file name '{name}'")));
    }
    if trimmed.contains(['/', '\\', ':']) || trimmed.contains(ILLEGAL_CHARS) {
        return Err(HostError::InvalidArgument(format!(
            "file name '{name}' contains illegal characters"
        )));
    }
    Ok(trimmed)
}

pub fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
