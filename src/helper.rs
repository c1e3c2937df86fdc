use std::{
    fs,
    io::Write,
    path::Path,
};

use log::{debug, error, trace};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::{DraftError, Result};

/// Reads and deserializes a JSON document from disk
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading JSON from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to open file {}: {}", path.display(), e);
        DraftError::Io(e)
    })?;

    let value = serde_json::from_str(&content)?;
    trace!("Successfully parsed {}", path.display());
    Ok(value)
}

/// Serializes `value` and atomically replaces `path` with it
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    // Ensure the parent directory exists
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        debug!("Creating parent directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| {
            error!("Failed to create directory {}: {}", dir.display(), e);
            DraftError::Io(e)
        })?;
    }

    // Write next to the target so the final rename stays on one filesystem
    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        error!("Failed to create temporary file: {}", e);
        DraftError::Io(e)
    })?;

    trace!("Serializing to JSON");
    let json = serde_json::to_string_pretty(value)?;

    temp_file.write_all(json.as_bytes())?;
    temp_file.flush()?;

    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        DraftError::Io(e.error)
    })?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// First non-empty line of `content`, cut at `max_len` characters
pub fn content_preview(content: &str, max_len: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("values.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        let loaded: Vec<i32> = load_json_file(&path).unwrap();

        assert_eq!(loaded, vec![1, 2, 3]);
    }

    #[test]
    fn load_reports_corrupt_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let result: Result<Vec<i32>> = load_json_file(&path);
        assert!(matches!(result, Err(DraftError::Serialization(_))));
    }

    #[test]
    fn preview_skips_blank_lines_and_truncates() {
        assert_eq!(content_preview("\n\n  \nhello world", 100), "hello world");
        assert_eq!(content_preview("abcdef", 3), "abc...");
        assert_eq!(content_preview("", 3), "");
    }
}
