//! Input discovery and decoding
//!
//! Reads the `.txt` files directly under a directory, in file-name order.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// List `.txt` files (extension compared case-insensitively) directly under
/// `dir`, sorted by file name
pub fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to list input directory: {}", dir.display()))?;
        let path = entry.path();
        let is_txt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if is_txt && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Decode bytes as UTF-8, dropping invalid sequences
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Read a file as text, dropping undecodable bytes
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    Ok(decode_lossy(&bytes))
}

/// Read every `.txt` file under `dir` as `(origin, content)` pairs
pub fn load_directory(dir: &Path) -> Result<Vec<(String, String)>> {
    list_text_files(dir)?
        .into_iter()
        .map(|path| {
            let content = read_text_lossy(&path)?;
            Ok((path.display().to_string(), content))
        })
        .collect()
}
