//! The three backends the searcher fans out to: relational, REST, file.

pub mod file_reader;
pub mod relational;
pub mod rest;

use std::path::PathBuf;

/// One configured file-backed source.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Enumerate recognised file sources under a directory (non-recursive is
/// sufficient for the demo-scale source set this system targets; `walkdir`
/// is used so nested source directories work the same way).
pub fn discover_file_sources(dir: &std::path::Path) -> Vec<FileSource> {
    if !dir.exists() {
        return Vec::new();
    }
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            matches!(
                entry.path().extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
                Some("csv" | "json" | "xlsx" | "xls" | "xml")
            )
        })
        .map(|entry| FileSource { path: entry.path().to_path_buf() })
        .collect()
}
