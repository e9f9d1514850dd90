//! Phase 1: find the export files under the source root.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// An export file selected for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the source root, `/` separated.
    pub rel_path: String,
}

/// Walk the source root and return the export files, sorted by relative path.
///
/// A file qualifies when its name ends with the configured suffix and its
/// parent directory, relative to the root, is one of the source dirs.
pub fn run_discovery_phase(config: &AnalysisConfig) -> Result<Vec<SourceFile>> {
    let root = Path::new(&config.source_root);
    if !root.is_dir() {
        return Err(Error::SourceRootNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"))
    {
        let entry = entry.map_err(|source| Error::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let abs_path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(&config.file_suffix) {
            continue;
        }

        let rel_path = abs_path
            .strip_prefix(root)
            .unwrap_or(abs_path)
            .to_string_lossy()
            .replace('\\', "/");
        let parent = rel_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        if !config.source_dirs.iter().any(|d| d == parent) {
            log::debug!("skipping {rel_path}: not in a source directory");
            continue;
        }

        files.push(SourceFile {
            path: abs_path.to_path_buf(),
            rel_path,
        });
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    log::info!("discovered {} export files under {}", files.len(), root.display());
    Ok(files)
}
