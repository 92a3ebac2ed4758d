//! Input scanner for turning command-line paths into readable sources.
//!
//! Plain paths pass through untouched, in argument order. Directories are
//! expanded recursively into the TDV files they contain, sorted by name.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// One source of TDV lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    /// Path to read.
    pub path: PathBuf,
    /// 1-based position of the command-line argument this source came from.
    pub argument: usize,
}

/// Expand command-line paths into an ordered list of sources.
///
/// Paths that do not exist are kept so that opening them later reports
/// the failure against the right argument.
pub fn resolve_inputs(paths: &[PathBuf], extensions: &[String]) -> Vec<InputSource> {
    let mut sources = Vec::new();

    for (i, path) in paths.iter().enumerate() {
        let argument = i + 1;

        if path.is_dir() {
            let before = sources.len();
            for file in walk_dir(path, extensions) {
                sources.push(InputSource {
                    path: file,
                    argument,
                });
            }
            let found = sources.len() - before;
            if found == 0 {
                warn!("No input files found in directory: {}", path.display());
            } else {
                debug!("Expanded {} into {} file(s)", path.display(), found);
            }
        } else {
            sources.push(InputSource {
                path: path.clone(),
                argument,
            });
        }
    }

    sources
}

/// Walk a directory recursively, returning matching files in name order.
fn walk_dir(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && matches(entry.path(), extensions) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Cannot read directory entry under {}: {}", dir.display(), e);
            }
        }
    }

    files
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Check whether a file's extension is one of the accepted ones.
fn matches(path: &Path, extensions: &[String]) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    extensions.iter().any(|accepted| accepted.eq_ignore_ascii_case(ext))
}
