//! File discovery
//!
//! Walks the search root respecting .gitignore and hidden entries, skips
//! binary files, and reads the rest in parallel. Symlinked files are
//! followed. A root that is a single file is searched on its own.

use crate::config::{Config, BINARY_PROBE_BYTES};
use crate::error::{Result, VibegrepError};
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A readable text file under the search root
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the search root, used in labels and output
    pub relative_path: String,
    /// File contents, lossily decoded as UTF-8
    pub content: String,
}

/// Collect searchable files under `config.root_path`
///
/// Files come back ordered by depth, then path, so files at the root are
/// batched before those in subdirectories.
pub fn discover_files(config: &Config) -> Result<Vec<SourceFile>> {
    let root = config.root_path.canonicalize().map_err(|_| {
        VibegrepError::InvalidPath(format!(
            "path '{}' does not exist",
            config.root_path.display()
        ))
    })?;

    // Labels are relative to the directory holding the files
    let base = if root.is_file() {
        root.parent().unwrap_or(&root).to_path_buf()
    } else {
        root.clone()
    };

    let matcher = match &config.glob {
        Some(pattern) => Some(Glob::new(pattern)?.compile_matcher()),
        None => None,
    };

    // Use ignore crate to respect .gitignore
    let walker = WalkBuilder::new(&root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .ignore(true)
        .parents(true)
        .follow_links(true)
        .max_depth(Some(config.depth))
        .add_custom_ignore_filename(".vibegrepignore")
        .build();

    let mut candidates: Vec<(usize, PathBuf)> = walker
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| name_matches(matcher.as_ref(), entry.path()))
        .map(|entry| (entry.depth(), entry.path().to_path_buf()))
        .collect();

    candidates.sort();
    debug!("{} candidate files under {:?}", candidates.len(), root);

    // Read files in parallel; order is preserved by the indexed collect
    let files: Vec<SourceFile> = candidates
        .into_par_iter()
        .filter_map(|(_, path)| read_text_file(&base, path))
        .collect();

    info!("Discovered {} searchable files", files.len());
    Ok(files)
}

fn name_matches(matcher: Option<&GlobMatcher>, path: &Path) -> bool {
    match (matcher, path.file_name()) {
        (None, _) => true,
        (Some(m), Some(name)) => m.is_match(name),
        (Some(_), None) => false,
    }
}

fn read_text_file(root: &Path, path: PathBuf) -> Option<SourceFile> {
    if is_binary(&path) {
        debug!("Skipping binary file {:?}", path);
        return None;
    }

    let bytes = std::fs::read(&path).ok()?;
    let relative_path = path
        .strip_prefix(root)
        .unwrap_or(&path)
        .to_string_lossy()
        .to_string();

    Some(SourceFile {
        content: String::from_utf8_lossy(&bytes).into_owned(),
        relative_path,
        path,
    })
}

/// A file is binary if its first bytes contain NUL; unreadable files count as binary
pub fn is_binary(path: &Path) -> bool {
    let mut buf = Vec::with_capacity(BINARY_PROBE_BYTES);
    match std::fs::File::open(path) {
        Ok(file) => match file.take(BINARY_PROBE_BYTES as u64).read_to_end(&mut buf) {
            Ok(_) => buf.contains(&0),
            Err(_) => true,
        },
        Err(_) => true,
    }
}
