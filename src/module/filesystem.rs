//! File system access used by module discovery
//!
//! Discovery never touches `std::fs` directly; it goes through a [`FileProvider`]
//! so hosts can restrict or virtualize what the scanner sees.

use regex::RegexBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File system capability injected into the directory scanner
pub trait FileProvider: Send + Sync {
    /// Check whether a directory exists
    fn directory_exists(&self, path: &Path) -> bool;

    /// Create a directory (and any missing parents)
    fn create_directory(&self, path: &Path) -> io::Result<()>;

    /// Immediate subdirectories of `path`, in listing order
    fn get_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Regular files directly under `directory` whose name matches the glob `pattern`
    fn get_files(&self, directory: &Path, pattern: &str) -> io::Result<Vec<PathBuf>>;

    /// Write a UTF-8 text file, replacing any existing content
    fn write_all_text(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// [`FileProvider`] backed by the local file system
///
/// Listings are sorted by path so scans are deterministic across platforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileProvider;

impl LocalFileProvider {
    pub fn new() -> Self {
        Self
    }
}

impl FileProvider for LocalFileProvider {
    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn get_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut directories = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                directories.push(entry.path());
            }
        }
        directories.sort();
        Ok(directories)
    }

    fn get_files(&self, directory: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let matcher = RegexBuilder::new(&glob_to_regex(pattern))
            .case_insensitive(true)
            .build()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut files = Vec::new();
        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let matched = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| matcher.is_match(n));
            if matched {
                files.push(path);
            } else {
                debug!("Ignoring non-module file {:?}", path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn write_all_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents.as_bytes())
    }
}

/// Translate a file-name glob (`*`, `?`) into an anchored regular expression
pub(crate) fn glob_to_regex(glob: &str) -> String {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    pattern.push('$');
    pattern
}
