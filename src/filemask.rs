//! Shell-style filemask matching over a local directory.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::Result;

/// Mask used when none is given.
pub const DEFAULT_FILE_MASK: &str = "*";

/// Compiled filemask such as `*.jpg`, `?_file.*` or `report.pdf`.
#[derive(Debug, Clone)]
pub struct FileMask {
    raw: String,
    pattern: Pattern,
}

impl FileMask {
    /// Compile a mask; `None` or blank means every file.
    pub fn new(mask: Option<&str>) -> Result<Self> {
        let raw = mask
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_FILE_MASK)
            .to_string();
        let pattern = Pattern::new(&raw)?;
        Ok(Self { raw, pattern })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(file_name, options)
    }

    /// Regular files directly inside `dir` whose names match, sorted by name.
    /// Subdirectories are not descended into. Names that are not valid UTF-8
    /// are matched in their lossy form.
    pub fn matching_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if self.matches(&entry.file_name().to_string_lossy()) {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }
}
