//! Manifest loading.
//!
//! A manifest is a plain text file with one pattern per line. Blank lines
//! (empty or whitespace only) are skipped; every other line becomes a
//! [`Pattern`] verbatim, minus its line terminator. Duplicates are kept.

use crate::error::{Result, RiffError};
use crate::types::Pattern;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Ordered list of patterns read from a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    patterns: Vec<Pattern>,
}

impl Manifest {
    /// Build a manifest from already-parsed patterns
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Manifest { patterns }
    }

    /// Read a manifest from disk.
    ///
    /// Any open or read failure is reported as `ManifestUnreadable`.
    pub fn read(path: &Path) -> Result<Self> {
        let unreadable = |source| RiffError::ManifestUnreadable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unreadable)?;
        let manifest = Self::from_reader(BufReader::new(file)).map_err(unreadable)?;

        debug!(
            path = %path.display(),
            patterns = manifest.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Parse manifest text held in memory
    pub fn parse(text: &str) -> Self {
        let patterns = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Pattern::from)
            .collect();
        Manifest { patterns }
    }

    fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut patterns = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if !line.trim().is_empty() {
                patterns.push(Pattern::new(line));
            }
        }
        Ok(Manifest { patterns })
    }

    /// Patterns in file order
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if the manifest has no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}
