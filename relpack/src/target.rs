//! Semantic wrapper for binaries awaiting packaging.
//!
//! This module provides the [`BinaryTarget`] newtype so target paths are not
//! confused with library or staging paths as they flow through the pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// A compiled executable that will be stripped into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryTarget(Utf8PathBuf);

impl BinaryTarget {
    /// Create a new target from its on-disk location.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self(path.into())
    }

    /// The on-disk location of the binary.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.0
    }

    /// The base filename used for the stripped copy.
    ///
    /// Falls back to the whole path for the degenerate case of a path with no
    /// final component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.file_name().unwrap_or(self.0.as_str())
    }
}

impl AsRef<Utf8Path> for BinaryTarget {
    fn as_ref(&self) -> &Utf8Path {
        &self.0
    }
}

impl From<&str> for BinaryTarget {
    fn from(s: &str) -> Self {
        Self(Utf8PathBuf::from(s))
    }
}

impl From<Utf8PathBuf> for BinaryTarget {
    fn from(path: Utf8PathBuf) -> Self {
        Self(path)
    }
}

impl fmt::Display for BinaryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
