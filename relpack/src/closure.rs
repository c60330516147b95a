//! Dependency records and the deduplicated closure across all targets.
//!
//! A [`DependencyClosure`] is keyed by library filename. Windows resolves
//! DLL names without regard to ASCII case, so `LIBX.dll` and `libx.dll` name
//! the same dependency; the first spelling (and source path) seen is kept.

use crate::error::Result;
use crate::extractor::DependencyExtractor;
use crate::target::BinaryTarget;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// One runtime library required by a packaged binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRecord {
    source_path: Utf8PathBuf,
    library_file_name: String,
}

impl DependencyRecord {
    /// Create a record from the library's location on the build host and its
    /// base filename.
    #[must_use]
    pub fn new(source_path: impl Into<Utf8PathBuf>, library_file_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            library_file_name: library_file_name.into(),
        }
    }

    /// Where the library currently lives on the build host.
    #[must_use]
    pub fn source_path(&self) -> &Utf8Path {
        &self.source_path
    }

    /// The library's base filename; used for staging and manifest identity.
    #[must_use]
    pub fn library_file_name(&self) -> &str {
        &self.library_file_name
    }

    fn key(&self) -> String {
        self.library_file_name.to_ascii_lowercase()
    }
}

/// The complete, deduplicated set of libraries needed by all targets.
///
/// Iteration is ordered by case-folded library name, so manifests and
/// staging logs are reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyClosure {
    records: BTreeMap<String, DependencyRecord>,
}

impl DependencyClosure {
    /// Create an empty closure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless a library with the same name is present.
    ///
    /// Returns `true` when the record was new.
    pub fn insert(&mut self, record: DependencyRecord) -> bool {
        match self.records.entry(record.key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(existing) => {
                if existing.get().source_path != record.source_path {
                    log::debug!(
                        "{} already resolved to {}; ignoring {}",
                        record.library_file_name,
                        existing.get().source_path,
                        record.source_path
                    );
                }
                false
            }
        }
    }

    /// Number of distinct libraries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no libraries were resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a library with this filename is part of the closure.
    #[must_use]
    pub fn contains(&self, library_file_name: &str) -> bool {
        self.records
            .contains_key(&library_file_name.to_ascii_lowercase())
    }

    /// Look up a library by filename.
    #[must_use]
    pub fn get(&self, library_file_name: &str) -> Option<&DependencyRecord> {
        self.records.get(&library_file_name.to_ascii_lowercase())
    }

    /// Iterate records in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.records.values()
    }
}

impl Extend<DependencyRecord> for DependencyClosure {
    fn extend<I: IntoIterator<Item = DependencyRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl FromIterator<DependencyRecord> for DependencyClosure {
    fn from_iter<I: IntoIterator<Item = DependencyRecord>>(iter: I) -> Self {
        let mut closure = Self::new();
        closure.extend(iter);
        closure
    }
}

impl<'a> IntoIterator for &'a DependencyClosure {
    type Item = &'a DependencyRecord;
    type IntoIter = std::collections::btree_map::Values<'a, String, DependencyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

/// Run the extractor over every target and union the results.
///
/// # Errors
///
/// Returns the first extraction error; no partial closure is produced.
pub fn build_closure(
    extractor: &dyn DependencyExtractor,
    targets: &[BinaryTarget],
) -> Result<DependencyClosure> {
    let mut closure = DependencyClosure::new();

    for target in targets {
        let records = extractor.extract(target)?;
        let found = records.len();
        let before = closure.len();
        closure.extend(records);
        log::info!(
            "{target}: {found} runtime dependencies, {} new",
            closure.len() - before
        );
    }

    Ok(closure)
}
