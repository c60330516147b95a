//! Runtime library discovery using the `ntldd` dependency walker.
//!
//! `ntldd -R` prints the full dependency tree of a PE binary, one resolved
//! library per line:
//!
//! ```text
//!     libgcc_s_dw2-1.dll => C:\msys64\mingw32\bin\libgcc_s_dw2-1.dll (0x6e940000)
//!     KERNEL32.dll => C:\Windows\SYSTEM32\KERNEL32.dll (0x76d20000)
//!     libmissing.dll => not found
//! ```
//!
//! Only libraries under the redistributable runtime directory (for example
//! `mingw32\bin`) are captured. System libraries fall outside the pattern and
//! are treated as present on every target machine.

use crate::closure::DependencyRecord;
use crate::command::{CommandExecutor, run_checked};
use crate::error::{PackagerError, Result};
use crate::target::BinaryTarget;
use regex::Regex;
use std::collections::HashSet;

/// Source of the runtime libraries one binary needs.
#[cfg_attr(test, mockall::automock)]
pub trait DependencyExtractor {
    /// Report every tracked runtime library `target` depends on, transitively.
    ///
    /// # Errors
    ///
    /// Returns an error when the binary is missing or cannot be analysed.
    fn extract(&self, target: &BinaryTarget) -> Result<Vec<DependencyRecord>>;
}

/// A compiled pattern matching walker lines under one runtime directory.
#[derive(Debug, Clone)]
pub struct RuntimeLibraryPattern {
    subdir: String,
    resolved: Regex,
}

impl RuntimeLibraryPattern {
    /// Compile the pattern for `subdir`, a relative directory such as
    /// `mingw32\bin`. Either slash direction is accepted, in the configuration
    /// and in the walker output.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidRuntimeDir`] when `subdir` has no path
    /// components.
    pub fn new(subdir: &str) -> Result<Self> {
        let segments: Vec<String> = subdir
            .split(['\\', '/'])
            .filter(|segment| !segment.is_empty())
            .map(regex::escape)
            .collect();

        if segments.is_empty() {
            return Err(PackagerError::InvalidRuntimeDir {
                subdir: subdir.to_owned(),
                reason: "no path components".to_owned(),
            });
        }

        let pattern = format!(
            r"(?i)=>\s*(.*[\\/]{}[\\/]([^\\/\s]+\.dll))",
            segments.join(r"[\\/]")
        );
        let resolved = Regex::new(&pattern).map_err(|e| PackagerError::InvalidRuntimeDir {
            subdir: subdir.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            subdir: subdir.to_owned(),
            resolved,
        })
    }

    /// The runtime directory this pattern was built for.
    #[must_use]
    pub fn subdir(&self) -> &str {
        &self.subdir
    }

    /// Match one walker line, returning the record it denotes.
    #[must_use]
    pub fn match_line(&self, line: &str) -> Option<DependencyRecord> {
        let captures = self.resolved.captures(line)?;
        let source = captures.get(1)?.as_str().trim();
        let name = captures.get(2)?.as_str();
        Some(DependencyRecord::new(source, name))
    }
}

/// Outcome of parsing one walker run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Distinct tracked libraries, in order of first appearance.
    pub records: Vec<DependencyRecord>,
    /// Non-blank lines that matched the tracked pattern.
    pub matched: usize,
    /// Non-blank lines that did not match.
    pub skipped: usize,
    /// Libraries the walker could not locate at all.
    pub unresolved: Vec<String>,
}

impl ExtractionReport {
    /// Fraction of non-blank lines that did not match, or `0.0` for empty
    /// output.
    #[must_use]
    pub fn skipped_ratio(&self) -> f64 {
        let total = self.matched + self.skipped;
        if total == 0 {
            return 0.0;
        }
        self.skipped as f64 / total as f64
    }

    /// Whether enough lines were skipped to suggest the walker's output
    /// format has changed. The ratio must be strictly exceeded.
    #[must_use]
    pub fn exceeds_skip_ratio(&self, ratio: f64) -> bool {
        self.skipped > 0 && self.skipped_ratio() > ratio
    }
}

/// Parse the textual output of `ntldd -R`.
///
/// Lines that do not denote a library in the tracked directory are skipped
/// and counted. A library reported under several parents appears once.
#[must_use]
pub fn parse_walker_output(output: &str, pattern: &RuntimeLibraryPattern) -> ExtractionReport {
    let mut report = ExtractionReport::default();
    let mut seen = HashSet::new();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        match pattern.match_line(line) {
            Some(record) => {
                report.matched += 1;
                if seen.insert(record.library_file_name().to_ascii_lowercase()) {
                    log::trace!("tracked: {}", record.source_path());
                    report.records.push(record);
                }
            }
            None => {
                report.skipped += 1;
                if let Some(name) = unresolved_library(line) {
                    report.unresolved.push(name.to_owned());
                }
                log::trace!("skipped: {}", line.trim());
            }
        }
    }

    report
}

/// Extract the library name from a `name => not found` line.
fn unresolved_library(line: &str) -> Option<&str> {
    let (name, target) = line.split_once("=>")?;
    if target.trim().eq_ignore_ascii_case("not found") {
        Some(name.trim())
    } else {
        None
    }
}

/// Default ratio of skipped lines above which a warning is logged.
pub const DEFAULT_SKIPPED_WARN_RATIO: f64 = 0.98;

/// [`DependencyExtractor`] backed by the `ntldd` command-line tool.
pub struct NtlddExtractor<'a> {
    executor: &'a dyn CommandExecutor,
    walker: String,
    pattern: RuntimeLibraryPattern,
    skipped_warn_ratio: f64,
}

impl<'a> NtlddExtractor<'a> {
    /// Create an extractor that runs `walker` through `executor`.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        walker: impl Into<String>,
        pattern: RuntimeLibraryPattern,
    ) -> Self {
        Self {
            executor,
            walker: walker.into(),
            pattern,
            skipped_warn_ratio: DEFAULT_SKIPPED_WARN_RATIO,
        }
    }

    /// Override the skipped-line ratio that triggers a format-drift warning.
    #[must_use]
    pub fn with_skipped_warn_ratio(mut self, ratio: f64) -> Self {
        self.skipped_warn_ratio = ratio;
        self
    }

    /// Whether `report` should raise the format-drift warning.
    #[must_use]
    pub fn reports_format_drift(&self, report: &ExtractionReport) -> bool {
        report.exceeds_skip_ratio(self.skipped_warn_ratio)
    }

    /// Run the walker and return the full parse report.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::BinaryNotFound`] when the binary is missing,
    /// or the executor's error when the walker cannot run or exits non-zero.
    pub fn analyse(&self, target: &BinaryTarget) -> Result<ExtractionReport> {
        if !target.path().exists() {
            return Err(PackagerError::BinaryNotFound {
                path: target.path().to_owned(),
            });
        }

        let output = run_checked(self.executor, &self.walker, &["-R", target.path().as_str()])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = parse_walker_output(&stdout, &self.pattern);

        for name in &report.unresolved {
            log::warn!("{target}: {} could not resolve {name}", self.walker);
        }
        if self.reports_format_drift(&report) {
            log::warn!(
                "{target}: {} of {} walker lines lie outside {}; check the walker output format",
                report.skipped,
                report.matched + report.skipped,
                self.pattern.subdir()
            );
        }

        Ok(report)
    }
}

impl DependencyExtractor for NtlddExtractor<'_> {
    fn extract(&self, target: &BinaryTarget) -> Result<Vec<DependencyRecord>> {
        self.analyse(target).map(|report| report.records)
    }
}
