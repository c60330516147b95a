//! Staging of stripped binaries and runtime libraries.
//!
//! The staging directory holds exactly the files one installer build
//! bundles. It is deleted and recreated at the start of every run, so a
//! [`StagingDirectory`] can only be obtained through
//! [`StagingDirectory::recreate`].

use crate::closure::{DependencyClosure, DependencyRecord};
use crate::command::{CommandExecutor, run_checked};
use crate::error::{PackagerError, Result};
use crate::target::BinaryTarget;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;

/// A freshly created, writable staging directory.
#[derive(Debug)]
pub struct StagingDirectory {
    path: Utf8PathBuf,
}

impl StagingDirectory {
    /// Remove `path` if it exists, create it empty, and verify it is writable.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::TargetNotWritable`] when an existing directory
    /// is read-only or the new one rejects writes, and
    /// [`PackagerError::StagingFailed`] when the old directory cannot be
    /// removed or the new one created.
    pub fn recreate(path: &Utf8Path) -> Result<Self> {
        if path.exists() {
            let metadata = fs::metadata(path).map_err(|e| PackagerError::StagingFailed {
                reason: format!("failed to inspect {path}: {e}"),
            })?;
            if metadata.permissions().readonly() {
                return Err(PackagerError::TargetNotWritable {
                    path: path.to_owned(),
                    reason: "directory is read-only".to_owned(),
                });
            }

            fs::remove_dir_all(path).map_err(|e| PackagerError::StagingFailed {
                reason: format!("failed to remove {path}: {e}"),
            })?;
        }

        fs::create_dir_all(path).map_err(|e| PackagerError::StagingFailed {
            reason: format!("failed to create {path}: {e}"),
        })?;

        // Verify writability by attempting to create a temp file
        let marker = path.join(".relpack-write-test");
        match fs::write(&marker, b"test") {
            Ok(()) => {
                let _ = fs::remove_file(&marker);
            }
            Err(e) => {
                return Err(PackagerError::TargetNotWritable {
                    path: path.to_owned(),
                    reason: e.to_string(),
                });
            }
        }

        Ok(Self {
            path: path.to_owned(),
        })
    }

    /// The directory's location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Destination inside the directory for a file called `file_name`.
    #[must_use]
    pub fn destination(&self, file_name: &str) -> Utf8PathBuf {
        self.path.join(file_name)
    }
}

/// Files written into the staging directory by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifacts {
    /// The staging directory.
    pub directory: Utf8PathBuf,
    /// Stripped copies of the target binaries.
    pub binaries: Vec<Utf8PathBuf>,
    /// Copied runtime libraries.
    pub libraries: Vec<Utf8PathBuf>,
}

impl StagedArtifacts {
    /// Total number of staged files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.binaries.len() + self.libraries.len()
    }
}

/// Populates the staging directory using an external strip tool.
pub struct Stager<'a> {
    executor: &'a dyn CommandExecutor,
    strip: String,
    staging_dir: Utf8PathBuf,
}

impl<'a> Stager<'a> {
    /// Create a stager writing into `staging_dir` with the `strip` tool.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        strip: impl Into<String>,
        staging_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            executor,
            strip: strip.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Return the staging directory path.
    #[must_use]
    pub fn staging_path(&self) -> &Utf8Path {
        &self.staging_dir
    }

    /// Recreate the staging directory.
    ///
    /// # Errors
    ///
    /// See [`StagingDirectory::recreate`].
    pub fn prepare(&self) -> Result<StagingDirectory> {
        StagingDirectory::recreate(&self.staging_dir)
    }

    /// Write a debug-symbol-stripped copy of `target` into `dir`.
    ///
    /// # Errors
    ///
    /// Returns the executor's error when strip fails, and
    /// [`PackagerError::StagingFailed`] when strip exits successfully without
    /// producing the output file.
    pub fn strip_binary(
        &self,
        dir: &StagingDirectory,
        target: &BinaryTarget,
    ) -> Result<Utf8PathBuf> {
        let dest = dir.destination(target.file_name());
        log::info!("strip {target} -> {dest}");

        run_checked(
            self.executor,
            &self.strip,
            &["-o", dest.as_str(), target.path().as_str()],
        )?;

        if !dest.exists() {
            return Err(PackagerError::StagingFailed {
                reason: format!("{} reported success but {dest} was not written", self.strip),
            });
        }
        Ok(dest)
    }

    /// Copy one dependency library into `dir` under its own filename.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::CopyFailed`] when the copy fails.
    pub fn copy_library(
        &self,
        dir: &StagingDirectory,
        record: &DependencyRecord,
    ) -> Result<Utf8PathBuf> {
        let dest = dir.destination(record.library_file_name());
        log::info!("copy {} -> {dest}", record.source_path());

        fs::copy(record.source_path(), &dest).map_err(|source| PackagerError::CopyFailed {
            from: record.source_path().to_owned(),
            to: dest.clone(),
            source,
        })?;
        Ok(dest)
    }

    /// Recreate the staging directory, strip every target into it, and copy
    /// every closure library into it.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] before touching the directory
    /// when two staged files would share a name. Otherwise returns the first
    /// failure; files staged before it remain on disk.
    pub fn stage(
        &self,
        targets: &[BinaryTarget],
        closure: &DependencyClosure,
    ) -> Result<StagedArtifacts> {
        check_unique_names(targets, closure)?;
        let dir = self.prepare()?;

        let binaries = targets
            .iter()
            .map(|target| self.strip_binary(&dir, target))
            .collect::<Result<Vec<_>>>()?;

        let libraries = closure
            .iter()
            .map(|record| self.copy_library(&dir, record))
            .collect::<Result<Vec<_>>>()?;

        Ok(StagedArtifacts {
            directory: dir.path().to_owned(),
            binaries,
            libraries,
        })
    }
}

/// Staged names are compared without ASCII case, as on the target system.
fn check_unique_names(targets: &[BinaryTarget], closure: &DependencyClosure) -> Result<()> {
    let mut claimed: HashMap<String, String> = HashMap::new();
    let names = targets
        .iter()
        .map(|target| (target.file_name(), target.path().as_str()))
        .chain(
            closure
                .iter()
                .map(|record| (record.library_file_name(), record.source_path().as_str())),
        );

    for (name, source) in names {
        if let Some(first) = claimed.insert(name.to_ascii_lowercase(), source.to_owned()) {
            return Err(PackagerError::StagingFailed {
                reason: format!("{first} and {source} would both be staged as {name}"),
            });
        }
    }
    Ok(())
}
