//! Error types for the relpack packaging pipeline.
//!
//! Every pipeline step reports failure through [`PackagerError`]. Variants
//! carry enough context (tool name, path, offending library) for the user to
//! diagnose the failing step from the single line printed on exit.

use crate::identifier::ComponentId;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging a release.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// An external tool could not be started (missing executable, bad path).
    #[error("failed to run {tool}: {source}")]
    ToolSpawn {
        /// The program that was being started.
        tool: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        /// The program that failed.
        tool: String,
        /// Human-readable exit status.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// An external tool did not finish within the configured timeout.
    #[error("{tool} timed out after {seconds} seconds")]
    ToolTimedOut {
        /// The program that was killed.
        tool: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// A binary named in the target list does not exist.
    #[error("binary does not exist: {path}")]
    BinaryNotFound {
        /// Path that was expected to hold the binary.
        path: Utf8PathBuf,
    },

    /// The configuration names no binaries to package.
    #[error("no binary targets configured")]
    NoTargets,

    /// The user-profile environment variable used to locate rustup is unset.
    #[error("cannot locate rustup: neither {primary} nor {fallback} is set")]
    ProfileDirUnset {
        /// The variable consulted first.
        primary: &'static str,
        /// The variable consulted when the first is absent.
        fallback: &'static str,
    },

    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::PackagingConfig`].
    #[error("invalid config file {path}: {reason}")]
    ConfigParse {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The runtime-library subdirectory cannot be turned into a match pattern.
    #[error("invalid runtime library directory {subdir:?}: {reason}")]
    InvalidRuntimeDir {
        /// The configured subdirectory.
        subdir: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two distinct libraries sanitize to the same component identifier.
    #[error("component identifier {identifier} is shared by {first} and {second}")]
    IdentifierCollision {
        /// The colliding identifier.
        identifier: ComponentId,
        /// The library that claimed the identifier first.
        first: String,
        /// The library that collided with it.
        second: String,
    },

    /// The manifest file could not be written.
    #[error("failed to write manifest {path}: {source}")]
    ManifestWrite {
        /// Destination of the manifest.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The staging directory could not be prepared or populated.
    #[error("staging failed: {reason}")]
    StagingFailed {
        /// Description of the staging failure.
        reason: String,
    },

    /// The staging directory exists but is not writable.
    #[error("staging directory {path} is not writable: {reason}")]
    TargetNotWritable {
        /// Path to the non-writable directory.
        path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// A dependency library could not be copied into the staging directory.
    #[error("failed to copy {from} to {to}: {source}")]
    CopyFailed {
        /// Source library path on the build host.
        from: Utf8PathBuf,
        /// Destination inside the staging directory.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
