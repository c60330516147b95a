//! Cargo build orchestration through rustup.
//!
//! The application is compiled with `rustup run <channel> cargo build ...`
//! so the packaged binaries always come from the pinned GNU toolchain,
//! regardless of the user's default.

use crate::command::{CommandExecutor, run_checked};
use crate::config::{BuildMode, BuildSettings, ToolchainSettings};
use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// User-profile variable consulted first when locating rustup.
pub const PROFILE_ENV: &str = "HOMEPATH";

/// User-profile variable consulted when [`PROFILE_ENV`] is unset.
pub const PROFILE_ENV_FALLBACK: &str = "USERPROFILE";

/// The rustup installation inside a user profile directory.
#[must_use]
pub fn default_rustup_path(profile_dir: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(profile_dir)
        .join(".cargo")
        .join("bin")
        .join("rustup.exe")
}

/// A rustup executable and the channel it runs cargo under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    rustup: Utf8PathBuf,
    channel: String,
}

impl Toolchain {
    /// Create a toolchain from explicit parts.
    #[must_use]
    pub fn new(rustup: impl Into<Utf8PathBuf>, channel: impl Into<String>) -> Self {
        Self {
            rustup: rustup.into(),
            channel: channel.into(),
        }
    }

    /// Resolve the toolchain from settings, using `env` to find the profile
    /// directory when no rustup path is configured.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ProfileDirUnset`] when rustup must be derived
    /// and neither profile variable is set.
    pub fn from_settings_with<F>(settings: &ToolchainSettings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rustup = match &settings.rustup {
            Some(explicit) => explicit.clone(),
            None => {
                let profile = env(PROFILE_ENV)
                    .or_else(|| env(PROFILE_ENV_FALLBACK))
                    .filter(|dir| !dir.is_empty())
                    .ok_or(PackagerError::ProfileDirUnset {
                        primary: PROFILE_ENV,
                        fallback: PROFILE_ENV_FALLBACK,
                    })?;
                default_rustup_path(&profile)
            }
        };

        Ok(Self::new(rustup, settings.channel.clone()))
    }

    /// Resolve the toolchain from settings and the process environment.
    ///
    /// # Errors
    ///
    /// See [`Toolchain::from_settings_with`].
    pub fn from_settings(settings: &ToolchainSettings) -> Result<Self> {
        Self::from_settings_with(settings, |name| std::env::var(name).ok())
    }

    /// Path to the rustup executable.
    #[must_use]
    pub fn rustup(&self) -> &Utf8Path {
        &self.rustup
    }

    /// Return the channel string for `rustup run <channel>` invocations.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Builder for compiling the application.
pub struct Builder {
    toolchain: Toolchain,
    cargo_args: Vec<String>,
    mode: BuildMode,
}

impl Builder {
    /// Create a new builder for `mode`.
    #[must_use]
    pub fn new(toolchain: Toolchain, settings: &BuildSettings, mode: BuildMode) -> Self {
        Self {
            toolchain,
            cargo_args: settings.cargo_args.clone(),
            mode,
        }
    }

    /// The full argument list passed to rustup.
    #[must_use]
    pub fn rustup_args(&self) -> Vec<&str> {
        let mut args = vec!["run", self.toolchain.channel(), "cargo"];
        args.extend(self.cargo_args.iter().map(String::as_str));
        if self.mode == BuildMode::Release {
            args.push("--release");
        }
        args
    }

    /// Run the build and wait for it to finish, returning cargo's captured
    /// diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error if rustup cannot be started or cargo exits non-zero.
    pub fn build(&self, executor: &dyn CommandExecutor) -> Result<String> {
        let rustup = self.toolchain.rustup().as_str();
        log::info!(
            "building ({}) with toolchain {}",
            self.mode,
            self.toolchain.channel()
        );

        let output = run_checked(executor, rustup, &self.rustup_args())?;
        let diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in diagnostics.lines() {
            log::debug!("cargo: {line}");
        }
        Ok(diagnostics)
    }
}
