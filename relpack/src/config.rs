//! Packaging configuration.
//!
//! Every path, tool, and target the pipeline touches lives in
//! [`PackagingConfig`]. Defaults describe the stock MinGW32 + WiX v3 layout;
//! an optional TOML file overrides individual keys:
//!
//! ```toml
//! [build]
//! targets = ["examples/keyboard_color.exe", "keyboard_tool.exe"]
//!
//! [dependencies]
//! runtime_subdir = 'mingw64\bin'
//! ```
//!
//! The file is `relpack.toml` in the working directory, or the path named by
//! `RELPACK_CONFIG`.

use crate::error::{PackagerError, Result};
use crate::extractor::DEFAULT_SKIPPED_WARN_RATIO;
use crate::manifest::ManifestSettings;
use crate::target::BinaryTarget;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "RELPACK_CONFIG";

/// Configuration file consulted when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "relpack.toml";

/// Cargo profile selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Unoptimised build in `target/debug`.
    Debug,
    /// Optimised build in `target/release`.
    #[default]
    Release,
}

impl BuildMode {
    /// Select the mode from the `--debug` flag.
    #[must_use]
    pub const fn from_debug_flag(debug: bool) -> Self {
        if debug { Self::Debug } else { Self::Release }
    }

    /// The build-output subdirectory cargo writes to.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Toolchain manager settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSettings {
    /// Explicit rustup executable; derived from the user profile when unset.
    pub rustup: Option<Utf8PathBuf>,
    /// Toolchain passed to `rustup run`.
    pub channel: String,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            rustup: None,
            channel: "stable-i686-pc-windows-gnu".to_owned(),
        }
    }
}

/// Compile step settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    /// Cargo's target directory, relative to the working directory.
    pub target_root: Utf8PathBuf,
    /// Cargo arguments before the profile flag.
    pub cargo_args: Vec<String>,
    /// Binaries to package, relative to `<target_root>/<debug|release>`.
    pub targets: Vec<Utf8PathBuf>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            target_root: Utf8PathBuf::from("../target"),
            cargo_args: vec!["build".to_owned(), "--examples".to_owned()],
            targets: vec![Utf8PathBuf::from("examples/keyboard_color.exe")],
        }
    }
}

/// Dependency walker settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DependencySettings {
    /// The dependency walker executable.
    pub walker: String,
    /// Runtime directory whose libraries are redistributed.
    pub runtime_subdir: String,
    /// Skipped-line ratio above which a format-drift warning is logged.
    pub skipped_warn_ratio: f64,
}

impl Default for DependencySettings {
    fn default() -> Self {
        Self {
            walker: "ntldd.exe".to_owned(),
            runtime_subdir: r"mingw32\bin".to_owned(),
            skipped_warn_ratio: DEFAULT_SKIPPED_WARN_RATIO,
        }
    }
}

/// Staging directory settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingSettings {
    /// Staging directory, relative to the working directory.
    pub dir: Utf8PathBuf,
    /// The strip executable.
    pub strip: String,
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from("out"),
            strip: "strip.exe".to_owned(),
        }
    }
}

/// Generated manifest settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestFileSettings {
    /// Output path of the include file.
    pub path: Utf8PathBuf,
    /// Disk identifier written on every entry.
    pub disk_id: String,
}

impl Default for ManifestFileSettings {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("libraries.wxi"),
            disk_id: "1".to_owned(),
        }
    }
}

/// Installer toolkit settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerSettings {
    /// WiX installation directory; tools live in its `bin` subdirectory.
    pub wix_dir: Utf8PathBuf,
    /// The package definition (`.wxs`) compiled by candle.
    pub definition: Utf8PathBuf,
    /// Extensions passed to light with `-ext`.
    pub extensions: Vec<String>,
    /// Package path passed to light with `-out`; light's default when unset.
    pub output: Option<Utf8PathBuf>,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            wix_dir: Utf8PathBuf::from("C:/Program Files (x86)/WiX Toolset v3.11"),
            definition: Utf8PathBuf::from("keyboard-configurator.wxs"),
            extensions: vec!["WixUIExtension".to_owned()],
            output: None,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagingConfig {
    /// Toolchain manager settings.
    pub toolchain: ToolchainSettings,
    /// Compile step settings.
    pub build: BuildSettings,
    /// Dependency walker settings.
    pub dependencies: DependencySettings,
    /// Staging directory settings.
    pub staging: StagingSettings,
    /// Generated manifest settings.
    pub manifest: ManifestFileSettings,
    /// Installer toolkit settings.
    pub installer: InstallerSettings,
    /// Wall-clock limit for each external tool, in seconds.
    pub tool_timeout_secs: Option<u64>,
}

impl PackagingConfig {
    /// Parse a configuration file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ConfigParse`] for invalid TOML or unknown keys.
    pub fn from_toml_str(contents: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PackagerError::ConfigParse {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// The binaries to package for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::NoTargets`] when the target list is empty.
    pub fn binary_targets(&self, mode: BuildMode) -> Result<Vec<BinaryTarget>> {
        if self.build.targets.is_empty() {
            return Err(PackagerError::NoTargets);
        }
        let root = self.build.target_root.join(mode.dir_name());
        Ok(self
            .build
            .targets
            .iter()
            .map(|t| BinaryTarget::new(root.join(t)))
            .collect())
    }

    /// The per-tool timeout, if configured.
    #[must_use]
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    /// Settings shared by all manifest entries.
    #[must_use]
    pub fn manifest_settings(&self) -> ManifestSettings {
        ManifestSettings {
            disk_id: self.manifest.disk_id.clone(),
            staging_dir_name: self.staging.dir.as_str().replace('\\', "/"),
        }
    }
}

/// Load the configuration using `env` for variable lookup.
///
/// An explicitly named file must exist; the default file is optional.
///
/// # Errors
///
/// Returns [`PackagerError::ConfigRead`] or [`PackagerError::ConfigParse`].
pub fn load_config_with<F>(env: F) -> Result<PackagingConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let (path, required) = match env(CONFIG_ENV) {
        Some(explicit) => (Utf8PathBuf::from(explicit), true),
        None => (Utf8PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !required && !path.exists() {
        log::debug!("no {path}; using built-in defaults");
        return Ok(PackagingConfig::default());
    }

    let contents =
        std::fs::read_to_string(&path).map_err(|source| PackagerError::ConfigRead {
            path: path.clone(),
            source,
        })?;
    log::debug!("loaded configuration from {path}");
    PackagingConfig::from_toml_str(&contents, &path)
}

/// Load the configuration from the process environment.
///
/// # Errors
///
/// See [`load_config_with`].
pub fn load_config() -> Result<PackagingConfig> {
    load_config_with(|name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::release(false, BuildMode::Release, "release")]
    #[case::debug(true, BuildMode::Debug, "debug")]
    fn build_mode_from_flag(#[case] debug: bool, #[case] mode: BuildMode, #[case] dir: &str) {
        assert_eq!(BuildMode::from_debug_flag(debug), mode);
        assert_eq!(mode.dir_name(), dir);
    }

    #[test]
    fn defaults_describe_stock_layout() {
        let config = PackagingConfig::default();
        assert_eq!(config.toolchain.channel, "stable-i686-pc-windows-gnu");
        assert_eq!(config.dependencies.walker, "ntldd.exe");
        assert_eq!(config.dependencies.runtime_subdir, r"mingw32\bin");
        assert_eq!(config.staging.dir, Utf8PathBuf::from("out"));
        assert_eq!(config.manifest.path, Utf8PathBuf::from("libraries.wxi"));
        assert_eq!(config.installer.extensions, vec!["WixUIExtension"]);
        assert!(config.tool_timeout().is_none());
    }

    #[rstest]
    #[case::release(BuildMode::Release, "../target/release/examples/keyboard_color.exe")]
    #[case::debug(BuildMode::Debug, "../target/debug/examples/keyboard_color.exe")]
    fn targets_live_under_mode_directory(#[case] mode: BuildMode, #[case] expected: &str) {
        let targets = PackagingConfig::default()
            .binary_targets(mode)
            .expect("default targets");
        assert_eq!(targets, vec![BinaryTarget::from(expected)]);
    }

    #[test]
    fn empty_target_list_is_rejected() {
        let mut config = PackagingConfig::default();
        config.build.targets.clear();
        let err = config
            .binary_targets(BuildMode::Release)
            .expect_err("no targets");
        assert!(matches!(err, PackagerError::NoTargets));
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let toml = r#"
tool_timeout_secs = 600

[dependencies]
runtime_subdir = 'mingw64\bin'

[build]
targets = ["a.exe", "b.exe"]
"#;
        let config =
            PackagingConfig::from_toml_str(toml, Utf8Path::new("relpack.toml")).expect("parse");

        assert_eq!(config.dependencies.runtime_subdir, r"mingw64\bin");
        assert_eq!(config.dependencies.walker, "ntldd.exe");
        assert_eq!(config.build.targets.len(), 2);
        assert_eq!(config.build.target_root, Utf8PathBuf::from("../target"));
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = "[staging]\ndirectory = 'x'\n";
        let err = PackagingConfig::from_toml_str(toml, Utf8Path::new("c.toml"))
            .expect_err("unknown key");
        assert!(matches!(err, PackagerError::ConfigParse { .. }));
    }

    #[test]
    fn manifest_settings_use_forward_slashes() {
        let mut config = PackagingConfig::default();
        config.staging.dir = Utf8PathBuf::from(r"build\out");
        assert_eq!(config.manifest_settings().staging_dir_name, "build/out");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        let missing = missing.to_str().expect("utf-8 path").to_owned();
        let err = load_config_with(|name| (name == CONFIG_ENV).then(|| missing.clone()))
            .expect_err("explicit file must exist");
        assert!(matches!(err, PackagerError::ConfigRead { .. }));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("pack.toml");
        std::fs::write(&path, "[staging]\nstrip = 'i686-w64-mingw32-strip'\n").expect("write");
        let path = path.to_str().expect("utf-8 path").to_owned();

        let config =
            load_config_with(|name| (name == CONFIG_ENV).then(|| path.clone())).expect("load");
        assert_eq!(config.staging.strip, "i686-w64-mingw32-strip");
    }

    #[test]
    fn load_config_reads_process_environment() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("env.toml");
        std::fs::write(&path, "[manifest]\ndisk_id = '7'\n").expect("write");

        let config = temp_env::with_var(CONFIG_ENV, Some(path.as_os_str()), load_config)
            .expect("load");
        assert_eq!(config.manifest.disk_id, "7");
    }
}
