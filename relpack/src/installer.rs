//! Installer build through the WiX v3 toolset.
//!
//! `candle` compiles the package definition, which includes the generated
//! manifest, into an object file; `light` links that object into the final
//! package.

use crate::command::{CommandExecutor, run_checked};
use crate::config::InstallerSettings;
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};

/// Extension of candle's object output.
pub const OBJECT_EXTENSION: &str = "wixobj";

/// Extension light gives the package when no output path is configured.
pub const PACKAGE_EXTENSION: &str = "msi";

/// The candle/light pair for one package definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WixToolset {
    candle: Utf8PathBuf,
    light: Utf8PathBuf,
    definition: Utf8PathBuf,
    extensions: Vec<String>,
    output: Option<Utf8PathBuf>,
}

impl WixToolset {
    /// Locate the tools under `<wix_dir>/bin`.
    #[must_use]
    pub fn from_settings(settings: &InstallerSettings) -> Self {
        let bin = settings.wix_dir.join("bin");
        Self {
            candle: bin.join("candle.exe"),
            light: bin.join("light.exe"),
            definition: settings.definition.clone(),
            extensions: settings.extensions.clone(),
            output: settings.output.clone(),
        }
    }

    /// Path to the candle executable.
    #[must_use]
    pub fn candle(&self) -> &Utf8Path {
        &self.candle
    }

    /// Path to the light executable.
    #[must_use]
    pub fn light(&self) -> &Utf8Path {
        &self.light
    }

    /// The object file candle writes, beside the definition.
    #[must_use]
    pub fn object_path(&self) -> Utf8PathBuf {
        self.definition.with_extension(OBJECT_EXTENSION)
    }

    /// The package light produces.
    ///
    /// Without a configured output light names the package after the object
    /// file and writes it to the working directory.
    #[must_use]
    pub fn package_path(&self) -> Utf8PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let stem = self.definition.file_stem().unwrap_or("package");
                Utf8PathBuf::from(format!("{stem}.{PACKAGE_EXTENSION}"))
            }
        }
    }

    /// Arguments for the compile step.
    #[must_use]
    pub fn candle_args(&self) -> Vec<String> {
        vec![
            "-out".to_owned(),
            self.object_path().into_string(),
            self.definition.to_string(),
        ]
    }

    /// Arguments for the link step.
    #[must_use]
    pub fn light_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.extensions.len() * 2 + 3);
        for ext in &self.extensions {
            args.push("-ext".to_owned());
            args.push(ext.clone());
        }
        if let Some(output) = &self.output {
            args.push("-out".to_owned());
            args.push(output.to_string());
        }
        args.push(self.object_path().into_string());
        args
    }

    /// Compile the package definition, returning the object path.
    ///
    /// # Errors
    ///
    /// Returns the executor's error when candle cannot run or exits non-zero.
    pub fn compile(&self, executor: &dyn CommandExecutor) -> Result<Utf8PathBuf> {
        log::info!("compiling {}", self.definition);
        let args = self.candle_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_checked(executor, self.candle.as_str(), &args)?;
        Ok(self.object_path())
    }

    /// Link the compiled object, returning the package path.
    ///
    /// # Errors
    ///
    /// Returns the executor's error when light cannot run or exits non-zero.
    pub fn link(&self, executor: &dyn CommandExecutor) -> Result<Utf8PathBuf> {
        log::info!("linking {}", self.object_path());
        let args = self.light_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_checked(executor, self.light.as_str(), &args)?;
        Ok(self.package_path())
    }
}
