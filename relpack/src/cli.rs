//! CLI argument definitions for relpack.
//!
//! Everything other than the build profile comes from the configuration
//! file, so the command line carries a single flag.

use crate::config::BuildMode;
use clap::Parser;

/// Build, stage, and package a Windows release.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "relpack")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build, stage, and package a Windows release.\n\n",
    "relpack compiles the application with the MinGW toolchain, walks each ",
    "configured binary for the runtime DLLs it loads, strips the binaries ",
    "into the staging directory alongside those DLLs, regenerates the WiX ",
    "include file listing them, and runs candle and light.\n\n",
    "Settings are read from relpack.toml in the working directory, or from ",
    "the file named by RELPACK_CONFIG. Logging follows RUST_LOG.",
))]
pub struct Cli {
    /// Package the debug profile instead of release.
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// The build mode selected by the flags.
    #[must_use]
    pub const fn mode(&self) -> BuildMode {
        BuildMode::from_debug_flag(self.debug)
    }
}
