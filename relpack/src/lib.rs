//! relpack library.
//!
//! This crate provides the steps of a Windows release build: compiling the
//! application, collecting the MinGW runtime libraries its binaries load,
//! staging stripped binaries with those libraries, generating the WiX
//! include file that lists them, and building the installer. It is used by
//! the `relpack` CLI binary and can be driven programmatically with a
//! substitute [`command::CommandExecutor`].
//!
//! # Modules
//!
//! - [`builder`] - Toolchain resolution and the cargo build step
//! - [`cli`] - Command-line argument definitions
//! - [`closure`] - Deduplicated union of per-binary dependencies
//! - [`command`] - External command execution
//! - [`config`] - Packaging configuration and its loader
//! - [`error`] - Error types for every pipeline step
//! - [`extractor`] - Dependency-walker invocation and output parsing
//! - [`identifier`] - Installer component identifiers for library names
//! - [`installer`] - The candle/light installer build
//! - [`manifest`] - WiX include-file generation
//! - [`output`] - Progress and summary text
//! - [`pipeline`] - Step sequencing for one packaging run
//! - [`stager`] - Staging directory lifecycle, strip, and copy
//! - [`target`] - Binaries selected for packaging

pub mod builder;
pub mod cli;
pub mod closure;
pub mod command;
pub mod config;
pub mod error;
pub mod extractor;
pub mod identifier;
pub mod installer;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod stager;
pub mod target;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
