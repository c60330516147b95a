//! Packaging pipeline orchestration.
//!
//! One run compiles the application, collects the runtime-library closure
//! of the configured binaries, regenerates the manifest, restages the
//! output directory, and builds the installer. Steps run strictly in that
//! order and the first failure stops the run; files written by completed
//! steps are left in place.

use crate::builder::{Builder, Toolchain};
use crate::closure::{DependencyClosure, build_closure};
use crate::command::CommandExecutor;
use crate::config::{BuildMode, PackagingConfig};
use crate::error::Result;
use crate::extractor::{NtlddExtractor, RuntimeLibraryPattern};
use crate::installer::WixToolset;
use crate::manifest::{self, Manifest};
use crate::output::{staged_message, success_message, write_stderr_line};
use crate::stager::{StagedArtifacts, Stager};
use crate::target::BinaryTarget;
use camino::Utf8PathBuf;
use std::io::Write;

/// Context for a packaging run.
pub struct PipelineContext<'a> {
    /// Loaded configuration.
    pub config: &'a PackagingConfig,
    /// Cargo profile to build and package.
    pub mode: BuildMode,
    /// Toolchain used for the compile step.
    pub toolchain: &'a Toolchain,
    /// Runs every external tool.
    pub executor: &'a dyn CommandExecutor,
    /// Suppress progress output.
    pub quiet: bool,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct PipelineReport {
    /// Runtime libraries the targets depend on.
    pub closure: DependencyClosure,
    /// The manifest written for the closure.
    pub manifest: Manifest,
    /// Files placed in the staging directory.
    pub staged: StagedArtifacts,
    /// The installer package light produced.
    pub package: Utf8PathBuf,
}

/// Run every pipeline step in order.
///
/// Prints progress to stderr if not in quiet mode.
///
/// # Errors
///
/// Returns the first step's error; later steps are not attempted.
pub fn run(context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<PipelineReport> {
    let targets = context.config.binary_targets(context.mode)?;

    perform_build(context, stderr)?;
    let closure = collect_dependencies(context, &targets, stderr)?;
    let manifest = write_manifest(context, &closure, stderr)?;
    let staged = stage_files(context, &targets, &closure, stderr)?;
    let package = build_installer(context, stderr)?;

    if !context.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, success_message(&package));
    }

    Ok(PipelineReport {
        closure,
        manifest,
        staged,
        package,
    })
}

/// Compile the application.
///
/// # Errors
///
/// Returns an error if rustup cannot run or cargo fails.
pub fn perform_build(context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<()> {
    if !context.quiet {
        write_stderr_line(
            stderr,
            format!(
                "Building {} binaries with toolchain {}...",
                context.mode,
                context.toolchain.channel()
            ),
        );
    }

    let builder = Builder::new(
        context.toolchain.clone(),
        &context.config.build,
        context.mode,
    );
    let diagnostics = builder.build(context.executor)?;
    if !context.quiet {
        for line in diagnostics.lines() {
            write_stderr_line(stderr, line);
        }
    }
    Ok(())
}

/// Walk every target and union their runtime libraries.
///
/// # Errors
///
/// Returns an error if the runtime directory is invalid or any walk fails.
pub fn collect_dependencies(
    context: &PipelineContext<'_>,
    targets: &[BinaryTarget],
    stderr: &mut dyn Write,
) -> Result<DependencyClosure> {
    let settings = &context.config.dependencies;
    if !context.quiet {
        write_stderr_line(
            stderr,
            format!("Collecting {} dependencies...", settings.runtime_subdir),
        );
    }

    let pattern = RuntimeLibraryPattern::new(&settings.runtime_subdir)?;
    let extractor = NtlddExtractor::new(context.executor, settings.walker.as_str(), pattern)
        .with_skipped_warn_ratio(settings.skipped_warn_ratio);
    build_closure(&extractor, targets)
}

/// Regenerate the manifest for `closure`.
///
/// # Errors
///
/// Returns an error on identifier collision or when the file cannot be
/// written.
pub fn write_manifest(
    context: &PipelineContext<'_>,
    closure: &DependencyClosure,
    stderr: &mut dyn Write,
) -> Result<Manifest> {
    let path = &context.config.manifest.path;
    if !context.quiet {
        write_stderr_line(stderr, format!("Writing {path}..."));
    }

    manifest::emit(closure, path, &context.config.manifest_settings())
}

/// Restage the stripped targets and closure libraries.
///
/// # Errors
///
/// Returns an error if the staging directory cannot be recreated or any file
/// cannot be stripped or copied.
pub fn stage_files(
    context: &PipelineContext<'_>,
    targets: &[BinaryTarget],
    closure: &DependencyClosure,
    stderr: &mut dyn Write,
) -> Result<StagedArtifacts> {
    let settings = &context.config.staging;
    let stager = Stager::new(
        context.executor,
        settings.strip.as_str(),
        settings.dir.clone(),
    );

    if !context.quiet {
        let message = format!("Staging files to {}...", stager.staging_path());
        write_stderr_line(stderr, message);
    }

    let staged = stager.stage(targets, closure)?;

    if !context.quiet {
        let message = staged_message(staged.libraries.len(), &staged.directory);
        write_stderr_line(stderr, message);
    }
    Ok(staged)
}

/// Compile and link the installer package.
///
/// # Errors
///
/// Returns an error if candle or light fails.
pub fn build_installer(
    context: &PipelineContext<'_>,
    stderr: &mut dyn Write,
) -> Result<Utf8PathBuf> {
    let wix = WixToolset::from_settings(&context.config.installer);
    if !context.quiet {
        let message = format!("Building installer {}...", wix.package_path());
        write_stderr_line(stderr, message);
    }

    wix.compile(context.executor)?;
    wix.link(context.executor)
}
