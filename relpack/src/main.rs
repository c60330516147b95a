//! relpack CLI entrypoint.
//!
//! This binary packages a Windows release: it builds the application,
//! collects and stages its runtime libraries, regenerates the WiX include
//! file, and links the installer.

use clap::Parser;
use relpack::builder::Toolchain;
use relpack::cli::Cli;
use relpack::command::SystemCommandExecutor;
use relpack::config::load_config;
use relpack::error::Result;
use relpack::output::write_stderr_line;
use relpack::pipeline::{PipelineContext, PipelineReport, run as run_pipeline};
use std::io::Write;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result.map(|_| ()), &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<PipelineReport> {
    let config = load_config()?;
    let toolchain = Toolchain::from_settings(&config.toolchain)?;
    let executor = SystemCommandExecutor::with_timeout(config.tool_timeout());

    let context = PipelineContext {
        config: &config,
        mode: cli.mode(),
        toolchain: &toolchain,
        executor: &executor,
        quiet: false,
    };
    run_pipeline(&context, stderr)
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relpack::error::PackagerError;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = PackagerError::BinaryNotFound {
            path: "../target/release/examples/keyboard_color.exe".into(),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("binary does not exist"));
        assert!(stderr_text.contains("keyboard_color.exe"));
    }
}
