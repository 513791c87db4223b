//! `jarshade` CLI entrypoint.
//!
//! Builds shaded jars for the modules of a manifest, or prints their
//! resolved dependency closures.

use clap::Parser;
use env_logger::{Builder, Env};
use jarshade_cli::cli::Cli;
use jarshade_cli::commands::{run, write_stderr_line};
use jarshade_cli::error::Result;
use log::LevelFilter;
use std::error::Error;
use std::io::{self, Write};

/// Environment variable overriding the log filter derived from `-v`/`-q`.
const LOG_ENV: &str = "JARSHADE_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    let quiet = cli.quiet;
    let command = cli.into_command();

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr();
    let run_result = run(&command, quiet, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(level: LevelFilter) {
    let env = Env::new().filter_or(LOG_ENV, level.as_str());
    let installed = Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
    if installed.is_err() {
        // A logger is already installed; keep it.
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, render_error(&err));
            1
        }
    }
}

/// Render `err` with its chain of causes on one line.
fn render_error(err: &dyn Error) -> String {
    let mut message = format!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarshade::ShadeError;
    use jarshade::workspace::WorkspaceError;
    use jarshade_cli::error::CliError;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr: Vec<u8> = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn render_error_appends_causes() {
        let err = CliError::Output(io::Error::other("broken pipe"));
        assert_eq!(
            render_error(&err),
            "error: failed to write output: broken pipe"
        );
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = CliError::Shade(ShadeError::Workspace(WorkspaceError::ModuleNotFound {
            name: "ghost".to_owned(),
        }));

        let mut stderr: Vec<u8> = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert_eq!(
            stderr_text,
            "error: module ghost is not declared in the manifest\n"
        );
    }
}
