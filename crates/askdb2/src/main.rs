#![forbid(unsafe_code)]

use anyhow::Result;
use askdb2::cli::app::{Cli, Command};
use askdb2::cli::commands;
use askdb2::config::{Settings, settings_from_env};
use askdb2::models::{AskCommandFailure, FailureKind};
use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

const DEFAULT_LOG_FILTER: &str = "askdb2=info";

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_tracing();

    let command_name = command_name(&cli.command);
    tracing::info!("askdb2: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            tracing::info!("askdb2: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            eprintln!("askdb2: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Ask(args) => {
            let settings = resolve_settings(&cli)?;
            commands::ask::run(args, &settings)
        }
        Command::Schema(args) => {
            let settings = resolve_settings(&cli)?;
            commands::schema::run(args, &settings)
        }
        Command::Check(args) => {
            let settings = resolve_settings(&cli)?;
            commands::check::run(args, &settings)
        }
        Command::ResponseSchema => commands::response_schema::run(),
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    settings_from_env(&cli.runtime.overrides())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<AskCommandFailure>() {
        Some(failure) if failure.kind() == FailureKind::Validation => EXIT_VALIDATION_FAILURE,
        _ => EXIT_RUNTIME_FAILURE,
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Ask(_) => "ask",
        Command::Schema(_) => "schema",
        Command::Check(_) => "check",
        Command::ResponseSchema => "response-schema",
    }
}
