mod commands;

use clap::Parser;
use gapgen_core::domain::GapError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let gap_error = error.as_gap_error();
            eprintln!("{}", gap_error.diagnostic_line());
            if let Some(summary_line) = gap_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            gap_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => match cli.command {
            CliCommand::Generate(args) => commands::run_generate_command(args),
            CliCommand::Validate(args) => commands::run_validate_command(args),
        },
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "gapgen", about = "Gap-triggered cocktail event generator")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Generate a cocktail event stream from a run configuration
    Generate(commands::GenerateArgs),
    /// Validate decay chains and source fractions of a generated stream
    Validate(commands::ValidateArgs),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(GapError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_gap_error(&self) -> GapError {
        match self {
            Self::Usage(message) => GapError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => GapError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
