use clap::Parser;
use filemapper::cli::{Cli, RunStatus, run_cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_cli(&cli) {
        Ok(RunStatus::Completed) => ExitCode::SUCCESS,
        Ok(RunStatus::EntriesFailed) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
