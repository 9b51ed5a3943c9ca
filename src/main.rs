// src/main.rs
use std::process::ExitCode;

use check_cert::app::run_check;
use check_cert::cli::Args;
use check_cert::utils::init_logging;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.debug, args.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run_check(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Certificate check failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
