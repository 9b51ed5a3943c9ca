// src/bin/cert-agent.rs
use std::path::Path;
use std::process::ExitCode;

use check_cert::agent::{collect_report, AgentEnvironment};
use check_cert::cli::{AgentArgs, AgentCommand, HOSTNAME_FILE};
use check_cert::error::AgentError;
use check_cert::utils::init_logging;
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = AgentArgs::parse();

    if let Err(e) = init_logging(args.debug, None) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match args.command() {
        AgentCommand::Idle => {
            idle().await;
            ExitCode::SUCCESS
        }
        AgentCommand::Report => match report(&args) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                // stderr travels back to the orchestrator through the exec stream
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn report(args: &AgentArgs) -> Result<String, AgentError> {
    let env = AgentEnvironment {
        proc_root: args.proc_root.clone(),
        node_name: args.resolve_node_name(Path::new(HOSTNAME_FILE))?,
    };
    let report = collect_report(&env)?;
    Ok(serde_json::to_string(&report)?)
}

async fn idle() {
    info!("Agent idle, waiting for report requests");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = terminate.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM, waiting for ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
