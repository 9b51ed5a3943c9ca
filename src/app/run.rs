// src/app/run.rs
use std::sync::Arc;

use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::collector::Collector;
use super::context::RunContext;
use super::report::sort_results;
use crate::cli::{Args, OutputFormat};
use crate::cluster::{create_client, AgentFleet, KubePodExecutor};
use crate::config::CheckConfig;
use crate::discovery::{list_control_plane, node_targets, Target};
use crate::error::{CheckError, DeploymentError, Result};
use crate::types::CollectionResult;
use crate::ui::{render_json, render_table, ProgressTracker};

pub async fn run_check(args: &Args) -> Result<()> {
    let config = args.load_config()?;
    let client = create_client(&args.client_options()).await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling outstanding work");
                cancel.cancel();
            }
        }
    });

    let progress = ProgressTracker::new(!args.no_progress);
    let executor = Arc::new(KubePodExecutor::new(client.clone(), config.exec_timeout()));
    let ctx = Arc::new(RunContext::new(
        executor,
        &config.agent,
        progress.clone(),
        cancel,
    ));

    let collected = collect(&client, &config, args.also_check_kubelet, ctx).await;
    progress.finish();
    let mut results = collected?;
    sort_results(&mut results);

    print_report(&results, args.output)
}

async fn collect(
    client: &Client,
    config: &CheckConfig,
    check_kubelet: bool,
    ctx: Arc<RunContext>,
) -> Result<Vec<CollectionResult>> {
    let collector = Collector::start(ctx.clone(), config.workers);

    ctx.progress.set_message("control plane");
    let control_plane = list_control_plane(
        client,
        &config.control_plane_namespace,
        config.require_control_plane,
    )
    .await?;
    info!(targets = control_plane.len(), "Dispatching control-plane targets");
    collector.dispatch(control_plane);

    if !check_kubelet {
        return Ok(collector.finish().await?);
    }

    // control-plane workers keep running while the agents come up
    ctx.progress.set_message("kubelet agents");
    let mut fleet = AgentFleet::new(client.clone(), config.agent.clone());
    let nodes = deploy_agents(&mut fleet, &ctx.cancel).await;
    let results = match nodes {
        Ok(nodes) => {
            info!(targets = nodes.len(), "Dispatching node targets");
            collector.dispatch(nodes);
            collector.finish().await.map_err(CheckError::from)
        }
        Err(e) => Err(e.into()),
    };
    fleet.teardown().await;
    results
}

async fn deploy_agents(
    fleet: &mut AgentFleet,
    cancel: &CancellationToken,
) -> std::result::Result<Vec<Target>, DeploymentError> {
    fleet.deploy().await?;
    tokio::select! {
        _ = cancel.cancelled() => {
            warn!("Interrupted while waiting for agent pods");
            return Ok(Vec::new());
        }
        ready = fleet.wait_ready() => ready?,
    }
    let pods = fleet.agent_pods().await?;
    Ok(node_targets(&pods))
}

fn print_report(results: &[CollectionResult], format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Table => render_table(results),
        OutputFormat::Json => render_json(results).map_err(|e| CheckError::Output(e.to_string()))?,
    };
    println!("{}", rendered);
    Ok(())
}
