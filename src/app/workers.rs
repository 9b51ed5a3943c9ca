// src/app/workers.rs
use std::fmt::Display;
use std::path::Path;

use tracing::{debug, warn};

use super::context::RunContext;
use crate::agent::CLIENT_CERT_NAME;
use crate::cert::parse_certificate;
use crate::cluster::cat_command;
use crate::discovery::{ClientCertSource, KubeConfig, PodRef, Target};
use crate::error::CollectError;
use crate::flags::FlagSet;
use crate::types::{AgentReport, CertificateEntry, CollectionResult, ComponentType};
use crate::utils::retry_fixed;

/// API server flags naming a certificate file; each becomes one row.
pub const APISERVER_CERT_FLAGS: &[&str] = &[
    "etcd-certfile",
    "tls-cert-file",
    "kubelet-client-certificate",
    "proxy-client-cert-file",
];
pub const KUBELET_CA_FLAG: &str = "kubelet-certificate-authority";
pub const KUBECONFIG_FLAG: &str = "kubeconfig";

/// Name of the row reported for an agent whose output was not a report.
pub const AGENT_ERROR_NAME: &str = "error";
pub const NO_FLAGS_NAME: &str = "-";
pub const CANCELLED: &str = "cancelled";

/// Collects every row for one target. Never returns an empty list.
pub async fn collect_target(ctx: &RunContext, target: &Target) -> Vec<CollectionResult> {
    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => vec![cancelled(target)],
        results = collect(ctx, target) => results,
    }
}

async fn collect(ctx: &RunContext, target: &Target) -> Vec<CollectionResult> {
    match target {
        Target::ControlPlane {
            component: ComponentType::Apiserver,
            pod,
            flags,
        } => collect_apiserver(ctx, pod, flags).await,
        Target::ControlPlane {
            component,
            pod,
            flags,
        } => vec![collect_client_cert(ctx, *component, pod, flags).await],
        Target::Node { pod } => collect_node(ctx, pod).await,
    }
}

async fn collect_apiserver(ctx: &RunContext, pod: &PodRef, flags: &FlagSet) -> Vec<CollectionResult> {
    if flags.first_nonempty(KUBELET_CA_FLAG).is_some() {
        ctx.mark_kubelet_ca_seen();
    }

    let mut results = Vec::new();
    for flag in APISERVER_CERT_FLAGS {
        let Some(path) = flags.get(flag).filter(|p| !p.is_empty()) else {
            continue;
        };
        let result = read_remote_certificate(ctx, pod, path)
            .await
            .map(|expiry| CertificateEntry {
                kind: ComponentType::Apiserver,
                node: pod.node.clone(),
                name: flag.to_string(),
                days: expiry.days,
                due: Some(expiry.not_after),
                path: path.to_string(),
            });
        results.push(into_result(result, ComponentType::Apiserver, &pod.node, flag, path));
    }

    if results.is_empty() {
        results.push(no_flags(ComponentType::Apiserver, pod));
    }
    results
}

/// Controller-manager and scheduler: the client certificate of the
/// kubeconfig they run with.
async fn collect_client_cert(
    ctx: &RunContext,
    component: ComponentType,
    pod: &PodRef,
    flags: &FlagSet,
) -> CollectionResult {
    let Some(kubeconfig_path) = flags.get(KUBECONFIG_FLAG).filter(|p| !p.is_empty()) else {
        return no_flags(component, pod);
    };

    let result = async {
        let kubeconfig = exec_cat(ctx, pod, kubeconfig_path).await?;
        let kubeconfig_file = Path::new(kubeconfig_path);
        let source = KubeConfig::from_yaml(&kubeconfig)?.client_certificate(kubeconfig_file)?;
        let (path, pem) = match source {
            ClientCertSource::Embedded(pem) => (kubeconfig_path.to_string(), pem),
            ClientCertSource::File(file) => {
                let path = file.display().to_string();
                let pem = exec_cat(ctx, pod, &path).await?;
                (path, pem)
            }
        };
        let expiry = parse_certificate(pem.as_bytes())?;
        Ok::<_, CollectError>(CertificateEntry {
            kind: component,
            node: pod.node.clone(),
            name: CLIENT_CERT_NAME.to_string(),
            days: expiry.days,
            due: Some(expiry.not_after),
            path,
        })
    }
    .await;

    into_result(result, component, &pod.node, CLIENT_CERT_NAME, "-")
}

/// Runs the agent's report command, retrying transport failures.
async fn collect_node(ctx: &RunContext, pod: &PodRef) -> Vec<CollectionResult> {
    let output = retry_fixed(&ctx.retry, "agent report", || {
        ctx.executor.exec(pod, &ctx.agent_command)
    })
    .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            warn!(pod = %pod.name, node = %pod.node, error = %e, "Agent report failed");
            return vec![failure(ComponentType::Kubelet, &pod.node, AGENT_ERROR_NAME, "-", e)];
        }
    };

    match AgentReport::from_json(&output) {
        Some(report) if !report.entries.is_empty() => {
            debug!(node = %pod.node, entries = report.entries.len(), "Agent report received");
            report.entries.into_iter().map(CollectionResult::ok).collect()
        }
        _ => vec![failure(
            ComponentType::Kubelet,
            &pod.node,
            AGENT_ERROR_NAME,
            "-",
            output.trim(),
        )],
    }
}

async fn read_remote_certificate(
    ctx: &RunContext,
    pod: &PodRef,
    path: &str,
) -> Result<crate::cert::CertificateExpiry, CollectError> {
    let pem = exec_cat(ctx, pod, path).await?;
    Ok(parse_certificate(pem.as_bytes())?)
}

async fn exec_cat(ctx: &RunContext, pod: &PodRef, path: &str) -> Result<String, CollectError> {
    Ok(ctx.executor.exec(pod, &cat_command(path)).await?)
}

fn into_result(
    result: Result<CertificateEntry, CollectError>,
    kind: ComponentType,
    node: &str,
    name: &str,
    path: &str,
) -> CollectionResult {
    match result {
        Ok(entry) => CollectionResult::ok(entry),
        Err(e) => {
            warn!(%kind, node, name, error = %e, "Certificate collection failed");
            failure(kind, node, name, path, e)
        }
    }
}

fn failure(kind: ComponentType, node: &str, name: &str, path: &str, err: impl Display) -> CollectionResult {
    CollectionResult::warn(CertificateEntry::unknown(kind, node, name, path), err.to_string())
}

fn no_flags(kind: ComponentType, pod: &PodRef) -> CollectionResult {
    failure(
        kind,
        &pod.node,
        NO_FLAGS_NAME,
        "-",
        format!("no certificate flags found on pod {}", pod.name),
    )
}

fn cancelled(target: &Target) -> CollectionResult {
    failure(target.component(), &target.pod().node, NO_FLAGS_NAME, "-", CANCELLED)
}
