// src/agent/report.rs
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::process::{find_kubelet, read_cmdline};
use super::resolve::{KubeletConfig, KubeletSettings, CONFIG_FLAG};
use crate::cert::parse_certificate;
use crate::discovery::{ClientCertSource, KubeConfig};
use crate::error::AgentError;
use crate::types::{AgentReport, CertificateEntry, ComponentType};

pub const SERVER_CERT_NAME: &str = "server-cert";
pub const CLIENT_CERT_NAME: &str = "client-cert";

#[derive(Debug, Clone)]
pub struct AgentEnvironment {
    /// Where the host's /proc is mounted inside the agent container.
    pub proc_root: PathBuf,
    pub node_name: String,
}

/// Resolves and reads the kubelet's serving and client certificates.
/// Always yields exactly two entries, or an error for the whole node.
pub fn collect_report(env: &AgentEnvironment) -> Result<AgentReport, AgentError> {
    let proc_dir = find_kubelet(&env.proc_root)?;
    let flags = read_cmdline(&proc_dir)?;

    let config = match flags.get(CONFIG_FLAG).filter(|p| !p.is_empty()) {
        Some(path) => KubeletConfig::from_yaml(&read_file(Path::new(path))?)?,
        None => KubeletConfig::default(),
    };
    let settings = KubeletSettings::new(&flags, &config);

    let server_path = settings.server_cert_path();
    debug!(path = %server_path.display(), "Resolved kubelet server certificate");
    let server_pem = read_file(&server_path)?;
    let server = certificate_entry(&env.node_name, SERVER_CERT_NAME, &server_path, &server_pem)?;

    let kubeconfig_path = settings.kubeconfig_path()?;
    let kubeconfig = KubeConfig::from_yaml(&read_file(&kubeconfig_path)?)?;
    let (client_path, client_pem) = match kubeconfig.client_certificate(&kubeconfig_path)? {
        ClientCertSource::Embedded(pem) => (kubeconfig_path, pem),
        ClientCertSource::File(path) => {
            let pem = read_file(&path)?;
            (path, pem)
        }
    };
    debug!(path = %client_path.display(), "Resolved kubelet client certificate");
    let client = certificate_entry(&env.node_name, CLIENT_CERT_NAME, &client_path, &client_pem)?;

    info!(node = %env.node_name, "Collected kubelet certificates");
    Ok(AgentReport {
        entries: vec![server, client],
    })
}

fn certificate_entry(
    node: &str,
    name: &str,
    path: &Path,
    pem: &str,
) -> Result<CertificateEntry, AgentError> {
    let expiry = parse_certificate(pem.as_bytes()).map_err(|source| AgentError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(CertificateEntry {
        kind: ComponentType::Kubelet,
        node: node.to_string(),
        name: name.to_string(),
        days: expiry.days,
        due: Some(expiry.not_after),
        path: path.display().to_string(),
    })
}

fn read_file(path: &Path) -> Result<String, AgentError> {
    fs::read_to_string(path)
        .map(|content| content.trim_matches('\n').to_string())
        .map_err(|source| AgentError::Read {
            path: path.to_path_buf(),
            source,
        })
}
