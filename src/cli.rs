// src/cli.rs
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use crate::cluster::{ClientOptions, HOST_PROC_MOUNT};
use crate::config::CheckConfig;
use crate::error::{AgentError, CheckError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Check certificate expiration of the control plane and, optionally, of
/// every kubelet.
#[derive(Parser, Debug)]
#[command(name = "kubectl-check-cert", bin_name = "kubectl check-cert", version)]
pub struct Args {
    /// Also check kubelet certificates by deploying an agent on every node
    #[arg(long)]
    pub also_check_kubelet: bool,

    /// Path to the kubeconfig file to use
    #[arg(long, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,
    /// Name of the kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,
    /// Name of the kubeconfig cluster to use
    #[arg(long)]
    pub cluster: Option<String>,
    /// Name of the kubeconfig user to use
    #[arg(long)]
    pub user: Option<String>,
    /// Namespace the agent daemonset is deployed into
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// JSON settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Number of concurrent collection workers
    #[arg(long)]
    pub workers: Option<usize>,
    #[arg(long, value_name = "IMAGE")]
    pub agent_image: Option<String>,
    /// Seconds to wait for agent pods to become ready
    #[arg(long, value_name = "SECS")]
    pub agent_ready_timeout: Option<u64>,
    /// Fail when a control-plane component cannot be found
    #[arg(long)]
    pub require_control_plane: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
    #[arg(long)]
    pub no_progress: bool,
    #[arg(short, long)]
    pub debug: bool,
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: self.user.clone(),
        }
    }

    /// Settings file (or defaults) with command-line overrides applied.
    pub fn load_config(&self) -> Result<CheckConfig, CheckError> {
        let mut config = match &self.config {
            Some(path) => CheckConfig::load_from_file(path)
                .map_err(|e| CheckError::Config(format!("{}: {}", path.display(), e)))?,
            None => CheckConfig::default(),
        };
        self.apply_overrides(&mut config);
        config
            .validate()
            .map_err(|e| CheckError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut CheckConfig) {
        if let Some(namespace) = &self.namespace {
            config.agent.namespace = namespace.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(image) = &self.agent_image {
            config.agent.image = image.clone();
        }
        if let Some(timeout) = self.agent_ready_timeout {
            config.agent.ready_timeout_secs = timeout;
        }
        if self.require_control_plane {
            config.require_control_plane = true;
        }
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand {
    /// Print the kubelet certificate report as JSON
    Report,
    /// Wait until terminated
    Idle,
}

/// Per-node agent reporting the kubelet's certificates.
#[derive(Parser, Debug)]
#[command(name = "cert-agent", version)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: Option<AgentCommand>,

    /// Where the host's /proc is mounted
    #[arg(long, env = "CERT_AGENT_PROC_ROOT", default_value = HOST_PROC_MOUNT)]
    pub proc_root: PathBuf,
    /// Node name reported in every entry; defaults to /etc/hostname
    #[arg(long, env = "NODENAME")]
    pub node_name: Option<String>,
    #[arg(short, long)]
    pub debug: bool,
}

pub const HOSTNAME_FILE: &str = "/etc/hostname";

impl AgentArgs {
    pub fn command(&self) -> AgentCommand {
        self.command.unwrap_or(AgentCommand::Report)
    }

    pub fn resolve_node_name(&self, hostname_file: &Path) -> Result<String, AgentError> {
        if let Some(name) = self.node_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Ok(name.to_string());
        }
        fs::read_to_string(hostname_file)
            .map(|name| name.trim().to_string())
            .map_err(|source| AgentError::Read {
                path: hostname_file.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn overrides_win_over_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"workers": 4, "agent": {"namespace": "ops"}}"#).unwrap();

        let args = Args::parse_from([
            "kubectl-check-cert",
            "--config",
            path.to_str().unwrap(),
            "--workers",
            "2",
            "--agent-image",
            "example.com/agent:1",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.workers, 2);
        assert_eq!(config.agent.namespace, "ops");
        assert_eq!(config.agent.image, "example.com/agent:1");
    }

    #[test]
    fn invalid_settings_are_config_errors() {
        let args = Args::parse_from(["kubectl-check-cert", "--workers", "0"]);
        assert!(matches!(args.load_config(), Err(CheckError::Config(_))));

        let args = Args::parse_from(["kubectl-check-cert", "--config", "/nonexistent/settings.json"]);
        assert!(matches!(args.load_config(), Err(CheckError::Config(_))));
    }

    #[test]
    fn node_name_falls_back_to_hostname_file() {
        let dir = TempDir::new().unwrap();
        let hostname = dir.path().join("hostname");
        fs::write(&hostname, "worker-3\n").unwrap();

        let args = AgentArgs::parse_from(["cert-agent", "--node-name", ""]);
        assert_eq!(args.resolve_node_name(&hostname).unwrap(), "worker-3");

        let args = AgentArgs::parse_from(["cert-agent", "--node-name", "worker-9"]);
        assert_eq!(args.resolve_node_name(&hostname).unwrap(), "worker-9");
    }
}
