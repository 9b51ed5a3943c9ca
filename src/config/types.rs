// config/types.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, io, path::Path};

use crate::utils::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub control_plane_namespace: String,
    pub workers: usize,
    pub exec_timeout_secs: u64,
    pub require_control_plane: bool,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub image_pull_policy: String,
    pub command: Vec<String>,
    pub idle_command: Vec<String>,
    pub poll_interval_ms: u64,
    pub ready_timeout_secs: u64,
    pub grace_period_ms: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            control_plane_namespace: "kube-system".to_string(),
            workers: 16,
            exec_timeout_secs: 60,
            require_control_plane: false,
            agent: AgentConfig::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "check-cert-agent".to_string(),
            namespace: "default".to_string(),
            image: "ghcr.io/kubectl-check-cert/cert-agent:latest".to_string(),
            image_pull_policy: "Always".to_string(),
            command: vec!["cert-agent".to_string(), "report".to_string()],
            idle_command: vec!["cert-agent".to_string(), "idle".to_string()],
            poll_interval_ms: 500,
            ready_timeout_secs: 300,
            grace_period_ms: 1000,
            retry_attempts: 5,
            retry_backoff_ms: 500,
        }
    }
}

impl CheckConfig {
    pub fn load_from_file(path: &Path) -> io::Result<Self> {
        let config_str = fs::read_to_string(path)?;
        serde_json::from_str(&config_str).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn validate(&self) -> io::Result<()> {
        let invalid = |msg: &str| Err(io::Error::new(io::ErrorKind::InvalidInput, msg.to_string()));

        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        if self.agent.retry_attempts == 0 {
            return invalid("agent.retry_attempts must be at least 1");
        }
        if self.agent.command.is_empty() || self.agent.idle_command.is_empty() {
            return invalid("agent commands must not be empty");
        }
        if self.agent.name.is_empty() || self.agent.image.is_empty() {
            return invalid("agent name and image must be set");
        }
        Ok(())
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

impl AgentConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn selector(&self) -> String {
        format!("app={}", self.name)
    }
}
