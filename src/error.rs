// src/error.rs
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::ComponentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Pem,
    X509,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pem => write!(f, "PEM"),
            Self::X509 => write!(f, "X.509"),
        }
    }
}

/// Malformed certificate input. Permanent, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse certificate {stage}: {message}")]
pub struct ParseError {
    pub stage: ParseStage,
    pub message: String,
}

impl ParseError {
    pub fn pem(message: impl Into<String>) -> Self {
        Self {
            stage: ParseStage::Pem,
            message: message.into(),
        }
    }

    pub fn x509(message: impl Into<String>) -> Self {
        Self {
            stage: ParseStage::X509,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("{command}: {message}")]
    Transport { command: String, message: String },

    #[error("{command}: {message}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        message: String,
        stderr: String,
    },

    #[error("{command}: timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("pod {pod} has no containers")]
    NoContainer { pod: String },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(" ({})", stderr)
    }
}

/// No authoritative certificate could be determined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("kubelet process not found under {0}")]
    KubeletNotFound(PathBuf),

    #[error("kubeconfig is set neither by --kubeconfig nor by the kubelet config file")]
    MissingKubeconfig,

    #[error("invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),

    #[error("kubeconfig has no current-context")]
    NoCurrentContext,

    #[error("context {0:?} not found in kubeconfig")]
    UnknownContext(String),

    #[error("user {0:?} not found in kubeconfig")]
    UnknownUser(String),

    #[error("user {0:?} has neither client-certificate-data nor client-certificate")]
    NoClientCertificate(String),

    #[error("client-certificate-data is not valid base64: {0}")]
    InvalidCertificateData(String),

    #[error("invalid kubelet config: {0}")]
    InvalidKubeletConfig(String),
}

/// Agent fleet could not be created or observed. Fatal for the run.
#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("failed to create agent daemonset {name}: {source}")]
    Create { name: String, source: kube::Error },

    #[error("failed to read agent daemonset {name}: {source}")]
    Observe { name: String, source: kube::Error },

    #[error("failed to list agent pods with selector {selector}: {source}")]
    ListPods {
        selector: String,
        source: kube::Error,
    },

    #[error("timed out after {}s waiting for {stage}", .waited.as_secs())]
    Timeout { stage: String, waited: Duration },
}

/// Internal contract violation while fanning results in.
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("collection worker failed: {0}")]
    WorkerFailed(String),
}

/// Per-target failure. Rendered into the Warning column, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Fatal run errors; the CLI exits nonzero on any of these.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("failed to build cluster client: {0}")]
    Client(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to list {component} pods: {message}")]
    Discovery {
        component: ComponentType,
        message: String,
    },

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("failed to write report: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised inside the per-node agent.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Parse { path: PathBuf, source: ParseError },

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CheckError>;
