// src/cluster/exec.rs
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use kube::Client;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::discovery::PodRef;
use crate::error::ExecError;

/// Runs a command in a pod's container and returns its stdout.
///
/// Implementations never retry; that is left to callers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PodExecutor: Send + Sync {
    async fn exec(&self, pod: &PodRef, command: &[String]) -> Result<String, ExecError>;
}

/// Executor backed by the pods/exec subresource.
#[derive(Clone)]
pub struct KubePodExecutor {
    client: Client,
    timeout: Duration,
}

impl KubePodExecutor {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn run(&self, pod: &PodRef, command: &[String]) -> Result<String, ExecError> {
        let command_line = command.join(" ");
        let transport = |message: String| ExecError::Transport {
            command: command_line.clone(),
            message,
        };

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &pod.namespace);
        let params = AttachParams::default()
            .container(pod.container.as_str())
            .stdin(false)
            .stdout(true)
            .stderr(true);

        let mut attached = pods
            .exec(&pod.name, command.to_vec(), &params)
            .await
            .map_err(|e| transport(format!("exec failed: {}", e)))?;

        let status = attached.take_status();
        let stdout_reader = attached.stdout();
        let stderr_reader = attached.stderr();
        let (stdout, stderr) = tokio::join!(read_all(stdout_reader), read_all(stderr_reader));
        let stdout = stdout.map_err(|e| transport(format!("reading stdout: {}", e)))?;
        let stderr = stderr.map_err(|e| transport(format!("reading stderr: {}", e)))?;

        let status = match status {
            Some(status) => status.await,
            None => None,
        };
        attached
            .join()
            .await
            .map_err(|e| transport(format!("exec stream: {}", e)))?;

        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        if !stderr.trim().is_empty() {
            warn!(pod = %pod.name, command = %command_line, stderr = %stderr.trim(), "Remote command wrote to stderr");
        }

        if let Some(status) = status {
            if status.status.as_deref() == Some("Failure") {
                let message = status
                    .message
                    .or(status.reason)
                    .unwrap_or_else(|| "command failed".to_string());
                return Err(ExecError::CommandFailed {
                    command: command_line,
                    message,
                    stderr,
                });
            }
        }

        debug!(pod = %pod.name, command = %command_line, bytes = stdout.len(), "Remote command finished");
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[async_trait]
impl PodExecutor for KubePodExecutor {
    async fn exec(&self, pod: &PodRef, command: &[String]) -> Result<String, ExecError> {
        match tokio::time::timeout(self.timeout, self.run(pod, command)).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::Timeout {
                command: command.join(" "),
                after: self.timeout,
            }),
        }
    }
}

async fn read_all<R>(reader: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// `cat <path>` as a command vector.
pub fn cat_command(path: &str) -> Vec<String> {
    vec!["cat".to_string(), path.to_string()]
}
