// src/cluster/client.rs
use std::path::PathBuf;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::error::CheckError;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// kubectl-style connection overrides.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
}

impl ClientOptions {
    fn kube_config_options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: self.user.clone(),
        }
    }

    fn has_overrides(&self) -> bool {
        self.context.is_some() || self.cluster.is_some() || self.user.is_some()
    }
}

pub async fn create_client(options: &ClientOptions) -> Result<Client, CheckError> {
    let mut config = match &options.kubeconfig {
        Some(path) => {
            let path = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            debug!(kubeconfig = %path, "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(&path)
                .map_err(|e| CheckError::Client(format!("failed to read kubeconfig: {}", e)))?;
            Config::from_custom_kubeconfig(kubeconfig, &options.kube_config_options())
                .await
                .map_err(|e| CheckError::Client(format!("failed to load kubeconfig: {}", e)))?
        }
        None if options.has_overrides() => {
            Config::from_kubeconfig(&options.kube_config_options())
                .await
                .map_err(|e| CheckError::Client(format!("failed to load kubeconfig: {}", e)))?
        }
        None => Config::infer()
            .await
            .map_err(|e| CheckError::Client(format!("failed to infer config: {}", e)))?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

    Client::try_from(config)
        .map_err(|e| CheckError::Client(format!("failed to create client: {}", e)))
}
