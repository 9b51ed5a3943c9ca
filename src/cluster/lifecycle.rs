// src/cluster/lifecycle.rs
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetStatus};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use super::daemonset::agent_daemonset;
use super::poll::poll_until;
use crate::config::AgentConfig;
use crate::error::DeploymentError;

/// Cluster calls needed to run the agent daemonset.
///
/// Errors are passed through untouched so the fleet decides which status
/// codes are tolerated.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn create_daemonset(&self, ds: &DaemonSet) -> Result<(), kube::Error>;

    async fn daemonset_status(&self, name: &str) -> Result<Option<DaemonSetStatus>, kube::Error>;

    async fn delete_daemonset(&self, name: &str) -> Result<(), kube::Error>;

    async fn list_pods(&self, selector: &str) -> Result<Vec<Pod>, kube::Error>;
}

/// [`FleetApi`] over one namespace of a live cluster.
pub struct KubeFleetApi {
    daemonsets: Api<DaemonSet>,
    pods: Api<Pod>,
}

impl KubeFleetApi {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            daemonsets: Api::namespaced(client.clone(), namespace),
            pods: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl FleetApi for KubeFleetApi {
    async fn create_daemonset(&self, ds: &DaemonSet) -> Result<(), kube::Error> {
        self.daemonsets.create(&PostParams::default(), ds).await?;
        Ok(())
    }

    async fn daemonset_status(&self, name: &str) -> Result<Option<DaemonSetStatus>, kube::Error> {
        Ok(self.daemonsets.get(name).await?.status)
    }

    async fn delete_daemonset(&self, name: &str) -> Result<(), kube::Error> {
        self.daemonsets.delete(name, &DeleteParams::background()).await?;
        Ok(())
    }

    async fn list_pods(&self, selector: &str) -> Result<Vec<Pod>, kube::Error> {
        Ok(self.pods.list(&ListParams::default().labels(selector)).await?.items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FleetPhase {
    Absent,
    Creating,
    WaitingReady,
    Ready,
    TearingDown,
}

/// The per-node collection agents for one run.
pub struct AgentFleet {
    api: Box<dyn FleetApi>,
    agent: AgentConfig,
    phase: FleetPhase,
}

impl AgentFleet {
    pub fn new(client: Client, agent: AgentConfig) -> Self {
        let api = KubeFleetApi::new(client, &agent.namespace);
        Self::with_api(Box::new(api), agent)
    }

    pub fn with_api(api: Box<dyn FleetApi>, agent: AgentConfig) -> Self {
        Self {
            api,
            agent,
            phase: FleetPhase::Absent,
        }
    }

    pub async fn deploy(&mut self) -> Result<(), DeploymentError> {
        self.phase = FleetPhase::Creating;
        let ds = agent_daemonset(&self.agent);

        match self.api.create_daemonset(&ds).await {
            Ok(()) => {
                info!(name = %self.agent.name, namespace = %self.agent.namespace, "Agent daemonset created");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                warn!(name = %self.agent.name, "Agent daemonset already exists, reusing it");
                Ok(())
            }
            Err(source) => {
                self.phase = FleetPhase::Absent;
                Err(DeploymentError::Create {
                    name: self.agent.name.clone(),
                    source,
                })
            }
        }
    }

    /// Waits for the controller to schedule agents, then for all of them to
    /// become ready, then for one more grace period.
    pub async fn wait_ready(&mut self) -> Result<(), DeploymentError> {
        self.phase = FleetPhase::WaitingReady;
        let timeout = self.agent.ready_timeout();
        let interval = self.agent.poll_interval();
        let this = &*self;

        poll_until(timeout, interval, "agent pods to be scheduled", || {
            this.observe(desired_scheduled)
        })
        .await?;
        debug!(name = %this.agent.name, "Agent pods scheduled");

        poll_until(timeout, interval, "agent pods to become ready", || {
            this.observe(all_ready)
        })
        .await?;

        tokio::time::sleep(self.agent.grace_period()).await;
        self.phase = FleetPhase::Ready;
        info!(name = %self.agent.name, "Agent pods ready");
        Ok(())
    }

    async fn observe(
        &self,
        predicate: fn(Option<&DaemonSetStatus>) -> bool,
    ) -> Result<bool, DeploymentError> {
        match self.api.daemonset_status(&self.agent.name).await {
            Ok(status) => Ok(predicate(status.as_ref())),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(false),
            Err(source) => Err(DeploymentError::Observe {
                name: self.agent.name.clone(),
                source,
            }),
        }
    }

    /// Agent pods that are not being deleted.
    pub async fn agent_pods(&self) -> Result<Vec<Pod>, DeploymentError> {
        let selector = self.agent.selector();
        let pods = self
            .api
            .list_pods(&selector)
            .await
            .map_err(|source| DeploymentError::ListPods {
                selector: selector.clone(),
                source,
            })?;

        Ok(pods
            .into_iter()
            .filter(|p| p.metadata.deletion_timestamp.is_none())
            .collect())
    }

    /// Deletes the daemonset. Failures are logged and otherwise ignored.
    pub async fn teardown(&mut self) {
        if self.phase == FleetPhase::Absent {
            return;
        }
        self.phase = FleetPhase::TearingDown;

        match self.api.delete_daemonset(&self.agent.name).await {
            Ok(()) => info!(name = %self.agent.name, "Agent daemonset deleted"),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {}
            Err(e) => warn!(name = %self.agent.name, error = %e, "Failed to delete agent daemonset"),
        }
        self.phase = FleetPhase::Absent;
    }
}

/// The controller has decided how many agents it wants.
pub fn desired_scheduled(status: Option<&DaemonSetStatus>) -> bool {
    status.is_some_and(|s| s.desired_number_scheduled > 0)
}

pub fn all_ready(status: Option<&DaemonSetStatus>) -> bool {
    status.is_some_and(|s| s.desired_number_scheduled > 0 && s.number_ready == s.desired_number_scheduled)
}
