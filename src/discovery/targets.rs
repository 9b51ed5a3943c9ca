// src/discovery/targets.rs
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::error::CheckError;
use crate::flags::FlagSet;
use crate::types::ComponentType;

/// Label selectors of the static control-plane pods, in dispatch order.
pub const CONTROL_PLANE_COMPONENTS: &[(ComponentType, &str)] = &[
    (
        ComponentType::Apiserver,
        "component=kube-apiserver,tier=control-plane",
    ),
    (
        ComponentType::ControllerManager,
        "component=kube-controller-manager,tier=control-plane",
    ),
    (
        ComponentType::Scheduler,
        "component=kube-scheduler,tier=control-plane",
    ),
];

/// Enough of a pod to exec into its first container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub container: String,
    pub node: String,
}

impl PodRef {
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let spec = pod.spec.as_ref()?;
        let container = spec.containers.first()?;
        Some(Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            name: pod.metadata.name.clone()?,
            container: container.name.clone(),
            node: spec.node_name.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    ControlPlane {
        component: ComponentType,
        pod: PodRef,
        flags: FlagSet,
    },
    Node {
        pod: PodRef,
    },
}

impl Target {
    pub fn component(&self) -> ComponentType {
        match self {
            Self::ControlPlane { component, .. } => *component,
            Self::Node { .. } => ComponentType::Kubelet,
        }
    }

    pub fn pod(&self) -> &PodRef {
        match self {
            Self::ControlPlane { pod, .. } | Self::Node { pod } => pod,
        }
    }
}

/// Flags of the first container, taken from `command` followed by `args`.
pub fn container_flags(pod: &Pod) -> FlagSet {
    let Some(container) = pod.spec.as_ref().and_then(|s| s.containers.first()) else {
        return FlagSet::default();
    };
    let command = container.command.iter().flatten();
    let args = container.args.iter().flatten();
    FlagSet::parse(command.chain(args))
}

pub fn control_plane_targets(component: ComponentType, pods: &[Pod]) -> Vec<Target> {
    pods.iter()
        .filter_map(|pod| match PodRef::from_pod(pod) {
            Some(pod_ref) => Some(Target::ControlPlane {
                component,
                flags: container_flags(pod),
                pod: pod_ref,
            }),
            None => {
                warn!(%component, pod = ?pod.metadata.name, "Skipping pod without containers");
                None
            }
        })
        .collect()
}

pub fn node_targets(pods: &[Pod]) -> Vec<Target> {
    pods.iter()
        .filter_map(|pod| {
            let pod_ref = PodRef::from_pod(pod);
            if pod_ref.is_none() {
                warn!(pod = ?pod.metadata.name, "Skipping agent pod without containers");
            }
            pod_ref
        })
        .map(|pod| Target::Node { pod })
        .collect()
}

/// Pod listing used to find the control plane.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControlPlaneApi: Send + Sync {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, kube::Error>;
}

#[async_trait]
impl ControlPlaneApi for Client {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, kube::Error> {
        let pods: Api<Pod> = Api::namespaced(self.clone(), namespace);
        Ok(pods.list(&ListParams::default().labels(selector)).await?.items)
    }
}

/// Lists every control-plane component in `namespace`.
///
/// A component that cannot be listed, or has no pods, is skipped with a
/// warning unless `require` is set.
pub async fn list_control_plane(
    api: &dyn ControlPlaneApi,
    namespace: &str,
    require: bool,
) -> Result<Vec<Target>, CheckError> {
    let mut targets = Vec::new();

    for (component, selector) in CONTROL_PLANE_COMPONENTS {
        let listed = api
            .list_pods(namespace, selector)
            .await
            .map_err(|e| e.to_string())
            .and_then(|items| {
                if items.is_empty() {
                    Err(format!("no pods match {}", selector))
                } else {
                    Ok(items)
                }
            });

        match listed {
            Ok(items) => {
                debug!(%component, count = items.len(), "Found control-plane pods");
                targets.extend(control_plane_targets(*component, &items));
            }
            Err(message) if require => {
                return Err(CheckError::Discovery {
                    component: *component,
                    message,
                });
            }
            Err(message) => {
                warn!(%component, error = %message, "Skipping control-plane component");
            }
        }
    }

    Ok(targets)
}
