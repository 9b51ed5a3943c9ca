// src/discovery/mod.rs
mod kubeconfig;
mod targets;

pub use kubeconfig::{ClientCertSource, KubeConfig, UserConfig};
pub use targets::{
    container_flags, control_plane_targets, list_control_plane, node_targets, ControlPlaneApi, PodRef,
    Target, CONTROL_PLANE_COMPONENTS,
};
