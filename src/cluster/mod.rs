// src/cluster/mod.rs
mod client;
mod daemonset;
mod exec;
mod lifecycle;
mod poll;

pub use client::{create_client, ClientOptions};
pub use daemonset::{agent_daemonset, HOST_PROC_MOUNT};
pub use exec::{cat_command, KubePodExecutor, PodExecutor};
pub use lifecycle::{all_ready, desired_scheduled, AgentFleet, FleetApi, KubeFleetApi};
pub use poll::poll_until;

#[cfg(test)]
pub use exec::MockPodExecutor;
