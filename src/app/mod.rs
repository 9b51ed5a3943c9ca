// src/app/mod.rs
mod collector;
mod context;
mod report;
mod run;
mod workers;

pub use collector::{Collector, KUBELET_CA_WARNING};
pub use context::RunContext;
pub use report::{compare_entries, sort_results};
pub use run::run_check;
pub use workers::{collect_target, APISERVER_CERT_FLAGS, KUBECONFIG_FLAG, KUBELET_CA_FLAG};
