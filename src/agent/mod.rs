// src/agent/mod.rs
//
// Runs inside the per-node agent pod: finds the kubelet, decides which of
// its certificate files are authoritative and reports their expiry.
mod process;
mod report;
pub mod resolve;

pub use process::{find_kubelet, read_cmdline, KUBELET_COMM};
pub use report::{collect_report, AgentEnvironment, CLIENT_CERT_NAME, SERVER_CERT_NAME};
pub use resolve::{KubeletConfig, KubeletSettings};
