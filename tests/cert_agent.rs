//! Runs the cert-agent binary against a fake host /proc and kubelet layout.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use base64::{engine::general_purpose::STANDARD, Engine};
use check_cert::types::{AgentReport, ComponentType};
use rcgen::{date_time_ymd, CertificateParams, KeyPair};
use tempfile::TempDir;

fn cert_agent_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cert-agent"))
}

fn pem_expiring(year: i32) -> String {
    let mut params = CertificateParams::new(vec!["node-a".to_string()]).unwrap();
    params.not_after = date_time_ymd(year, 6, 1);
    let key = KeyPair::generate().unwrap();
    params.self_signed(&key).unwrap().pem()
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn run_agent(proc_root: &Path) -> Output {
    Command::new(cert_agent_bin())
        .args(["--proc-root", proc_root.to_str().unwrap(), "--node-name", "node-a", "report"])
        .env_remove("CERT_AGENT_PROC_ROOT")
        .output()
        .expect("Failed to execute")
}

/// kubeadm-style node without server certificate rotation: the serving
/// certificate lives in --cert-dir, the client certificate is embedded in
/// kubelet.conf.
#[test]
fn reports_cert_dir_server_cert_and_embedded_client_cert() {
    let root = TempDir::new().unwrap();
    let pki = root.path().join("var/lib/kubelet/pki");
    let kubelet_conf = root.path().join("etc/kubernetes/kubelet.conf");
    let config = root.path().join("var/lib/kubelet/config.yaml");

    write(&pki.join("kubelet.crt"), &pem_expiring(2031));
    write(
        &kubelet_conf,
        &format!(
            "apiVersion: v1\nkind: Config\ncurrent-context: system:node:node-a@kubernetes\ncontexts:\n- name: system:node:node-a@kubernetes\n  context:\n    cluster: kubernetes\n    user: system:node:node-a\nusers:\n- name: system:node:node-a\n  user:\n    client-certificate-data: {}\n",
            STANDARD.encode(pem_expiring(2032))
        ),
    );
    write(
        &config,
        &format!(
            "apiVersion: kubelet.config.k8s.io/v1beta1\nkind: KubeletConfiguration\nserverTLSBootstrap: false\ncertDir: {}\n",
            pki.display()
        ),
    );
    let proc_root = root.path().join("proc");
    write(&proc_root.join("4242/comm"), "kubelet\n");
    write(
        &proc_root.join("4242/cmdline"),
        &format!(
            "/usr/bin/kubelet\0--kubeconfig={}\0--config={}\0--cert-dir={}\0--feature-gates=RotateKubeletServerCertificate=true\0",
            kubelet_conf.display(),
            config.display(),
            pki.display()
        ),
    );

    let output = run_agent(&proc_root);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "agent failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report = AgentReport::from_json(&stdout).expect("agent output is a report");
    assert_eq!(report.entries.len(), 2);

    let server = &report.entries[0];
    assert_eq!(server.kind, ComponentType::Kubelet);
    assert_eq!(server.node, "node-a");
    assert_eq!(server.name, "server-cert");
    assert_eq!(
        server.path,
        pki.join("kubelet.crt").display().to_string()
    );
    assert_eq!(server.due.unwrap().format("%Y-%m-%d").to_string(), "2031-06-01");

    let client = &report.entries[1];
    assert_eq!(client.name, "client-cert");
    assert_eq!(client.path, kubelet_conf.display().to_string());
    assert_eq!(client.due.unwrap().format("%Y-%m-%d").to_string(), "2032-06-01");
}

#[test]
fn missing_kubelet_exits_nonzero_with_diagnostic() {
    let root = TempDir::new().unwrap();
    let proc_root = root.path().join("proc");
    write(&proc_root.join("1/comm"), "systemd\n");

    let output = run_agent(&proc_root);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kubelet process not found"), "{}", stderr);
}
