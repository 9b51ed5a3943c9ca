// src/discovery/kubeconfig.rs
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ResolutionError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextConfig,
}

#[derive(Debug, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    pub client_certificate: Option<String>,
    pub client_certificate_data: Option<String>,
}

/// Where the client certificate of the current context lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCertSource {
    /// Decoded `client-certificate-data`; reported under the kubeconfig's own path.
    Embedded(String),
    File(PathBuf),
}

impl KubeConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ResolutionError> {
        serde_yaml::from_str(content).map_err(|e| ResolutionError::InvalidKubeconfig(e.to_string()))
    }

    pub fn current_user(&self) -> Result<(&str, &UserConfig), ResolutionError> {
        let current = self
            .current_context
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(ResolutionError::NoCurrentContext)?;
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == current)
            .ok_or_else(|| ResolutionError::UnknownContext(current.to_string()))?;
        let user_name = &context.context.user;
        self.users
            .iter()
            .find(|u| &u.name == user_name)
            .map(|u| (u.name.as_str(), &u.user))
            .ok_or_else(|| ResolutionError::UnknownUser(user_name.clone()))
    }

    /// Embedded data wins over a file reference. Relative file paths are
    /// taken relative to the directory holding the kubeconfig.
    pub fn client_certificate(
        &self,
        kubeconfig_path: &Path,
    ) -> Result<ClientCertSource, ResolutionError> {
        let (user_name, user) = self.current_user()?;

        if let Some(data) = user.client_certificate_data.as_deref().map(str::trim) {
            if !data.is_empty() {
                let pem = STANDARD
                    .decode(data)
                    .map_err(|e| ResolutionError::InvalidCertificateData(e.to_string()))?;
                return Ok(ClientCertSource::Embedded(
                    String::from_utf8_lossy(&pem).into_owned(),
                ));
            }
        }

        if let Some(file) = user.client_certificate.as_deref().map(str::trim) {
            if !file.is_empty() {
                let file = Path::new(file);
                let path = if file.is_relative() {
                    kubeconfig_path
                        .parent()
                        .map(|dir| dir.join(file))
                        .unwrap_or_else(|| file.to_path_buf())
                } else {
                    file.to_path_buf()
                };
                return Ok(ClientCertSource::File(path));
            }
        }

        Err(ResolutionError::NoClientCertificate(user_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMBEDDED: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: kubernetes
  cluster:
    server: https://10.0.0.1:6443
    certificate-authority-data: Zm9v
contexts:
- name: system:kube-scheduler@kubernetes
  context:
    cluster: kubernetes
    user: system:kube-scheduler
current-context: system:kube-scheduler@kubernetes
users:
- name: system:kube-scheduler
  user:
    client-certificate-data: LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0tCg==
    client-key-data: Zm9v
"#;

    const FILE_REF: &str = r#"
contexts:
- name: default-auth
  context:
    cluster: default-cluster
    user: default-auth
current-context: default-auth
users:
- name: default-auth
  user:
    client-certificate: pki/kubelet-client-current.pem
    client-key: pki/kubelet-client-current.pem
"#;

    #[test]
    fn embedded_data_is_decoded() {
        let config = KubeConfig::from_yaml(EMBEDDED).unwrap();
        let source = config
            .client_certificate(Path::new("/etc/kubernetes/scheduler.conf"))
            .unwrap();
        assert_eq!(
            source,
            ClientCertSource::Embedded("-----BEGIN CERTIFICATE-----\n".to_string())
        );
    }

    #[test]
    fn relative_file_resolves_against_kubeconfig_dir() {
        let config = KubeConfig::from_yaml(FILE_REF).unwrap();
        let source = config
            .client_certificate(Path::new("/var/lib/kubelet/kubeconfig"))
            .unwrap();
        assert_eq!(
            source,
            ClientCertSource::File(PathBuf::from("/var/lib/kubelet/pki/kubelet-client-current.pem"))
        );
    }

    #[test]
    fn missing_pieces_are_resolution_errors() {
        let config = KubeConfig::from_yaml("contexts: []\n").unwrap();
        assert_eq!(
            config.client_certificate(Path::new("/k")),
            Err(ResolutionError::NoCurrentContext)
        );

        let config = KubeConfig::from_yaml(&FILE_REF.replace("current-context: default-auth", "current-context: other")).unwrap();
        assert_eq!(
            config.client_certificate(Path::new("/k")),
            Err(ResolutionError::UnknownContext("other".to_string()))
        );

        let no_cert = r#"
contexts:
- name: c
  context:
    user: u
current-context: c
users:
- name: u
  user:
    token: abc
"#;
        let config = KubeConfig::from_yaml(no_cert).unwrap();
        assert_eq!(
            config.client_certificate(Path::new("/k")),
            Err(ResolutionError::NoClientCertificate("u".to_string()))
        );
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            KubeConfig::from_yaml("users: {not: [a list"),
            Err(ResolutionError::InvalidKubeconfig(_))
        ));
    }
}
