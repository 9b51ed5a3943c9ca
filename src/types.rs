// types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    Apiserver,
    ControllerManager,
    Scheduler,
    Kubelet,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apiserver => "apiserver",
            Self::ControllerManager => "controller-manager",
            Self::Scheduler => "scheduler",
            Self::Kubelet => "kubelet",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One certificate row. Field order matches the agent's JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEntry {
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub node: String,
    pub name: String,
    pub days: i64,
    pub due: Option<DateTime<Utc>>,
    pub path: String,
}

impl CertificateEntry {
    /// Placeholder for a row whose certificate could not be read: zero days, no due date.
    pub fn unknown(kind: ComponentType, node: &str, name: &str, path: &str) -> Self {
        Self {
            kind,
            node: node.to_string(),
            name: name.to_string(),
            days: 0,
            due: None,
            path: path.to_string(),
        }
    }
}

/// The unit every worker produces. An empty warning means success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub entry: CertificateEntry,
    #[serde(default)]
    pub warning: String,
}

impl CollectionResult {
    pub fn ok(entry: CertificateEntry) -> Self {
        Self {
            entry,
            warning: String::new(),
        }
    }

    pub fn warn(entry: CertificateEntry, warning: impl Into<String>) -> Self {
        Self {
            entry,
            warning: warning.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.warning.is_empty()
    }
}

/// Self-report printed by the per-node agent: `{"entry": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    #[serde(rename = "entry")]
    pub entries: Vec<CertificateEntry>,
}

impl AgentReport {
    /// Returns None when the text is not a well-formed report, so the
    /// caller can surface it as a diagnostic instead.
    pub fn from_json(text: &str) -> Option<Self> {
        serde_json::from_str(text.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn agent_report_encodes_in_contract_order() {
        let report = AgentReport {
            entries: vec![CertificateEntry {
                kind: ComponentType::Kubelet,
                node: "node".to_string(),
                name: "name".to_string(),
                days: 1,
                due: Some(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()),
                path: "path".to_string(),
            }],
        };

        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"entry":[{"type":"kubelet","node":"node","name":"name","days":1,"due":"2019-01-01T00:00:00Z","path":"path"}]}"#
        );
    }

    #[test]
    fn agent_report_rejects_diagnostics() {
        assert!(AgentReport::from_json("open /var/lib/kubelet/pki/kubelet.crt: no such file").is_none());
        assert!(AgentReport::from_json(r#"{"entry":[{"type":"etcd","node":"n1"}]}"#).is_none());
    }

    #[test]
    fn component_type_uses_kebab_case() {
        let kind: ComponentType = serde_json::from_str(r#""controller-manager""#).unwrap();
        assert_eq!(kind, ComponentType::ControllerManager);
        assert_eq!(kind.to_string(), "controller-manager");
    }
}
