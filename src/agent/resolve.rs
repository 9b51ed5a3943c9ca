// src/agent/resolve.rs
//
// Decides which files hold the kubelet's authoritative certificates. A
// flag always beats the same option in the kubelet config file.
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

use crate::error::ResolutionError;
use crate::flags::{parse_bool, FlagSet};

/// A kubelet option that can be given as a flag or as a config file key.
#[derive(Debug, Clone, Copy)]
pub struct Setting {
    pub flag: &'static str,
    pub option: &'static str,
}

pub const CONFIG_FLAG: &str = "config";
pub const CERT_DIR_FLAG: &str = "cert-dir";

pub const KUBECONFIG: Setting = Setting {
    flag: "kubeconfig",
    option: "kubeconfig",
};
pub const TLS_CERT_FILE: Setting = Setting {
    flag: "tls-cert-file",
    option: "tlsCertFile",
};
pub const TLS_KEY_FILE: Setting = Setting {
    flag: "tls-key-file",
    option: "tlsKeyFile",
};
pub const ROTATE_SERVER_CERTIFICATES: Setting = Setting {
    flag: "rotate-server-certificates",
    option: "serverTLSBootstrap",
};
pub const FEATURE_GATES: Setting = Setting {
    flag: "feature-gates",
    option: "featureGates",
};

pub const ROTATE_SERVER_CERT_FEATURE: &str = "RotateKubeletServerCertificate";

pub const DEFAULT_CERT_DIR: &str = "/var/lib/kubelet/pki";
pub const SERVER_CERT_FILE: &str = "kubelet.crt";
pub const ROTATED_SERVER_CERT_FILE: &str = "kubelet-server-current.pem";

/// The kubelet's `--config` file, kept as a loose mapping.
#[derive(Debug, Clone, Default)]
pub struct KubeletConfig {
    values: Mapping,
}

impl KubeletConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ResolutionError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_yaml::from_str::<Value>(content) {
            Ok(Value::Mapping(values)) => Ok(Self { values }),
            Ok(Value::Null) => Ok(Self::default()),
            Ok(_) => Err(ResolutionError::InvalidKubeletConfig(
                "top level is not a mapping".to_string(),
            )),
            Err(e) => Err(ResolutionError::InvalidKubeletConfig(e.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn feature_gate(&self, name: &str) -> Option<bool> {
        match self.get(FEATURE_GATES.option)? {
            Value::Mapping(gates) => gates.get(name).map(value_to_bool),
            _ => None,
        }
    }
}

fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => parse_bool(s),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flags and config file of one kubelet process.
pub struct KubeletSettings<'a> {
    flags: &'a FlagSet,
    config: &'a KubeletConfig,
}

impl<'a> KubeletSettings<'a> {
    pub fn new(flags: &'a FlagSet, config: &'a KubeletConfig) -> Self {
        Self { flags, config }
    }

    pub fn string(&self, setting: Setting) -> Option<String> {
        match self.flags.get(setting.flag) {
            Some(value) => Some(value.to_string()),
            None => self.config.get(setting.option).and_then(value_to_string),
        }
    }

    pub fn bool(&self, setting: Setting) -> bool {
        match self.flags.get(setting.flag) {
            Some(value) => parse_bool(value),
            None => self
                .config
                .get(setting.option)
                .map(value_to_bool)
                .unwrap_or(false),
        }
    }

    pub fn feature_gate(&self, name: &str) -> bool {
        match self.flags.list_entry(FEATURE_GATES.flag, name) {
            Some(value) => parse_bool(value),
            None => self.config.feature_gate(name).unwrap_or(false),
        }
    }

    /// Rotation needs both the legacy switch and the feature gate.
    pub fn server_rotation_enabled(&self) -> bool {
        self.bool(ROTATE_SERVER_CERTIFICATES) && self.feature_gate(ROTATE_SERVER_CERT_FEATURE)
    }

    pub fn server_cert_path(&self) -> PathBuf {
        let cert = self.string(TLS_CERT_FILE).filter(|v| !v.is_empty());
        let key = self.string(TLS_KEY_FILE).filter(|v| !v.is_empty());
        if let (Some(cert), Some(_)) = (cert, key) {
            return PathBuf::from(cert);
        }

        if self.server_rotation_enabled() {
            return Path::new(DEFAULT_CERT_DIR).join(ROTATED_SERVER_CERT_FILE);
        }

        match self.flags.get(CERT_DIR_FLAG).filter(|v| !v.is_empty()) {
            Some(dir) => Path::new(dir).join(SERVER_CERT_FILE),
            None => Path::new(DEFAULT_CERT_DIR).join(SERVER_CERT_FILE),
        }
    }

    pub fn kubeconfig_path(&self) -> Result<PathBuf, ResolutionError> {
        self.string(KUBECONFIG)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or(ResolutionError::MissingKubeconfig)
    }
}
