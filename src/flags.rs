// src/flags.rs
//
// Command-line flags of a Kubernetes component, as seen in a pod spec or
// in /proc/<pid>/cmdline. Only `--name[=value]` arguments are kept.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flags: Vec<(String, String)>,
}

impl FlagSet {
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let flags = args
            .into_iter()
            .filter_map(|arg| parse_flag(arg.as_ref()))
            .collect();
        Self { flags }
    }

    /// Parses a raw /proc cmdline. Arguments are NUL separated; text
    /// without NULs is split on whitespace instead.
    pub fn from_cmdline(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        if text.contains('\0') {
            Self::parse(text.split('\0'))
        } else {
            Self::parse(text.split_whitespace())
        }
    }

    /// Value of the last occurrence of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn first_nonempty(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    /// Looks up one entry of a comma separated `key=value` list flag such
    /// as `--feature-gates`.
    pub fn list_entry(&self, name: &str, key: &str) -> Option<&str> {
        self.get(name)?
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(k, _)| k.trim() == key)
            .last()
            .map(|(_, v)| v.trim())
    }
}

fn parse_flag(arg: &str) -> Option<(String, String)> {
    let arg = arg.trim_matches(|c| c == '\0' || c == '\n');
    let body = arg.strip_prefix("--")?;
    if body.is_empty() {
        return None;
    }
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name, value.trim_matches('\n')),
        None => (body, "true"),
    };
    Some((name.to_string(), value.to_string()))
}

/// Truthiness the way Kubernetes components read boolean flags.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "t" | "T" | "true" | "TRUE" | "True")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBELET_CMDLINE: &str = "/usr/bin/kubelet\0--bootstrap-kubeconfig=/etc/kubernetes/bootstrap-kubelet.conf\0--kubeconfig=/etc/kubernetes/kubelet.conf\0--config=/var/lib/kubelet/config.yaml\0--cgroup-driver=systemd\0--network-plugin=cni\0--feature-gates=RotateKubeletServerCertificate=true\0--allowed-unsafe-sysctls=net.*\0";

    #[test]
    fn parses_kubelet_cmdline() {
        let flags = FlagSet::from_cmdline(KUBELET_CMDLINE.as_bytes());

        assert_eq!(flags.get("config"), Some("/var/lib/kubelet/config.yaml"));
        assert_eq!(flags.get("kubeconfig"), Some("/etc/kubernetes/kubelet.conf"));
        assert_eq!(flags.get("cert-dir"), None);
        assert_eq!(flags.get("tls-cert-file"), None);
        assert_eq!(
            flags.get("feature-gates"),
            Some("RotateKubeletServerCertificate=true")
        );
        assert_eq!(
            flags.list_entry("feature-gates", "RotateKubeletServerCertificate"),
            Some("true")
        );
        assert_eq!(flags.get("allowed-unsafe-sysctls"), Some("net.*"));
    }

    #[test]
    fn whitespace_cmdline_fallback() {
        let flags = FlagSet::from_cmdline(b"kubelet --cert-dir=/d --rotate-server-certificates\n");
        assert_eq!(flags.get("cert-dir"), Some("/d"));
        assert_eq!(flags.get("rotate-server-certificates"), Some("true"));
    }

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let flags = FlagSet::parse(["--feature-gates=A=true,B=false"]);
        assert_eq!(flags.get("feature-gates"), Some("A=true,B=false"));
        assert_eq!(flags.list_entry("feature-gates", "B"), Some("false"));
        assert_eq!(flags.list_entry("feature-gates", "C"), None);
    }

    #[test]
    fn last_occurrence_wins_but_first_nonempty_is_available() {
        let flags = FlagSet::parse([
            "kube-apiserver",
            "--kubelet-certificate-authority=",
            "--kubelet-certificate-authority=/etc/kubernetes/pki/ca.crt",
            "--kubelet-certificate-authority=/other",
            "-v",
        ]);
        assert_eq!(flags.get("kubelet-certificate-authority"), Some("/other"));
        assert_eq!(
            flags.first_nonempty("kubelet-certificate-authority"),
            Some("/etc/kubernetes/pki/ca.crt")
        );
        assert_eq!(flags.get("v"), None);
    }

    #[test]
    fn bool_parsing_matches_kubernetes() {
        for truthy in ["1", "t", "T", "true", "TRUE", "True"] {
            assert!(parse_bool(truthy), "{truthy}");
        }
        for falsy in ["0", "false", "yes", "", "on"] {
            assert!(!parse_bool(falsy), "{falsy}");
        }
    }
}
