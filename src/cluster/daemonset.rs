// src/cluster/daemonset.rs
use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    DaemonSet, DaemonSetSpec, DaemonSetUpdateStrategy, RollingUpdateDaemonSet,
};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, HostPathVolumeSource, ObjectFieldSelector, PodSpec,
    PodTemplateSpec, Toleration, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;

use crate::config::AgentConfig;

/// Where the host's /proc is mounted in the agent container.
pub const HOST_PROC_MOUNT: &str = "/tmp/proc";

struct HostMount {
    name: &'static str,
    host_path: &'static str,
    mount_path: &'static str,
    kind: &'static str,
}

const HOST_MOUNTS: &[HostMount] = &[
    HostMount {
        name: "etc-kubernetes",
        host_path: "/etc/kubernetes",
        mount_path: "/etc/kubernetes",
        kind: "Directory",
    },
    HostMount {
        name: "var-lib-kubelet",
        host_path: "/var/lib/kubelet",
        mount_path: "/var/lib/kubelet",
        kind: "Directory",
    },
    HostMount {
        name: "etc-hostname",
        host_path: "/etc/hostname",
        mount_path: "/etc/hostname",
        kind: "File",
    },
    HostMount {
        name: "host-proc",
        host_path: "/proc",
        mount_path: HOST_PROC_MOUNT,
        kind: "Directory",
    },
];

/// One agent pod per node, idling until the orchestrator execs the report
/// command in it.
pub fn agent_daemonset(agent: &AgentConfig) -> DaemonSet {
    let labels: BTreeMap<String, String> = [("app".to_string(), agent.name.clone())].into();

    let volumes = HOST_MOUNTS
        .iter()
        .map(|m| Volume {
            name: m.name.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: m.host_path.to_string(),
                type_: Some(m.kind.to_string()),
            }),
            ..Default::default()
        })
        .collect();

    let volume_mounts = HOST_MOUNTS
        .iter()
        .map(|m| VolumeMount {
            name: m.name.to_string(),
            mount_path: m.mount_path.to_string(),
            read_only: Some(true),
            ..Default::default()
        })
        .collect();

    let container = Container {
        name: agent.name.clone(),
        image: Some(agent.image.clone()),
        image_pull_policy: Some(agent.image_pull_policy.clone()),
        command: Some(agent.idle_command.clone()),
        env: Some(vec![EnvVar {
            name: "NODENAME".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "spec.nodeName".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        volume_mounts: Some(volume_mounts),
        ..Default::default()
    };

    DaemonSet {
        metadata: ObjectMeta {
            name: Some(agent.name.clone()),
            namespace: Some(agent.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            update_strategy: Some(DaemonSetUpdateStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDaemonSet {
                    max_unavailable: Some(IntOrString::String("100%".to_string())),
                    ..Default::default()
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    host_pid: Some(true),
                    host_network: Some(true),
                    tolerations: Some(vec![Toleration {
                        operator: Some("Exists".to_string()),
                        ..Default::default()
                    }]),
                    containers: vec![container],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_spec(ds: &DaemonSet) -> &PodSpec {
        ds.spec.as_ref().unwrap().template.spec.as_ref().unwrap()
    }

    #[test]
    fn selector_matches_template_labels() {
        let ds = agent_daemonset(&AgentConfig::default());
        let spec = ds.spec.as_ref().unwrap();

        let selector = spec.selector.match_labels.as_ref().unwrap();
        let template = spec.template.metadata.as_ref().unwrap().labels.as_ref().unwrap();
        assert_eq!(selector, template);
        assert_eq!(selector.get("app").map(String::as_str), Some("check-cert-agent"));
        assert_eq!(ds.metadata.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn runs_in_host_namespaces_on_every_node() {
        let ds = agent_daemonset(&AgentConfig::default());
        let pod = pod_spec(&ds);

        assert_eq!(pod.host_pid, Some(true));
        assert_eq!(pod.host_network, Some(true));
        let tolerations = pod.tolerations.as_ref().unwrap();
        assert_eq!(tolerations.len(), 1);
        assert_eq!(tolerations[0].operator.as_deref(), Some("Exists"));

        let rolling = ds
            .spec
            .as_ref()
            .unwrap()
            .update_strategy
            .as_ref()
            .unwrap()
            .rolling_update
            .as_ref()
            .unwrap();
        assert_eq!(
            rolling.max_unavailable,
            Some(IntOrString::String("100%".to_string()))
        );
    }

    #[test]
    fn host_paths_are_mounted_read_only() {
        let ds = agent_daemonset(&AgentConfig::default());
        let pod = pod_spec(&ds);
        let container = &pod.containers[0];

        let mounts = container.volume_mounts.as_ref().unwrap();
        assert!(mounts.iter().all(|m| m.read_only == Some(true)));
        let proc_mount = mounts.iter().find(|m| m.name == "host-proc").unwrap();
        assert_eq!(proc_mount.mount_path, HOST_PROC_MOUNT);

        let host_type = |name: &str| {
            pod.volumes
                .as_ref()
                .unwrap()
                .iter()
                .find(|v| v.name == name)
                .and_then(|v| v.host_path.as_ref())
                .and_then(|h| h.type_.clone())
        };
        assert_eq!(host_type("etc-hostname").as_deref(), Some("File"));
        for dir in ["etc-kubernetes", "var-lib-kubelet", "host-proc"] {
            assert_eq!(host_type(dir).as_deref(), Some("Directory"), "{dir}");
        }
    }

    #[test]
    fn container_idles_and_knows_its_node() {
        let mut agent = AgentConfig::default();
        agent.image = "registry.local/cert-agent:0.3".to_string();
        let ds = agent_daemonset(&agent);
        let container = &pod_spec(&ds).containers[0];

        assert_eq!(container.image.as_deref(), Some("registry.local/cert-agent:0.3"));
        assert_eq!(container.command.as_ref(), Some(&agent.idle_command));
        let env = &container.env.as_ref().unwrap()[0];
        assert_eq!(env.name, "NODENAME");
        assert_eq!(
            env.value_from
                .as_ref()
                .and_then(|v| v.field_ref.as_ref())
                .map(|f| f.field_path.as_str()),
            Some("spec.nodeName")
        );
    }
}
