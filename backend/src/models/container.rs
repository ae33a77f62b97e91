//! Container specification handed to the backend by the Docker API layer

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Docker-style description of a container to run as a Kubernetes workload.
///
/// The backend never mutates this; it only projects it into Kubernetes
/// objects. `short_id` is the correlation key used for object names and the
/// `kubedock.containerid` label.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContainerSpec {
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub image: String,
    pub entrypoint: Vec<String>,
    pub cmd: Vec<String>,
    /// Environment in `KEY=VALUE` form
    pub env: Vec<String>,
    pub working_dir: Option<String>,
    /// Bind mounts as `source:dest[:mode]`
    pub binds: Vec<String>,
    /// Ports as `port/proto`, e.g. `8080/tcp`
    pub exposed_ports: BTreeSet<String>,
    /// Ports declared by the image, same shape as `exposed_ports`
    pub image_ports: BTreeSet<String>,
    pub host_ports: BTreeMap<i32, i32>,
    pub network_aliases: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl ContainerSpec {
    /// Label selector matching the pods of this container
    pub fn pod_selector(&self) -> String {
        format!("{}={}", crate::k8s::CONTAINER_ID_LABEL, self.short_id)
    }

    /// Split the `KEY=VALUE` environment into pairs; entries without `=`
    /// become variables with an empty value.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter(|e| !e.is_empty())
            .map(|e| match e.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (e.clone(), String::new()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_yaml_spec() {
        let yaml = r#"
id: rc752aa
short_id: rc752
name: f1spirit
image: alpine:3.18
exposed_ports: ["8080/tcp"]
host_ports:
  8080: 18080
  -300: 300
network_aliases: [tb303]
labels:
  computer: msx
"#;
        let spec: ContainerSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.short_id, "rc752");
        assert!(spec.exposed_ports.contains("8080/tcp"));
        assert_eq!(spec.host_ports.get(&-300), Some(&300));
        assert_eq!(spec.labels.get("computer"), Some(&"msx".to_string()));
        assert!(spec.binds.is_empty());
    }

    #[test]
    fn test_pod_selector() {
        let spec = ContainerSpec {
            short_id: "tr909".to_string(),
            ..Default::default()
        };
        assert_eq!(spec.pod_selector(), "kubedock.containerid=tr909");
    }

    #[test]
    fn test_env_pairs() {
        let spec = ContainerSpec {
            env: vec![
                "A=1".to_string(),
                "B=x=y".to_string(),
                "C".to_string(),
                String::new(),
            ],
            ..Default::default()
        };
        assert_eq!(
            spec.env_pairs(),
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string()),
                ("C".to_string(), String::new()),
            ]
        );
    }
}
