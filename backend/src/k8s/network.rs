//! Port and network alias mapping
//!
//! Derives container ports and per-alias Services from the Docker-style port
//! declarations of a container.

use k8s_openapi::api::core::v1::{ContainerPort, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

use super::diagnostics::{Diagnostic, Diagnostics};
use super::metadata::{get_labels, selector_labels};
use crate::models::ContainerSpec;

const MAX_DNS_LABEL_LEN: usize = 63;

/// Parse a `port[/proto]` key into a port number and Kubernetes protocol.
///
/// Unknown or absent protocols map to TCP.
pub fn parse_port(key: &str) -> Option<(i32, &'static str)> {
    let (port, proto) = match key.split_once('/') {
        Some((port, proto)) => (port, proto),
        None => (key, "tcp"),
    };
    let port = parse_port_number(port.trim())?;
    Some((port, protocol_name(proto)))
}

fn parse_port_number(value: &str) -> Option<i32> {
    match value.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(i32::from(port)),
    }
}

fn protocol_name(proto: &str) -> &'static str {
    match proto.trim().to_ascii_lowercase().as_str() {
        "udp" => "UDP",
        "sctp" => "SCTP",
        _ => "TCP",
    }
}

fn is_valid_port(port: i32) -> bool {
    (1..=i32::from(u16::MAX)).contains(&port)
}

/// Check whether an alias can name a Service: an RFC 1035 label, i.e.
/// lowercase alphanumerics and `-`, starting with a letter and ending with an
/// alphanumeric, at most 63 characters.
pub fn is_valid_alias(alias: &str) -> bool {
    let bytes = alias.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    bytes.len() <= MAX_DNS_LABEL_LEN
        && first.is_ascii_lowercase()
        && (last.is_ascii_lowercase() || last.is_ascii_digit())
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

/// Container ports for the main container, one per exposed port key
pub fn get_container_ports(spec: &ContainerSpec, diagnostics: &mut Diagnostics) -> Vec<ContainerPort> {
    spec.exposed_ports
        .iter()
        .filter_map(|key| match parse_port(key) {
            Some((port, protocol)) => Some(ContainerPort {
                container_port: port,
                protocol: Some(protocol.to_string()),
                ..Default::default()
            }),
            None => {
                diagnostics.push(Diagnostic::InvalidPort(key.clone()));
                None
            }
        })
        .collect()
}

/// Valid network aliases of a container, in declaration order
pub fn valid_aliases<'a>(spec: &'a ContainerSpec, diagnostics: &mut Diagnostics) -> Vec<&'a str> {
    spec.network_aliases
        .iter()
        .filter_map(|alias| {
            if is_valid_alias(alias) {
                Some(alias.as_str())
            } else {
                diagnostics.push(Diagnostic::InvalidAlias(alias.clone()));
                None
            }
        })
        .collect()
}

/// Unified service port list of a container, sorted by name.
///
/// Exposed ports, image ports and host-port entries are merged by port
/// number; the first source of a number decides its protocol. A host-port
/// entry contributes its key, or its value when the key is not a usable port.
pub fn get_service_ports(spec: &ContainerSpec, diagnostics: &mut Diagnostics) -> Vec<ServicePort> {
    let mut ports: BTreeMap<i32, &'static str> = BTreeMap::new();

    for key in spec.exposed_ports.iter().chain(spec.image_ports.iter()) {
        match parse_port(key) {
            Some((port, protocol)) => {
                ports.entry(port).or_insert(protocol);
            }
            None => diagnostics.push(Diagnostic::InvalidPort(key.clone())),
        }
    }

    for (&key, &value) in &spec.host_ports {
        let port = if is_valid_port(key) { key } else { value };
        if is_valid_port(port) {
            ports.entry(port).or_insert("TCP");
        } else {
            diagnostics.push(Diagnostic::InvalidPort(format!("{}:{}", key, value)));
        }
    }

    let mut service_ports: Vec<ServicePort> = ports
        .into_iter()
        .map(|(port, protocol)| ServicePort {
            name: Some(format!("{}-{}-{}", protocol.to_ascii_lowercase(), port, port)),
            protocol: Some(protocol.to_string()),
            port,
            target_port: Some(IntOrString::Int(port)),
            ..Default::default()
        })
        .collect();
    service_ports.sort_by(|a, b| a.name.cmp(&b.name));
    service_ports
}

/// Create one ClusterIP Service per valid network alias.
///
/// Containers without valid aliases, or without any declared port, get no
/// Services at all.
pub fn get_services(spec: &ContainerSpec, diagnostics: &mut Diagnostics) -> Vec<Service> {
    let aliases = valid_aliases(spec, diagnostics);
    if aliases.is_empty() {
        return vec![];
    }

    let ports = get_service_ports(spec, diagnostics);
    if ports.is_empty() {
        return vec![];
    }

    let labels = get_labels(spec);
    let selector = selector_labels(spec);

    aliases
        .into_iter()
        .map(|alias| Service {
            metadata: ObjectMeta {
                name: Some(alias.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                selector: Some(selector.clone()),
                ports: Some(ports.clone()),
                type_: Some("ClusterIP".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(keys: &[&str]) -> std::collections::BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("909/tcp"), Some((909, "TCP")));
        assert_eq!(parse_port("53/udp"), Some((53, "UDP")));
        assert_eq!(parse_port("53/UDP"), Some((53, "UDP")));
        assert_eq!(parse_port("80"), Some((80, "TCP")));
        assert_eq!(parse_port("80/quic"), Some((80, "TCP")));
        assert_eq!(parse_port("0/tcp"), None);
        assert_eq!(parse_port("70000/tcp"), None);
        assert_eq!(parse_port("http/tcp"), None);
    }

    #[test]
    fn test_is_valid_alias() {
        assert!(is_valid_alias("tb303"));
        assert!(is_valid_alias("my-db"));
        assert!(!is_valid_alias("tb303_"));
        assert!(!is_valid_alias("303"));
        assert!(!is_valid_alias("3db"));
        assert!(!is_valid_alias("-db"));
        assert!(!is_valid_alias("db-"));
        assert!(!is_valid_alias("Db"));
        assert!(!is_valid_alias("db.local"));
        assert!(!is_valid_alias(""));
        assert!(!is_valid_alias(&"a".repeat(64)));
    }

    #[test]
    fn test_container_ports() {
        let mut diags = Diagnostics::new();
        assert!(get_container_ports(&ContainerSpec::default(), &mut diags).is_empty());

        let spec = ContainerSpec {
            exposed_ports: ports(&["909/tcp", "53/udp", "bogus"]),
            ..Default::default()
        };
        let result = get_container_ports(&spec, &mut diags);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].container_port, 53);
        assert_eq!(result[0].protocol.as_deref(), Some("UDP"));
        assert_eq!(result[1].container_port, 909);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_service_ports_dedup_by_number() {
        let spec = ContainerSpec {
            exposed_ports: ports(&["100/tcp"]),
            image_ports: ports(&["100/tcp"]),
            host_ports: [(100, 100)].into_iter().collect(),
            ..Default::default()
        };
        let result = get_service_ports(&spec, &mut Diagnostics::new());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name.as_deref(), Some("tcp-100-100"));
    }

    #[test]
    fn test_service_ports_udp_name() {
        let spec = ContainerSpec {
            exposed_ports: ports(&["53/udp"]),
            ..Default::default()
        };
        let result = get_service_ports(&spec, &mut Diagnostics::new());
        assert_eq!(result[0].name.as_deref(), Some("udp-53-53"));
        assert_eq!(result[0].protocol.as_deref(), Some("UDP"));
    }

    #[test]
    fn test_services_skip_invalid_aliases_individually() {
        let mut diags = Diagnostics::new();
        let spec = ContainerSpec {
            short_id: "tr909".to_string(),
            network_aliases: vec!["tb303_".to_string(), "tr909".to_string()],
            exposed_ports: ports(&["100/tcp"]),
            ..Default::default()
        };
        let services = get_services(&spec, &mut diags);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].metadata.name.as_deref(), Some("tr909"));
        assert_eq!(diags.iter().next(), Some(&Diagnostic::InvalidAlias("tb303_".to_string())));

        let selector = services[0].spec.as_ref().unwrap().selector.as_ref().unwrap();
        assert_eq!(selector.get("kubedock.containerid"), Some(&"tr909".to_string()));
    }

    #[test]
    fn test_services_need_ports() {
        let spec = ContainerSpec {
            network_aliases: vec!["tb303".to_string()],
            ..Default::default()
        };
        assert!(get_services(&spec, &mut Diagnostics::new()).is_empty());
    }
}
