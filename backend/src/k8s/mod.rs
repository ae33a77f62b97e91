//! Kubernetes integration module for kubedock
//!
//! This module turns container specs into cluster objects and back:
//! - Building Deployments, Services, ports and volumes from a container spec
//! - Creating them through a `ClusterApi` handle
//! - Polling pods to resolve Docker-style container state

mod client;
mod deployment;
mod diagnostics;
#[cfg(any(test, feature = "testing"))]
mod fake;
mod metadata;
mod network;
mod resources;
mod status;
mod volumes;

pub use client::{ClusterApi, K8sClient};
pub use deployment::{DeploymentManager, DEFAULT_POLL_INTERVAL};
pub use diagnostics::{Diagnostic, Diagnostics};
#[cfg(any(test, feature = "testing"))]
pub use fake::FakeCluster;
pub use metadata::{
    get_annotations, get_labels, selector_labels, CONTAINER_FULL_ID_ANNOTATION,
    CONTAINER_ID_LABEL, CONTAINER_NAME_LABEL, MANAGED_LABEL,
};
pub use network::{get_container_ports, get_service_ports, get_services, is_valid_alias, parse_port};
pub use resources::{create_container, create_deployment, create_pod_template, MAIN_CONTAINER};
pub use status::{resolve_pod, resolve_pod_status, DeployState, COMPLETED_REASON};
pub use volumes::{add_volumes, parse_bind, Bind};
