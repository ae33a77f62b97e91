//! Kubernetes resource builders for kubedock
//!
//! Assembles the Deployment for a container spec from the port, volume and
//! metadata mappers.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::diagnostics::Diagnostics;
use super::metadata::{get_annotations, get_labels, selector_labels};
use super::network::get_container_ports;
use super::volumes::add_volumes;
use crate::models::ContainerSpec;

/// Name of the application container in every pod
pub const MAIN_CONTAINER: &str = "main";

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Build the application container
pub fn create_container(spec: &ContainerSpec, diagnostics: &mut Diagnostics) -> Container {
    let env: Vec<EnvVar> = spec
        .env_pairs()
        .into_iter()
        .map(|(name, value)| EnvVar {
            name,
            value: Some(value),
            ..Default::default()
        })
        .collect();

    Container {
        name: MAIN_CONTAINER.to_string(),
        image: Some(spec.image.clone()).filter(|i| !i.is_empty()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: non_empty(spec.entrypoint.clone()),
        args: non_empty(spec.cmd.clone()),
        env: non_empty(env),
        working_dir: spec.working_dir.clone(),
        ports: non_empty(get_container_ports(spec, diagnostics)),
        ..Default::default()
    }
}

/// Build the pod template: labels, annotations, the main container and its
/// bind mounts.
pub fn create_pod_template(spec: &ContainerSpec, diagnostics: &mut Diagnostics) -> PodTemplateSpec {
    let mut template = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(get_labels(spec)),
            annotations: Some(get_annotations(spec)),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![create_container(spec, diagnostics)],
            restart_policy: Some("Always".to_string()),
            ..Default::default()
        }),
    };
    add_volumes(spec, &mut template, diagnostics);
    template
}

/// Create the single-replica Deployment for a container, named after its
/// short id.
pub fn create_deployment(
    spec: &ContainerSpec,
    namespace: &str,
    diagnostics: &mut Diagnostics,
) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(spec.short_id.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(get_labels(spec)),
            annotations: Some(get_annotations(spec)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels(spec)),
                ..Default::default()
            },
            template: create_pod_template(spec, diagnostics),
            ..Default::default()
        }),
        ..Default::default()
    }
}
