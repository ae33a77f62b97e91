//! In-memory stand-in for the Kubernetes API
//!
//! Behaves like a bare API server without controllers: objects are stored as
//! given, names are unique per namespace and kind, obviously invalid objects
//! are rejected, and nothing ever creates pods on its own; tests seed pods
//! with the status they need.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::client::ClusterApi;
use crate::error::{BackendError, Result};

const DEFAULT_NAMESPACE: &str = "default";

type Key = (String, String);

#[derive(Default)]
struct FakeState {
    deployments: BTreeMap<Key, Deployment>,
    services: BTreeMap<Key, Service>,
    pods: Vec<Pod>,
}

/// Test double for `ClusterApi`, only built with the `testing` feature
#[derive(Default)]
pub struct FakeCluster {
    state: RwLock<FakeState>,
}

fn key_of(metadata: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> Key {
    (
        metadata
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        metadata.name.clone().unwrap_or_default(),
    )
}

fn invalid(kind: &'static str, name: &str, reason: &str) -> BackendError {
    BackendError::Invalid {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_deployment(name: &str, deployment: &Deployment) -> Result<()> {
    if name.is_empty() {
        return Err(invalid("deployment", name, "metadata.name: Required value"));
    }
    let pod_spec = deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .ok_or_else(|| invalid("deployment", name, "spec.template.spec: Required value"))?;
    if pod_spec.containers.is_empty() {
        return Err(invalid(
            "deployment",
            name,
            "spec.template.spec.containers: Required value",
        ));
    }
    for container in &pod_spec.containers {
        if container.name.is_empty() {
            return Err(invalid(
                "deployment",
                name,
                "spec.template.spec.containers.name: Required value",
            ));
        }
        if container.image.as_deref().unwrap_or_default().is_empty() {
            return Err(invalid(
                "deployment",
                name,
                "spec.template.spec.containers.image: Required value",
            ));
        }
    }
    Ok(())
}

fn validate_service(name: &str, service: &Service) -> Result<()> {
    if name.is_empty() {
        return Err(invalid("service", name, "metadata.name: Required value"));
    }
    let has_ports = service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .is_some_and(|p| !p.is_empty());
    if !has_ports {
        return Err(invalid("service", name, "spec.ports: Required value"));
    }
    Ok(())
}

/// Match an equality-based selector (`k=v`, `k==v`, comma separated)
fn matches_selector(pod: &Pod, selector: &str) -> bool {
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            let (key, value) = match term.split_once("==").or_else(|| term.split_once('=')) {
                Some(kv) => kv,
                None => return labels.contains_key(term),
            };
            labels.get(key.trim()).map(String::as_str) == Some(value.trim())
        })
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing deployment
    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        let key = key_of(&deployment.metadata);
        self.state.get_mut().deployments.insert(key, deployment);
        self
    }

    /// Seed an existing pod
    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.state.get_mut().pods.push(pod);
        self
    }

    /// Add a pod after construction, as the cluster's controllers would
    pub async fn add_pod(&self, pod: Pod) {
        self.state.write().await.pods.push(pod);
    }

    pub async fn deployments(&self) -> Vec<Deployment> {
        self.state.read().await.deployments.values().cloned().collect()
    }

    pub async fn services(&self) -> Vec<Service> {
        self.state.read().await.services.values().cloned().collect()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        validate_deployment(&name, deployment)?;

        let mut state = self.state.write().await;
        let key = (namespace.to_string(), name.clone());
        if state.deployments.contains_key(&key) {
            return Err(BackendError::Conflict {
                kind: "deployment",
                name,
            });
        }

        let mut created = deployment.clone();
        created.metadata.namespace = Some(namespace.to_string());
        state.deployments.insert(key, created.clone());
        Ok(created)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let state = self.state.read().await;
        Ok(state
            .deployments
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let state = self.state.read().await;
        Ok(state
            .pods
            .iter()
            .filter(|pod| {
                pod.metadata.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE) == namespace
            })
            .filter(|pod| matches_selector(pod, label_selector))
            .cloned()
            .collect())
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service> {
        let name = service.metadata.name.clone().unwrap_or_default();
        validate_service(&name, service)?;

        let mut state = self.state.write().await;
        let key = (namespace.to_string(), name.clone());
        if state.services.contains_key(&key) {
            return Err(BackendError::Conflict {
                kind: "service",
                name,
            });
        }

        let mut created = service.clone();
        created.metadata.namespace = Some(namespace.to_string());
        state.services.insert(key, created.clone());
        Ok(created)
    }
}
