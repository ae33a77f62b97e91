//! Deployment manager for container deployments
//!
//! Handles the lifecycle of a container deployed as a Kubernetes Deployment:
//! creating the objects and polling the cluster until the container reaches
//! a Docker-style state.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::client::ClusterApi;
use super::diagnostics::Diagnostics;
use super::network::get_services;
use super::resources::create_deployment;
use super::status::{resolve_pod, DeployState, FAILED_PHASE, PENDING_PHASE};
use crate::error::{BackendError, Result};
use crate::models::ContainerSpec;

/// Default delay between two poll attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Manages the deployment of containers to Kubernetes.
///
/// Cheap to clone; every clone shares the same client handle. All operations
/// return `Result<DeployState>`, where an error always stands for
/// `DeployState::Failed` (see `DeployState::from_result`).
#[derive(Clone)]
pub struct DeploymentManager {
    cli: Arc<dyn ClusterApi>,
    namespace: String,
    poll_interval: Duration,
}

fn log_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        warn!(%diagnostic, "Ignoring part of the container spec");
    }
}

impl DeploymentManager {
    /// Create a new deployment manager
    pub fn new(cli: Arc<dyn ClusterApi>, namespace: impl Into<String>) -> Self {
        Self {
            cli,
            namespace: namespace.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Use a different delay between poll attempts
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create the Deployment and the alias Services of a container.
    ///
    /// Does not wait for the container; on success the state is `Pending`
    /// and callers follow up with `wait_ready_state`. A name clash or a
    /// rejected object fails without creating any Service.
    #[instrument(skip(self, spec), fields(container = %spec.short_id, namespace = %self.namespace))]
    pub async fn start_container(&self, spec: &ContainerSpec) -> Result<DeployState> {
        let mut diagnostics = Diagnostics::new();
        let deployment = create_deployment(spec, &self.namespace, &mut diagnostics);
        let services = get_services(spec, &mut diagnostics);
        log_diagnostics(&diagnostics);

        self.cli.create_deployment(&self.namespace, &deployment).await?;

        for service in &services {
            self.cli.create_service(&self.namespace, service).await?;
        }

        info!(services = services.len(), "Started container");
        Ok(DeployState::Pending)
    }

    /// Take one look at the cluster and resolve the container state.
    ///
    /// `Ok(None)` means nothing conclusive yet.
    async fn observe(&self, spec: &ContainerSpec) -> Result<Option<DeployState>> {
        let pods = self
            .cli
            .list_pods(&self.namespace, &spec.pod_selector())
            .await?;

        if pods.is_empty() {
            if self
                .cli
                .get_deployment(&self.namespace, &spec.short_id)
                .await?
                .is_none()
            {
                return Err(BackendError::NotDeployed(spec.short_id.clone()));
            }
            return Ok(None);
        }

        let states = pods
            .iter()
            .filter_map(|pod| resolve_pod(pod).transpose())
            .collect::<Result<Vec<_>>>()?;

        if states.contains(&DeployState::Completed) {
            Ok(Some(DeployState::Completed))
        } else if states.contains(&DeployState::Running) {
            Ok(Some(DeployState::Running))
        } else {
            Ok(None)
        }
    }

    /// Current state of a container without waiting
    #[instrument(skip(self, spec), fields(container = %spec.short_id))]
    pub async fn get_container_state(&self, spec: &ContainerSpec) -> Result<DeployState> {
        Ok(self.observe(spec).await?.unwrap_or(DeployState::Pending))
    }

    /// Poll until the container is running, has completed, or has failed.
    ///
    /// A missing Deployment, a failed pod or any container restart ends the
    /// poll immediately with an error. Exhausting `max_attempts` is an error.
    #[instrument(skip(self, spec), fields(container = %spec.short_id))]
    pub async fn wait_ready_state(&self, spec: &ContainerSpec, max_attempts: u32) -> Result<DeployState> {
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.poll_interval).await;
            }

            if let Some(state) = self.observe(spec).await? {
                info!(%state, attempt, "Container reached state");
                return Ok(state);
            }
            debug!(attempt, max_attempts, "Container not ready yet");
        }

        Err(BackendError::Timeout {
            what: format!("container {}", spec.short_id),
            attempts: max_attempts,
        })
    }

    /// Poll until the named init container of the container's pod is running.
    ///
    /// Fails immediately when the pod has failed, when it lists no init
    /// container named `init_name`, or when that init container has already
    /// terminated. A pod that is still pending without any container status
    /// is polled again.
    ///
    /// The built Deployment has no init containers; this serves callers that
    /// add their own, such as a `setup` container that prepares volumes.
    #[instrument(skip(self, spec), fields(container = %spec.short_id))]
    pub async fn wait_init_container_running(
        &self,
        spec: &ContainerSpec,
        init_name: &str,
        max_attempts: u32,
    ) -> Result<()> {
        let selector = spec.pod_selector();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.poll_interval).await;
            }

            let pods = self.cli.list_pods(&self.namespace, &selector).await?;
            for pod in &pods {
                let pod_name = pod.metadata.name.clone().unwrap_or_default();
                let Some(status) = &pod.status else {
                    continue;
                };

                if status.phase.as_deref() == Some(FAILED_PHASE) {
                    return Err(BackendError::PodFailed {
                        pod: pod_name,
                        reason: status
                            .reason
                            .clone()
                            .unwrap_or_else(|| "pod phase is Failed".to_string()),
                    });
                }

                let statuses = status.init_container_statuses.as_deref().unwrap_or_default();
                // init statuses may lag behind a pod that is still scheduling
                let scheduling = matches!(status.phase.as_deref(), None | Some(PENDING_PHASE))
                    && status.container_statuses.as_deref().unwrap_or_default().is_empty();
                if statuses.is_empty() && scheduling {
                    continue;
                }

                let Some(init) = statuses.iter().find(|s| s.name == init_name) else {
                    return Err(BackendError::InitContainerMissing {
                        pod: pod_name,
                        name: init_name.to_string(),
                    });
                };

                let state = init.state.as_ref();
                if state.and_then(|s| s.running.as_ref()).is_some() {
                    info!(init_container = init_name, attempt, "Init container running");
                    return Ok(());
                }
                if state.and_then(|s| s.terminated.as_ref()).is_some() {
                    return Err(BackendError::InitContainerTerminated {
                        pod: pod_name,
                        name: init_name.to_string(),
                    });
                }
            }
            debug!(attempt, max_attempts, init_container = init_name, "Init container not running yet");
        }

        Err(BackendError::Timeout {
            what: format!("init container {} of {}", init_name, spec.short_id),
            attempts: max_attempts,
        })
    }
}
