//! Docker-style state resolution from Kubernetes pod status

use k8s_openapi::api::core::v1::{Pod, PodStatus};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{BackendError, Result};

/// Termination reason of a container that ran to completion
pub const COMPLETED_REASON: &str = "Completed";
pub(crate) const FAILED_PHASE: &str = "Failed";
pub(crate) const PENDING_PHASE: &str = "Pending";

/// Lifecycle state of a deployed container
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeployState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl DeployState {
    /// Collapse an operation result into the state a caller reports; any
    /// error means `Failed`.
    pub fn from_result(result: &Result<DeployState>) -> DeployState {
        match result {
            Ok(state) => *state,
            Err(_) => DeployState::Failed,
        }
    }
}

/// Resolve the state of one pod.
///
/// Precedence is fixed: a failed phase beats any restart, a restart beats a
/// completed container, and completion beats readiness. `Ok(None)` means the
/// pod has not reached a conclusive state yet.
pub fn resolve_pod_status(pod_name: &str, status: &PodStatus) -> Result<Option<DeployState>> {
    if status.phase.as_deref() == Some(FAILED_PHASE) {
        let reason = status
            .reason
            .clone()
            .or_else(|| status.message.clone())
            .unwrap_or_else(|| "pod phase is Failed".to_string());
        return Err(BackendError::PodFailed {
            pod: pod_name.to_string(),
            reason,
        });
    }

    let statuses = status.container_statuses.as_deref().unwrap_or_default();

    // any restart is treated as a crash loop
    if let Some(cs) = statuses.iter().find(|cs| cs.restart_count > 0) {
        return Err(BackendError::ContainerRestarted {
            pod: pod_name.to_string(),
            container: cs.name.clone(),
            count: cs.restart_count,
        });
    }

    let completed = statuses.iter().any(|cs| {
        cs.last_state
            .as_ref()
            .and_then(|s| s.terminated.as_ref())
            .and_then(|t| t.reason.as_deref())
            == Some(COMPLETED_REASON)
    });
    if completed {
        return Ok(Some(DeployState::Completed));
    }

    if !statuses.is_empty() && statuses.iter().all(|cs| cs.ready) {
        return Ok(Some(DeployState::Running));
    }

    Ok(None)
}

/// Resolve the state of a pod object; pods without status are undecided
pub fn resolve_pod(pod: &Pod) -> Result<Option<DeployState>> {
    let name = pod.metadata.name.as_deref().unwrap_or("unknown");
    match &pod.status {
        Some(status) => resolve_pod_status(name, status),
        None => Ok(None),
    }
}
