//! Error types for the deployment backend
//!
//! Every failure the orchestration engine reports is a `BackendError`. Callers
//! that need the Docker-style view only look at `kind()`.

use strum::Display;
use thiserror::Error;

/// Coarse classification of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Object with the target name already exists
    Conflict,
    /// Object was rejected as structurally invalid
    Validation,
    /// Expected object never appeared within the attempt budget
    NotFoundTimeout,
    /// Pod or container reported an unrecoverable runtime signal
    RuntimeFailure,
    /// Any other cluster API failure
    Api,
    /// Configuration could not be loaded
    Config,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{kind} {name} already exists")]
    Conflict { kind: &'static str, name: String },

    #[error("invalid {kind} {name}: {reason}")]
    Invalid {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("deployment {0} does not exist")]
    NotDeployed(String),

    #[error("timeout waiting for {what} after {attempts} attempts")]
    Timeout { what: String, attempts: u32 },

    #[error("pod {pod} failed: {reason}")]
    PodFailed { pod: String, reason: String },

    #[error("container {container} in pod {pod} restarted {count} time(s)")]
    ContainerRestarted {
        pod: String,
        container: String,
        count: i32,
    },

    #[error("init container {name} not present in pod {pod}")]
    InitContainerMissing { pod: String, name: String },

    #[error("init container {name} in pod {pod} terminated before reaching running state")]
    InitContainerTerminated { pod: String, name: String },

    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to infer cluster config: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl BackendError {
    /// Classify a raw kube error by its HTTP status
    pub fn from_api(kind: &'static str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 409 => BackendError::Conflict {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(ref resp) if resp.code == 422 => BackendError::Invalid {
                kind,
                name: name.to_string(),
                reason: resp.message.clone(),
            },
            other => BackendError::Kube(other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Conflict { .. } => ErrorKind::Conflict,
            BackendError::Invalid { .. } => ErrorKind::Validation,
            BackendError::NotDeployed(_) | BackendError::Timeout { .. } => {
                ErrorKind::NotFoundTimeout
            }
            BackendError::PodFailed { .. }
            | BackendError::ContainerRestarted { .. }
            | BackendError::InitContainerMissing { .. }
            | BackendError::InitContainerTerminated { .. } => ErrorKind::RuntimeFailure,
            BackendError::Kube(_) => ErrorKind::Api,
            BackendError::Kubeconfig(_)
            | BackendError::InferConfig(_)
            | BackendError::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
