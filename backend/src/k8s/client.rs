//! Kubernetes client wrapper for kubedock

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{
    api::{Api, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use std::path::Path;
use tracing::{info, instrument};

use crate::error::{BackendError, Result};

/// The slice of the Kubernetes API the backend needs: namespace-scoped
/// create/get/list on Deployments, Pods and Services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create a deployment; fails with `Conflict` when the name is taken
    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment>;

    /// Get a deployment by name, `None` when it does not exist
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>>;

    /// List pods matching an equality label selector (`k=v[,k=v]`)
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    /// Create a service; fails with `Conflict` when the name is taken
    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service>;
}

/// Wrapper around kube::Client talking to a live cluster
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a new K8sClient using the default kubeconfig or in-cluster config
    #[instrument(skip_all)]
    pub async fn new() -> Result<Self> {
        let config = Config::infer().await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self { client })
    }

    /// Create a K8sClient from an explicit kubeconfig file
    #[instrument(skip_all, fields(kubeconfig = %path.display()))]
    pub async fn from_kubeconfig(path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self { client })
    }

    /// Check if cluster is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let version = self.client.apiserver_version().await?;
        info!(version = %version.git_version, "Kubernetes cluster is healthy");
        Ok(true)
    }
}

#[async_trait]
impl ClusterApi for K8sClient {
    #[instrument(skip(self, deployment), fields(name = %deployment.metadata.name.as_deref().unwrap_or("unknown")))]
    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment> {
        let name = deployment.metadata.name.as_deref().unwrap_or_default();
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let created = api
            .create(&PostParams::default(), deployment)
            .await
            .map_err(|e| BackendError::from_api("deployment", name, e))?;
        info!("Created deployment");
        Ok(created)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list.items)
    }

    #[instrument(skip(self, service), fields(name = %service.metadata.name.as_deref().unwrap_or("unknown")))]
    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service> {
        let name = service.metadata.name.as_deref().unwrap_or_default();
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let created = api
            .create(&PostParams::default(), service)
            .await
            .map_err(|e| BackendError::from_api("service", name, e))?;
        info!("Created service");
        Ok(created)
    }
}
