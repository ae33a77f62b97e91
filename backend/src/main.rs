use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kubedock_backend::{
    config::Config,
    k8s::{create_deployment, get_services, DeployState, DeploymentManager, Diagnostics, K8sClient},
    models::ContainerSpec,
};

#[derive(Parser)]
#[command(name = "kubedock-backend", version, about = "Run a container spec as a Kubernetes deployment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the deployment for a container spec and wait for its state
    Deploy { spec: PathBuf },
    /// Print the objects a container spec maps to, without a cluster
    Render { spec: PathBuf },
    /// Print the current state of a deployed container spec
    Status { spec: PathBuf },
}

fn load_spec(path: &Path) -> Result<ContainerSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let spec = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&raw).context("Failed to parse container spec")?
    } else {
        serde_yaml::from_str(&raw).context("Failed to parse container spec")?
    };
    Ok(spec)
}

fn init_tracing(config: &Config) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );
    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect(config: &Config) -> Result<DeploymentManager> {
    let client = match &config.kubeconfig {
        Some(path) => K8sClient::from_kubeconfig(Path::new(path)).await,
        None => K8sClient::new().await,
    }
    .context("Failed to connect to Kubernetes")?;
    client
        .health_check()
        .await
        .context("Kubernetes cluster is not reachable")?;

    Ok(DeploymentManager::new(Arc::new(client), config.namespace.clone())
        .with_poll_interval(config.poll_interval()))
}

fn render(spec: &ContainerSpec, namespace: &str) -> Result<()> {
    let mut diagnostics = Diagnostics::new();
    let deployment = create_deployment(spec, namespace, &mut diagnostics);
    let services = get_services(spec, &mut diagnostics);

    for diagnostic in diagnostics.iter() {
        tracing::warn!(%diagnostic, "Ignoring part of the container spec");
    }

    print!("{}", serde_yaml::to_string(&deployment)?);
    for service in &services {
        println!("---");
        print!("{}", serde_yaml::to_string(service)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(&config);

    match cli.command {
        Command::Render { spec } => {
            let spec = load_spec(&spec)?;
            render(&spec, &config.namespace)?;
        }
        Command::Deploy { spec } => {
            let spec = load_spec(&spec)?;
            let manager = connect(&config).await?;

            manager
                .start_container(&spec)
                .await
                .with_context(|| format!("Failed to start container {}", spec.short_id))?;
            let state = manager
                .wait_ready_state(&spec, config.ready_attempts)
                .await
                .with_context(|| format!("Container {} failed", spec.short_id))?;

            tracing::info!(container = %spec.short_id, %state, "Deployment finished");
            println!("{}", state);
        }
        Command::Status { spec } => {
            let spec = load_spec(&spec)?;
            let manager = connect(&config).await?;
            let result = manager.get_container_state(&spec).await;
            if let Err(e) = &result {
                tracing::warn!(container = %spec.short_id, error = %e, "Container is not healthy");
            }
            let state = DeployState::from_result(&result);
            println!("{}", state);
            if state == DeployState::Failed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
