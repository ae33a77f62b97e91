use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub kubeconfig: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_ready_attempts")]
    pub ready_attempts: u32,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_ready_attempts() -> u32 {
    60
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load from the environment (`KUBEDOCK_*`), reading `.env` first if present
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::with_prefix("KUBEDOCK").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            kubeconfig: None,
            poll_interval_ms: default_poll_interval_ms(),
            ready_attempts: default_ready_attempts(),
            log_format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("KUBEDOCK")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.kubeconfig, None);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.ready_attempts, 60);
        assert!(!config.json_logs());
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_source(env(&[])).unwrap();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.ready_attempts, 60);
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_source(env(&[
            ("KUBEDOCK_NAMESPACE", "kubedock-sim"),
            ("KUBEDOCK_POLL_INTERVAL_MS", "250"),
            ("KUBEDOCK_READY_ATTEMPTS", "5"),
            ("KUBEDOCK_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "kubedock-sim");
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.ready_attempts, 5);
        assert!(config.json_logs());
    }
}
