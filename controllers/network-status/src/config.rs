//! Controller configuration from environment variables.

use crate::error::ControllerError;
use std::env;
use std::net::SocketAddr;
use tracing::info;

const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BACKOFF_MIN_SECONDS: u64 = 1;
const DEFAULT_BACKOFF_MAX_SECONDS: u64 = 60;

/// Runtime configuration of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace PodNetworkAttachments are watched in; `None` watches all
    pub watch_namespace: Option<String>,
    /// Listen address of the metrics and health endpoints
    pub metrics_addr: SocketAddr,
    /// First requeue delay after a failed reconcile
    pub backoff_min_seconds: u64,
    /// Cap on the failed-reconcile requeue delay
    pub backoff_max_seconds: u64,
}

impl ControllerConfig {
    /// Reads `WATCH_NAMESPACE`, `METRICS_ADDR`, `RETRY_BACKOFF_MIN_SECONDS`
    /// and `RETRY_BACKOFF_MAX_SECONDS`
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let metrics_addr = lookup("METRICS_ADDR")
            .unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string());
        let metrics_addr = metrics_addr.parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("METRICS_ADDR {metrics_addr:?}: {e}"))
        })?;

        let backoff_min_seconds = parse_seconds(&lookup, "RETRY_BACKOFF_MIN_SECONDS", DEFAULT_BACKOFF_MIN_SECONDS)?;
        let backoff_max_seconds = parse_seconds(&lookup, "RETRY_BACKOFF_MAX_SECONDS", DEFAULT_BACKOFF_MAX_SECONDS)?;
        if backoff_min_seconds == 0 {
            return Err(ControllerError::InvalidConfig(
                "RETRY_BACKOFF_MIN_SECONDS must be at least 1".to_string(),
            ));
        }
        if backoff_max_seconds < backoff_min_seconds {
            return Err(ControllerError::InvalidConfig(format!(
                "RETRY_BACKOFF_MAX_SECONDS ({backoff_max_seconds}) must not be less than RETRY_BACKOFF_MIN_SECONDS ({backoff_min_seconds})"
            )));
        }

        Ok(Self {
            watch_namespace,
            metrics_addr,
            backoff_min_seconds,
            backoff_max_seconds,
        })
    }

    /// Logs the effective configuration
    pub fn log(&self) {
        info!("Configuration:");
        info!("  Attachment namespace: {}", self.watch_namespace.as_deref().unwrap_or("all namespaces"));
        info!("  Metrics address: {}", self.metrics_addr);
        info!("  Retry backoff: {}s..{}s", self.backoff_min_seconds, self.backoff_max_seconds);
    }
}

fn parse_seconds<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| ControllerError::InvalidConfig(format!("{key} {value:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ControllerConfig, ControllerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.watch_namespace, None);
        assert_eq!(config.metrics_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.backoff_min_seconds, 1);
        assert_eq!(config.backoff_max_seconds, 60);
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("WATCH_NAMESPACE", "tenant-a"),
            ("METRICS_ADDR", "127.0.0.1:9090"),
            ("RETRY_BACKOFF_MIN_SECONDS", "2"),
            ("RETRY_BACKOFF_MAX_SECONDS", "30"),
        ])
        .unwrap();
        assert_eq!(config.watch_namespace.as_deref(), Some("tenant-a"));
        assert_eq!(config.metrics_addr.port(), 9090);
        assert_eq!(config.backoff_min_seconds, 2);
        assert_eq!(config.backoff_max_seconds, 30);
    }

    #[test]
    fn empty_namespace_means_all_namespaces() {
        let config = config(&[("WATCH_NAMESPACE", "")]).unwrap();
        assert_eq!(config.watch_namespace, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(config(&[("METRICS_ADDR", "localhost")]), Err(ControllerError::InvalidConfig(_))));
        assert!(matches!(config(&[("RETRY_BACKOFF_MIN_SECONDS", "soon")]), Err(ControllerError::InvalidConfig(_))));
        assert!(matches!(config(&[("RETRY_BACKOFF_MIN_SECONDS", "0")]), Err(ControllerError::InvalidConfig(_))));
        assert!(matches!(
            config(&[("RETRY_BACKOFF_MIN_SECONDS", "10"), ("RETRY_BACKOFF_MAX_SECONDS", "5")]),
            Err(ControllerError::InvalidConfig(_))
        ));
    }
}
