//! Network Status Controller
//!
//! Keeps the status conditions of networking.k8s.io/v1alpha1 resources up
//! to date:
//! - ServiceCIDR: `Ready`, and a finalizer holding deletion while IPAddresses
//!   inside its blocks are not covered by another ServiceCIDR
//! - PodNetwork: `Ready` (follows `enabled`) and `ParamsReady`
//! - PodNetworkAttachment: `Ready` (follows its PodNetwork) and `ParamsReady`

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod status;
mod watcher;

use crate::config::ControllerConfig;
use crate::controller::{Controller, WATCH_COUNT};
use crate::error::ControllerError;
use crate::metrics::Metrics;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Network Status Controller");

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| ControllerError::InvalidConfig("rustls crypto provider already installed".to_string()))?;

    let config = ControllerConfig::from_env()?;
    config.log();

    let metrics = Arc::new(Metrics::new(WATCH_COUNT)?);

    // Initialize and run controller
    let controller = Controller::new(&config, metrics).await?;
    controller.run().await?;

    Ok(())
}
