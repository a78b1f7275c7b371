//! Main controller implementation.
//!
//! This module contains the `Controller` struct that starts one
//! `kube_runtime::Controller` per reconciled kind, the IPAddress reflector
//! and the metrics server, and runs until one of them stops or the process
//! is interrupted.

use crate::backoff::RetryBackoff;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::{self, Metrics};
use crate::reconciler::{IP_ADDRESS, POD_NETWORK, POD_NETWORK_ATTACHMENT, Reconciler, SERVICE_CIDR};
use crate::watcher;
use kube::{Api, Client};
use kube_runtime::reflector;
use networking_api::{IPAddress, PodNetwork, PodNetworkAttachment, ServiceCIDR};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Number of caches `/readyz` waits for
pub const WATCH_COUNT: usize = 4;

/// Main controller for networking resource status.
pub struct Controller {
    service_cidr_controller: JoinHandle<()>,
    pod_network_controller: JoinHandle<()>,
    attachment_controller: JoinHandle<()>,
    ip_address_reflector: JoinHandle<()>,
    sync_reporters: Vec<JoinHandle<()>>,
    metrics_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: &ControllerConfig, metrics: Arc<Metrics>) -> Result<Self, ControllerError> {
        info!("Initializing Network Status Controller");

        let client = Client::try_default().await?;

        let service_cidr_api: Api<ServiceCIDR> = Api::all(client.clone());
        let ip_address_api: Api<IPAddress> = Api::all(client.clone());
        let pod_network_api: Api<PodNetwork> = Api::all(client.clone());
        let attachment_api: Api<PodNetworkAttachment> = match config.watch_namespace.as_deref() {
            Some(ns) => Api::namespaced(client.clone(), ns),
            None => Api::all(client.clone()),
        };

        let (ip_addresses, ip_address_writer) = reflector::store();
        let service_cidrs = watcher::service_cidr_controller(service_cidr_api, ip_address_api.clone());
        let pod_networks = watcher::pod_network_controller(pod_network_api.clone());
        let attachments = watcher::attachment_controller(attachment_api, pod_network_api);

        let sync_reporters = vec![
            tokio::spawn(watcher::report_synced(service_cidrs.store(), SERVICE_CIDR, metrics.clone())),
            tokio::spawn(watcher::report_synced(ip_addresses.clone(), IP_ADDRESS, metrics.clone())),
            tokio::spawn(watcher::report_synced(pod_networks.store(), POD_NETWORK, metrics.clone())),
            tokio::spawn(watcher::report_synced(attachments.store(), POD_NETWORK_ATTACHMENT, metrics.clone())),
        ];

        let reconciler = Arc::new(Reconciler::new(
            client,
            service_cidrs.store(),
            ip_addresses,
            metrics.clone(),
            RetryBackoff::new(config.backoff_min_seconds, config.backoff_max_seconds),
        ));

        let ip_address_reflector = tokio::spawn(watcher::reflect_ip_addresses(
            ip_address_api,
            ip_address_writer,
            metrics.clone(),
        ));
        let service_cidr_controller = tokio::spawn(watcher::run_controller(
            service_cidrs,
            SERVICE_CIDR,
            reconciler.clone(),
            watcher::reconcile_service_cidr,
        ));
        let pod_network_controller = tokio::spawn(watcher::run_controller(
            pod_networks,
            POD_NETWORK,
            reconciler.clone(),
            watcher::reconcile_pod_network,
        ));
        let attachment_controller = tokio::spawn(watcher::run_controller(
            attachments,
            POD_NETWORK_ATTACHMENT,
            reconciler,
            watcher::reconcile_attachment,
        ));

        let addr = config.metrics_addr;
        let metrics_server = tokio::spawn(async move { metrics::serve(addr, metrics).await });

        Ok(Self {
            service_cidr_controller,
            pod_network_controller,
            attachment_controller,
            ip_address_reflector,
            sync_reporters,
            metrics_server,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Network Status Controller running");

        // Controllers and the reflector run forever; any of them returning is a failure
        let result = tokio::select! {
            result = &mut self.service_cidr_controller => stopped("ServiceCIDR controller", result),
            result = &mut self.pod_network_controller => stopped("PodNetwork controller", result),
            result = &mut self.attachment_controller => stopped("PodNetworkAttachment controller", result),
            result = &mut self.ip_address_reflector => stopped("IPAddress reflector", result),
            result = &mut self.metrics_server => match result {
                Ok(Ok(())) => Err(ControllerError::Task("metrics server exited".to_string())),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(ControllerError::Task(format!("metrics server panicked: {e}"))),
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Received interrupt, shutting down");
                Ok(())
            }
        };

        self.abort();
        result
    }

    fn abort(&self) {
        self.service_cidr_controller.abort();
        self.pod_network_controller.abort();
        self.attachment_controller.abort();
        self.ip_address_reflector.abort();
        for reporter in &self.sync_reporters {
            reporter.abort();
        }
        self.metrics_server.abort();
    }
}

fn stopped(task: &str, result: Result<(), tokio::task::JoinError>) -> Result<(), ControllerError> {
    match result {
        Ok(()) => Err(ControllerError::Task(format!("{task} exited"))),
        Err(e) => Err(ControllerError::Task(format!("{task} panicked: {e}"))),
    }
}
