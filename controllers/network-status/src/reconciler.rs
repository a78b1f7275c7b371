//! Reconciliation logic for the networking.k8s.io resources.
//!
//! Each reconcile computes the desired conditions with [`crate::status`] and
//! patches the status subresource only when they differ from what is stored.
//! ServiceCIDRs additionally carry a finalizer that is lifted once the
//! addresses inside them are covered elsewhere or gone. ServiceCIDRs and
//! IPAddresses are read from reflector caches.

use crate::backoff::RetryBackoff;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::status::{
    attachment_conditions, merge_conditions, pod_network_conditions, service_cidr_ready,
    uncovered_addresses,
};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use kube_runtime::controller::Action;
use kube_runtime::reflector::Store;
use networking_api::{
    IPAddress, PodNetwork, PodNetworkAttachment, PodNetworkAttachmentStatus, PodNetworkStatus,
    SERVICE_CIDR_FINALIZER, ServiceCIDR, ServiceCIDRStatus,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Kind label of ServiceCIDR metrics and logs
pub const SERVICE_CIDR: &str = "ServiceCIDR";
/// Kind label of IPAddress metrics and logs
pub const IP_ADDRESS: &str = "IPAddress";
/// Kind label of PodNetwork metrics and logs
pub const POD_NETWORK: &str = "PodNetwork";
/// Kind label of PodNetworkAttachment metrics and logs
pub const POD_NETWORK_ATTACHMENT: &str = "PodNetworkAttachment";

/// How often a ServiceCIDR whose deletion is blocked is checked again
pub const DELETION_RECHECK: Duration = Duration::from_secs(30);

/// Reconciles status and finalizers of the networking resources.
pub struct Reconciler {
    client: Client,
    service_cidr_api: Api<ServiceCIDR>,
    pod_network_api: Api<PodNetwork>,
    service_cidrs: Store<ServiceCIDR>,
    ip_addresses: Store<IPAddress>,
    metrics: Arc<Metrics>,
    retries: RetryBackoff,
}

impl Reconciler {
    /// Creates a reconciler reading ServiceCIDRs and IPAddresses from the
    /// given caches.
    pub fn new(
        client: Client,
        service_cidrs: Store<ServiceCIDR>,
        ip_addresses: Store<IPAddress>,
        metrics: Arc<Metrics>,
        retries: RetryBackoff,
    ) -> Self {
        Self {
            service_cidr_api: Api::all(client.clone()),
            pod_network_api: Api::all(client.clone()),
            client,
            service_cidrs,
            ip_addresses,
            metrics,
            retries,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Failed-reconcile backoff, per object
    pub fn retries(&self) -> &RetryBackoff {
        &self.retries
    }

    /// Reconciles a ServiceCIDR resource.
    ///
    /// This method:
    /// 1. Adds the finalizer to live ServiceCIDRs
    /// 2. Updates the `Ready` condition
    /// 3. For a deleting ServiceCIDR, removes the finalizer once no IPAddress
    ///    depends on it, and otherwise checks again after [`DELETION_RECHECK`]
    pub async fn reconcile_service_cidr(&self, cidr: &ServiceCIDR) -> Result<Action, ControllerError> {
        let name = cidr.metadata.name.as_deref()
            .ok_or_else(|| ControllerError::InvalidResource("ServiceCIDR missing name".to_string()))?;

        info!("Reconciling ServiceCIDR {}", name);

        let mut current = cidr.clone();
        if !cidr.is_terminating() && !cidr.has_finalizer() {
            current = self.set_finalizer(&current, name, true).await?;
        }

        let desired = service_cidr_ready(cidr);
        match merge_conditions::<ServiceCIDRStatus>(cidr.status.as_ref(), vec![desired]) {
            Some(status) => {
                current = self.patch_status(&self.service_cidr_api, SERVICE_CIDR, name, &status).await?;
            }
            None => debug!("ServiceCIDR {} status unchanged", name),
        }

        if cidr.is_terminating() && cidr.has_finalizer() && !self.release_service_cidr(&current, name).await? {
            return Ok(Action::requeue(DELETION_RECHECK));
        }

        Ok(Action::await_change())
    }

    /// Removes the finalizer when nothing depends on the ServiceCIDR anymore.
    /// Returns whether it was removed.
    async fn release_service_cidr(&self, cidr: &ServiceCIDR, name: &str) -> Result<bool, ControllerError> {
        // An unsynced cache would look like a cluster without addresses
        self.service_cidrs.wait_until_ready().await
            .map_err(|e| ControllerError::Task(format!("ServiceCIDR cache: {e}")))?;
        self.ip_addresses.wait_until_ready().await
            .map_err(|e| ControllerError::Task(format!("IPAddress cache: {e}")))?;

        let uncovered = uncovered_addresses(cidr, &self.service_cidrs.state(), &self.ip_addresses.state());
        if uncovered.is_empty() {
            info!("ServiceCIDR {} has no dependent IPAddresses, removing finalizer", name);
            self.set_finalizer(cidr, name, false).await?;
            return Ok(true);
        }

        info!(
            "ServiceCIDR {} deletion blocked by {} IPAddresses (first: {})",
            name,
            uncovered.len(),
            uncovered[0]
        );
        Ok(false)
    }

    /// Adds or removes the ServiceCIDR finalizer. The patch carries the
    /// observed resourceVersion so a concurrent change makes it fail.
    async fn set_finalizer(&self, cidr: &ServiceCIDR, name: &str, present: bool) -> Result<ServiceCIDR, ControllerError> {
        let mut finalizers: Vec<String> = cidr.metadata.finalizers.clone().unwrap_or_default();
        finalizers.retain(|f| f != SERVICE_CIDR_FINALIZER);
        if present {
            finalizers.push(SERVICE_CIDR_FINALIZER.to_string());
        }

        let patch = json!({
            "metadata": {
                "resourceVersion": cidr.metadata.resource_version,
                "finalizers": finalizers,
            }
        });
        let updated = self.service_cidr_api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!(
            "{} finalizer on ServiceCIDR {}",
            if present { "Added" } else { "Removed" },
            name
        );
        Ok(updated)
    }

    /// Reconciles a PodNetwork resource.
    pub async fn reconcile_pod_network(&self, network: &PodNetwork) -> Result<Action, ControllerError> {
        let name = network.metadata.name.as_deref()
            .ok_or_else(|| ControllerError::InvalidResource("PodNetwork missing name".to_string()))?;

        info!("Reconciling PodNetwork {}", name);

        let desired = pod_network_conditions(network);
        match merge_conditions::<PodNetworkStatus>(network.status.as_ref(), desired) {
            Some(status) => {
                self.patch_status(&self.pod_network_api, POD_NETWORK, name, &status).await?;
            }
            None => debug!("PodNetwork {} status unchanged", name),
        }

        Ok(Action::await_change())
    }

    /// Reconciles a PodNetworkAttachment against the PodNetwork it names.
    pub async fn reconcile_attachment(&self, attachment: &PodNetworkAttachment) -> Result<Action, ControllerError> {
        let name = attachment.metadata.name.as_deref()
            .ok_or_else(|| ControllerError::InvalidResource("PodNetworkAttachment missing name".to_string()))?;
        let namespace = attachment.metadata.namespace.as_deref()
            .ok_or_else(|| ControllerError::InvalidResource(format!("PodNetworkAttachment {name} missing namespace")))?;

        info!("Reconciling PodNetworkAttachment {}/{}", namespace, name);

        let network_name = &attachment.spec.pod_network_name;
        let network = if network_name.is_empty() {
            None
        } else {
            self.pod_network_api.get_opt(network_name).await?
        };

        let desired = attachment_conditions(attachment, network.as_ref());
        match merge_conditions::<PodNetworkAttachmentStatus>(attachment.status.as_ref(), desired) {
            Some(status) => {
                let api: Api<PodNetworkAttachment> = Api::namespaced(self.client.clone(), namespace);
                self.patch_status(&api, POD_NETWORK_ATTACHMENT, name, &status).await?;
            }
            None => debug!("PodNetworkAttachment {}/{} status unchanged", namespace, name),
        }

        Ok(Action::await_change())
    }

    /// Merge-patches the status subresource, returning the updated object
    async fn patch_status<K, S>(&self, api: &Api<K>, kind: &str, name: &str, status: &S) -> Result<K, ControllerError>
    where
        K: Clone + DeserializeOwned + Debug,
        S: Serialize,
    {
        let patch = json!({ "status": status });
        let updated = api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        self.metrics.status_patched(kind);
        info!("Updated {} {} status", kind, name);
        Ok(updated)
    }
}
