//! Kubernetes resource watchers.
//!
//! Every kind runs on a `kube_runtime::Controller`, driven by the generic
//! `run_controller()` helper. A failed reconcile is requeued after a
//! per-object Fibonacci backoff. Events of related kinds are mapped onto the
//! objects they affect with `Controller::watches`:
//! - IPAddress events requeue the terminating ServiceCIDRs
//! - a ServiceCIDR that is Ready requeues the terminating ServiceCIDRs
//! - PodNetwork events requeue the attachments that name the network

use crate::backoff::RetryBackoff;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::{IP_ADDRESS, Reconciler};
use futures::StreamExt;
use kube::{Api, Resource, ResourceExt};
use kube_runtime::controller::{self, Action, Config as RuntimeConfig};
use kube_runtime::reflector::{self, ObjectRef, Store};
use kube_runtime::{Controller, WatchStreamExt, watcher};
use networking_api::{IPAddress, PodNetwork, PodNetworkAttachment, ServiceCIDR};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Future returned by the per-kind reconcile functions
pub type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// ServiceCIDR controller. IPAddress events and ServiceCIDRs that are Ready
/// requeue the ServiceCIDRs held back by their finalizer.
pub fn service_cidr_controller(cidrs: Api<ServiceCIDR>, addresses: Api<IPAddress>) -> Controller<ServiceCIDR> {
    let controller = Controller::new(cidrs.clone(), watcher::Config::default());
    let store = controller.store();
    let on_address = store.clone();
    controller
        .watches(addresses, watcher::Config::default(), move |_: IPAddress| {
            terminating_service_cidrs(&on_address.state())
        })
        .watches(cidrs, watcher::Config::default(), move |cidr: ServiceCIDR| {
            unblocked_by(&cidr, &store.state())
        })
}

/// PodNetwork controller
pub fn pod_network_controller(networks: Api<PodNetwork>) -> Controller<PodNetwork> {
    Controller::new(networks, watcher::Config::default())
}

/// PodNetworkAttachment controller. PodNetwork events requeue the
/// attachments that name the network.
pub fn attachment_controller(
    attachments: Api<PodNetworkAttachment>,
    networks: Api<PodNetwork>,
) -> Controller<PodNetworkAttachment> {
    let controller = Controller::new(attachments, watcher::Config::default());
    let store = controller.store();
    controller.watches(networks, watcher::Config::default(), move |network: PodNetwork| {
        attachments_naming(&store.state(), &network.name_any())
    })
}

pub fn reconcile_service_cidr(reconciler: Arc<Reconciler>, cidr: Arc<ServiceCIDR>) -> ReconcileFuture {
    Box::pin(async move { reconciler.reconcile_service_cidr(&cidr).await })
}

pub fn reconcile_pod_network(reconciler: Arc<Reconciler>, network: Arc<PodNetwork>) -> ReconcileFuture {
    Box::pin(async move { reconciler.reconcile_pod_network(&network).await })
}

pub fn reconcile_attachment(reconciler: Arc<Reconciler>, attachment: Arc<PodNetworkAttachment>) -> ReconcileFuture {
    Box::pin(async move { reconciler.reconcile_attachment(&attachment).await })
}

/// Generic watcher helper that runs a `kube_runtime::Controller` forever.
///
/// The reconcile_fn should match the reconciler's signature:
/// `async fn reconcile_x(&self, resource: &K) -> Result<Action, ControllerError>`
pub async fn run_controller<K, F>(
    controller: Controller<K>,
    kind: &'static str,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
) where
    K: Resource + Clone + Send + Sync + Debug + DeserializeOwned + 'static,
    K::DynamicType: Debug + Eq + Hash + Clone + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} controller", kind);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        error!("Failed to reconcile {}: {}", object_key(kind, &*obj), error);
        ctx.metrics().reconciled(kind, false);
        requeue_after_failure(ctx.retries(), kind, &*obj)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = object_key(kind, &*obj);
            debug!("Reconciling {}", key);
            let action = reconcile_fn(ctx.clone(), obj).await?;
            ctx.retries().reset(&key);
            ctx.metrics().reconciled(kind, true);
            Ok::<_, ControllerError>(action)
        }
    };

    // Debounce folds our own status write and the event it causes
    let config = RuntimeConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(3);

    let metrics = Arc::clone(reconciler.metrics());
    controller
        .with_config(config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| {
            let metrics = metrics.clone();
            async move {
                match res {
                    Ok((object, _)) => debug!("Reconciled {} {}", kind, object.name),
                    // Logged and requeued by the error policy
                    Err(controller::Error::ReconcilerFailed(..)) => {}
                    Err(controller::Error::ObjectNotFound(object)) => {
                        debug!("{} {} is gone", kind, object.name);
                    }
                    Err(controller::Error::QueueError(e)) => {
                        warn!("{} watch error: {}", kind, e);
                        metrics.watch_restarted(kind);
                    }
                    Err(e) => error!("Controller error for {}: {}", kind, e),
                }
            }
        })
        .await;

    warn!("{} controller stopped", kind);
}

/// Keeps the IPAddress cache current, forever. The runtime's default
/// watcher backoff paces reconnects.
pub async fn reflect_ip_addresses(api: Api<IPAddress>, writer: reflector::store::Writer<IPAddress>, metrics: Arc<Metrics>) {
    info!("Starting IPAddress reflector");
    reflector::reflector(writer, watcher(api, watcher::Config::default()).default_backoff())
        .for_each(|event| {
            let metrics = metrics.clone();
            async move {
                match event {
                    Ok(watcher::Event::Apply(address)) => log_address("applied", &address),
                    Ok(watcher::Event::Delete(address)) => log_address("deleted", &address),
                    Ok(_) => {}
                    Err(e) => {
                        warn!("IPAddress watch error: {}", e);
                        metrics.watch_restarted(IP_ADDRESS);
                    }
                }
            }
        })
        .await;

    warn!("IPAddress reflector stopped");
}

/// Marks `kind` synced for `/readyz` once its cache holds the initial list
pub async fn report_synced<K>(store: Store<K>, kind: &'static str, metrics: Arc<Metrics>)
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    match store.wait_until_ready().await {
        Ok(()) => {
            info!("{} cache synced", kind);
            metrics.watch_synced(kind);
        }
        Err(e) => warn!("{} cache never synced: {}", kind, e),
    }
}

/// Requeue action after a failed reconcile of `obj`
pub fn requeue_after_failure<K: Resource>(retries: &RetryBackoff, kind: &str, obj: &K) -> Action {
    let key = object_key(kind, obj);
    let delay = retries.next_delay(&key);
    info!("Retrying {} in {}s", key, delay.as_secs());
    Action::requeue(delay)
}

/// `kind/name` or `kind/namespace/name`
pub fn object_key<K: Resource>(kind: &str, obj: &K) -> String {
    match obj.meta().namespace.as_deref() {
        Some(namespace) => format!("{}/{}/{}", kind, namespace, obj.name_any()),
        None => format!("{}/{}", kind, obj.name_any()),
    }
}

/// ServiceCIDRs being deleted that still hold their finalizer
pub fn terminating_service_cidrs(cidrs: &[Arc<ServiceCIDR>]) -> Vec<ObjectRef<ServiceCIDR>> {
    cidrs
        .iter()
        .filter(|cidr| cidr.is_terminating() && cidr.has_finalizer())
        .map(|cidr| ObjectRef::from_obj(&**cidr))
        .collect()
}

/// Terminating ServiceCIDRs a live, Ready `changed` may now cover for
pub fn unblocked_by(changed: &ServiceCIDR, cidrs: &[Arc<ServiceCIDR>]) -> Vec<ObjectRef<ServiceCIDR>> {
    if !changed.is_ready() || changed.is_terminating() {
        return Vec::new();
    }
    terminating_service_cidrs(cidrs)
        .into_iter()
        .filter(|cidr| Some(&cidr.name) != changed.metadata.name.as_ref())
        .collect()
}

/// Attachments whose `podNetworkName` is `pod_network`
pub fn attachments_naming(
    attachments: &[Arc<PodNetworkAttachment>],
    pod_network: &str,
) -> Vec<ObjectRef<PodNetworkAttachment>> {
    attachments
        .iter()
        .filter(|attachment| attachment.attaches_to(pod_network))
        .map(|attachment| ObjectRef::from_obj(&**attachment))
        .collect()
}

fn log_address(action: &str, address: &IPAddress) {
    let name = address.name_any();
    match address.parent_ref() {
        Some(parent) => debug!("IPAddress {}: {} (parent {})", action, name, parent),
        None => debug!("IPAddress {}: {}", action, name),
    }
}
