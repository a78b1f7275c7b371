//! ServiceCIDR CRD
//!
//! A range of IP addresses in CIDR form (e.g. `192.168.0.0/24` or
//! `2001:db2::/64`) that ClusterIPs are allocated from.

use crate::conditions::{Condition, ConditionedStatus};
use ipnetwork::IpNetwork;
use kube::CustomResource;
use kube::core::ObjectList;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Condition type set when a ServiceCIDR can be used by the apiserver to
/// allocate ClusterIPs
pub const SERVICE_CIDR_CONDITION_READY: &str = crate::conditions::CONDITION_READY;

/// Reason for a ServiceCIDR that is not ready because it is being deleted
pub const SERVICE_CIDR_REASON_TERMINATING: &str = "Terminating";

/// Finalizer holding a ServiceCIDR until no IPAddress depends on it
pub const SERVICE_CIDR_FINALIZER: &str = "networking.k8s.io/service-cidr-finalizer";

/// Maximum number of blocks, one per IP family
pub const MAX_SERVICE_CIDRS: usize = 2;

/// ServiceCIDRSpec defines the CIDRs ClusterIPs are allocated from
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[kube(
    group = "networking.k8s.io",
    version = "v1alpha1",
    kind = "ServiceCIDR",
    plural = "servicecidrs",
    singular = "servicecidr",
    derive = "PartialEq",
    status = "ServiceCIDRStatus",
    printcolumn = r#"{"name":"CIDRs","type":"string","jsonPath":".spec.cidrs","description":"list of IP blocks"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [{
    "rule": "has(self.cidrs) == has(oldSelf.cidrs) && (!has(self.cidrs) || self.cidrs == oldSelf.cidrs)",
    "message": "cidrs are immutable"
}]))]
pub struct ServiceCIDRSpec {
    /// IP blocks in CIDR notation (e.g. "192.168.0.0/24" or "2001:db8::/64").
    /// At most two, one of each IP family. This field is immutable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(length(max = 2))]
    pub cidrs: Vec<String>,
}

/// ServiceCIDRStatus describes the current state of the ServiceCIDR
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCIDRStatus {
    /// Current service state, keyed by condition type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(extend("x-kubernetes-list-type" = "map", "x-kubernetes-list-map-keys" = ["type"]))]
    pub conditions: Vec<Condition>,
}

impl ConditionedStatus for ServiceCIDRStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}

/// List of ServiceCIDR objects
pub type ServiceCIDRList = ObjectList<ServiceCIDR>;

impl ServiceCIDRSpec {
    /// Spec with the given blocks
    pub fn new<I, S>(cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cidrs: cidrs.into_iter().map(Into::into).collect(),
        }
    }

    /// The blocks that parse as CIDRs, skipping any that do not
    pub fn networks(&self) -> Vec<IpNetwork> {
        self.cidrs
            .iter()
            .filter(|c| c.contains('/'))
            .filter_map(|c| c.parse().ok())
            .collect()
    }
}

impl ServiceCIDR {
    /// Whether `ip` falls inside any of this ServiceCIDR's blocks
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.spec.networks().iter().any(|net| net.contains(ip))
    }

    /// Whether the object has been marked for deletion
    pub fn is_terminating(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Whether the `Ready` condition is `True`
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(ConditionedStatus::is_ready)
    }

    /// Whether the deletion finalizer is present
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|f| f == SERVICE_CIDR_FINALIZER))
    }
}
