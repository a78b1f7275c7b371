//! PodNetwork CRD
//!
//! A logical network in the cluster. PodNetworks can be administratively
//! disabled and point at vendor-specific parameters objects.

use crate::conditions::{Condition, ConditionedStatus};
use crate::references::ParametersRef;
use kube::CustomResource;
use kube::core::ObjectList;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type set when the PodNetwork can be used
pub const POD_NETWORK_CONDITION_READY: &str = crate::conditions::CONDITION_READY;

/// Condition type set when the PodNetwork's parameters are acceptable
pub const POD_NETWORK_CONDITION_PARAMS_READY: &str = crate::conditions::CONDITION_PARAMS_READY;

/// PodNetworkSpec contains the specification of a PodNetwork
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "networking.k8s.io",
    version = "v1alpha1",
    kind = "PodNetwork",
    plural = "podnetworks",
    singular = "podnetwork",
    derive = "PartialEq",
    status = "PodNetworkStatus",
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"Enabled","type":"boolean","jsonPath":".spec.enabled"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PodNetworkSpec {
    /// Administratively enables or disables the PodNetwork. When false the
    /// Ready condition is set to False. Defaults to true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Vendor or implementation specific parameters objects, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_refs: Vec<ParametersRef>,

    /// Provider implementing this PodNetwork
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for PodNetworkSpec {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            parameters_refs: Vec::new(),
            provider: None,
        }
    }
}

impl PodNetworkSpec {
    /// Enabled spec for the given provider
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..Self::default()
        }
    }
}

/// PodNetworkStatus contains the observed state of a PodNetwork
///
/// Known condition types are `Ready` and `ParamsReady`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodNetworkStatus {
    /// Current conditions of the PodNetwork, keyed by condition type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(extend("x-kubernetes-list-type" = "map", "x-kubernetes-list-map-keys" = ["type"]))]
    pub conditions: Vec<Condition>,
}

impl ConditionedStatus for PodNetworkStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}

/// List of PodNetwork objects
pub type PodNetworkList = ObjectList<PodNetwork>;

impl PodNetwork {
    /// Whether the `Ready` condition is `True`
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(ConditionedStatus::is_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enabled_defaults_to_true_when_absent() {
        let network: PodNetwork = serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1alpha1",
            "kind": "PodNetwork",
            "metadata": {"name": "default"},
            "spec": {"provider": "cni.example.com"}
        }))
        .unwrap();
        assert!(network.spec.enabled);
        assert!(network.spec.parameters_refs.is_empty());
        assert_eq!(network.spec.provider.as_deref(), Some("cni.example.com"));
    }

    #[test]
    fn default_spec_is_enabled() {
        assert!(PodNetworkSpec::default().enabled);
    }

    #[test]
    fn disabled_is_serialized_explicitly() {
        let spec = PodNetworkSpec {
            enabled: false,
            ..PodNetworkSpec::default()
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value, json!({"enabled": false}));

        let back: PodNetworkSpec = serde_json::from_value(value).unwrap();
        assert!(!back.enabled);
    }

    #[test]
    fn parameters_refs_keep_their_order() {
        let spec = PodNetworkSpec {
            parameters_refs: vec![
                ParametersRef::new("k8s.cni.cncf.io", "network-attachment-definitions", "macvlan"),
                ParametersRef::with_namespace("", "configmaps", "tuning", "kube-system"),
            ],
            ..PodNetworkSpec::for_provider("multus")
        };
        let network = PodNetwork::new("storage", spec);
        let text = serde_json::to_string(&network).unwrap();
        let back: PodNetwork = serde_json::from_str(&text).unwrap();
        assert_eq!(back, network);
        assert_eq!(back.spec.parameters_refs[0].name, "macvlan");
        assert_eq!(back.spec.parameters_refs[1].namespace.as_deref(), Some("kube-system"));
    }

    #[test]
    fn not_ready_without_status() {
        let network = PodNetwork::new("default", PodNetworkSpec::default());
        assert!(!network.is_ready());
    }

    #[test]
    fn list_carries_items_and_list_metadata() {
        let list: PodNetworkList = serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1alpha1",
            "kind": "PodNetworkList",
            "metadata": {"resourceVersion": "8"},
            "items": [
                {
                    "apiVersion": "networking.k8s.io/v1alpha1",
                    "kind": "PodNetwork",
                    "metadata": {"name": "default"},
                    "spec": {"provider": "cni.example.com"}
                },
                {
                    "apiVersion": "networking.k8s.io/v1alpha1",
                    "kind": "PodNetwork",
                    "metadata": {"name": "storage"},
                    "spec": {"enabled": false, "provider": "sriov.example.com"}
                }
            ]
        }))
        .unwrap();
        assert_eq!(list.metadata.resource_version.as_deref(), Some("8"));
        let enabled: Vec<bool> = list.items.iter().map(|n| n.spec.enabled).collect();
        assert_eq!(enabled, vec![true, false]);

        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["items"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["items"][0]["spec"]["enabled"], true);
    }
}
