//! PodNetworkAttachment CRD
//!
//! Optional pod-level configuration of a PodNetwork.

use crate::conditions::{Condition, ConditionedStatus};
use crate::references::ParametersRef;
use kube::CustomResource;
use kube::core::ObjectList;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// PodNetworkAttachmentSpec is the specification of a PodNetworkAttachment
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[kube(
    group = "networking.k8s.io",
    version = "v1alpha1",
    kind = "PodNetworkAttachment",
    plural = "podnetworkattachments",
    singular = "podnetworkattachment",
    namespaced,
    derive = "PartialEq",
    status = "PodNetworkAttachmentStatus",
    printcolumn = r#"{"name":"PodNetwork","type":"string","jsonPath":".spec.podNetworkName"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PodNetworkAttachmentSpec {
    /// PodNetwork object this attachment is connected to
    pub pod_network_name: String,

    /// Vendor or implementation specific parameters objects, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_refs: Vec<ParametersRef>,
}

/// PodNetworkAttachmentStatus is the observed state of a PodNetworkAttachment
///
/// Known condition types are `Ready` and `ParamsReady`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodNetworkAttachmentStatus {
    /// Current conditions of the PodNetworkAttachment, keyed by condition type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(extend("x-kubernetes-list-type" = "map", "x-kubernetes-list-map-keys" = ["type"]))]
    pub conditions: Vec<Condition>,
}

impl ConditionedStatus for PodNetworkAttachmentStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}

/// List of PodNetworkAttachment objects
pub type PodNetworkAttachmentList = ObjectList<PodNetworkAttachment>;

impl PodNetworkAttachmentSpec {
    /// Attachment to the named PodNetwork without parameters
    pub fn new(pod_network_name: impl Into<String>) -> Self {
        Self {
            pod_network_name: pod_network_name.into(),
            parameters_refs: Vec::new(),
        }
    }
}

impl PodNetworkAttachment {
    /// Whether this attachment names the given PodNetwork
    pub fn attaches_to(&self, pod_network: &str) -> bool {
        self.spec.pod_network_name == pod_network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{CONDITION_PARAMS_READY, CONDITION_READY, ConditionStatus};
    use serde_json::json;

    #[test]
    fn pod_network_name_is_required() {
        let err = serde_json::from_value::<PodNetworkAttachmentSpec>(json!({
            "parametersRefs": []
        }));
        assert!(err.is_err());
    }

    #[test]
    fn serializes_namespaced_object() {
        let mut attachment = PodNetworkAttachment::new("db-storage", PodNetworkAttachmentSpec::new("storage"));
        attachment.metadata.namespace = Some("databases".to_string());
        attachment.spec.parameters_refs.push(ParametersRef::new(
            "k8s.cni.cncf.io",
            "network-attachment-definitions",
            "sriov",
        ));

        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(value["kind"], "PodNetworkAttachment");
        assert_eq!(value["metadata"]["namespace"], "databases");
        assert_eq!(
            value["spec"],
            json!({
                "podNetworkName": "storage",
                "parametersRefs": [
                    {"group": "k8s.cni.cncf.io", "kind": "network-attachment-definitions", "name": "sriov"}
                ]
            })
        );

        let back: PodNetworkAttachment = serde_json::from_value(value).unwrap();
        assert_eq!(back, attachment);
        assert!(back.attaches_to("storage"));
        assert!(!back.attaches_to("default"));
    }

    #[test]
    fn round_trips_status_conditions() {
        let mut attachment = PodNetworkAttachment::new("eth1", PodNetworkAttachmentSpec::new("storage"));
        attachment.metadata.namespace = Some("databases".to_string());
        let mut status = PodNetworkAttachmentStatus::default();
        status.set_condition(
            Condition::new(CONDITION_READY, ConditionStatus::False, "PodNetworkNotReady", "PodNetwork storage is not ready")
                .with_observed_generation(Some(3)),
        );
        status.set_condition(Condition::new(
            CONDITION_PARAMS_READY,
            ConditionStatus::True,
            "ParametersAccepted",
            "",
        ));
        attachment.status = Some(status);

        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(value["status"]["conditions"][0]["type"], "Ready");
        assert_eq!(value["status"]["conditions"][0]["observedGeneration"], 3);
        assert_eq!(value["status"]["conditions"][1]["status"], "True");

        let back: PodNetworkAttachment = serde_json::from_value(value).unwrap();
        assert_eq!(back, attachment);
        let status = back.status.as_ref().unwrap();
        assert!(!status.is_ready());
        assert!(status.condition(CONDITION_PARAMS_READY).is_some_and(Condition::is_true));
    }

    #[test]
    fn list_carries_items_and_list_metadata() {
        let list: PodNetworkAttachmentList = serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1alpha1",
            "kind": "PodNetworkAttachmentList",
            "metadata": {"resourceVersion": "230"},
            "items": [
                {
                    "apiVersion": "networking.k8s.io/v1alpha1",
                    "kind": "PodNetworkAttachment",
                    "metadata": {"name": "eth1", "namespace": "team-a"},
                    "spec": {"podNetworkName": "storage"}
                },
                {
                    "apiVersion": "networking.k8s.io/v1alpha1",
                    "kind": "PodNetworkAttachment",
                    "metadata": {"name": "eth1", "namespace": "team-b"},
                    "spec": {"podNetworkName": "default"}
                }
            ]
        }))
        .unwrap();
        assert_eq!(list.metadata.resource_version.as_deref(), Some("230"));
        let namespaces: Vec<_> = list.items.iter().map(|a| a.metadata.namespace.as_deref()).collect();
        assert_eq!(namespaces, vec![Some("team-a"), Some("team-b")]);
        assert!(list.items[0].attaches_to("storage"));

        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["items"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["items"][1]["spec"]["podNetworkName"], "default");
    }
}
