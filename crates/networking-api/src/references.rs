//! Object references shared by the networking resources
//!
//! Two foreign-key-style records:
//! - `ParentReference`: the owner of an `IPAddress` (group/resource/namespace/name)
//! - `ParametersRef`: a vendor-specific parameters object (group/kind/name/namespace)
//!
//! Neither is resolved here. Consumers look the target up themselves.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to the parent object an `IPAddress` is attached to
///
/// `resource` is the plural resource name (e.g. "services"), not the kind.
/// An empty or missing `group` means the core API group.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    /// Group of the object being referenced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Resource of the object being referenced
    pub resource: String,

    /// Namespace of the object being referenced (absent for cluster-scoped parents)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Name of the object being referenced
    pub name: String,
}

impl ParentReference {
    /// Reference to a core-group, cluster-scoped parent
    pub fn new(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: None,
            resource: resource.into(),
            namespace: None,
            name: name.into(),
        }
    }

    /// Reference to a core-group, namespaced parent
    pub fn namespaced(
        resource: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::new(resource, name)
        }
    }

    /// Sets the API group of the parent
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// A Service parent, the usual owner of a ClusterIP
    pub fn service(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::namespaced("services", namespace, name)
    }
}

/// Renders as `group/resource/namespace/name`, with empty segments for absent
/// group or namespace.
impl fmt::Display for ParentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.group.as_deref().unwrap_or_default(),
            self.resource,
            self.namespace.as_deref().unwrap_or_default(),
            self.name
        )
    }
}

/// Points to a custom resource containing additional parameters for a
/// `PodNetwork` or `PodNetworkAttachment`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParametersRef {
    /// API group of the resource (e.g. "k8s.cni.cncf.io"); empty for the core group
    pub group: String,

    /// API name of the resource (e.g. "network-attachment-definitions")
    pub kind: String,

    /// Name of the resource
    pub name: String,

    /// Namespace of the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ParametersRef {
    /// Create a cluster-scoped parameters reference
    pub fn new(group: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    /// Create a parameters reference in the given namespace
    pub fn with_namespace(
        group: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::new(group, kind, name)
        }
    }
}

impl fmt::Display for ParametersRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.group,
            self.kind,
            self.namespace.as_deref().unwrap_or_default(),
            self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parent_reference_omits_absent_optional_fields() {
        let parent = ParentReference::new("nodes", "worker-1");
        let value = serde_json::to_value(&parent).unwrap();
        assert_eq!(value, json!({"resource": "nodes", "name": "worker-1"}));
    }

    #[test]
    fn parent_reference_display_keeps_empty_segments() {
        let parent = ParentReference::service("default", "kubernetes");
        assert_eq!(parent.to_string(), "/services/default/kubernetes");

        let parent = ParentReference::new("gateways", "edge").with_group("gateway.networking.k8s.io");
        assert_eq!(parent.to_string(), "gateway.networking.k8s.io/gateways//edge");
    }

    #[test]
    fn parameters_ref_group_is_always_serialized() {
        let params = ParametersRef::new("", "configmaps", "net-params");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            json!({"group": "", "kind": "configmaps", "name": "net-params"})
        );
    }

    #[test]
    fn parameters_ref_requires_kind() {
        let err = serde_json::from_value::<ParametersRef>(json!({
            "group": "k8s.cni.cncf.io",
            "name": "macvlan"
        }));
        assert!(err.is_err());
    }
}
