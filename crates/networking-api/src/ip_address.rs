//! IPAddress CRD
//!
//! A single IP of a single IP family, used by APIs that allocate addresses
//! (the Service API allocates ClusterIPs this way). To keep each IP unique
//! the object name is the address in canonical form: dotted decimal without
//! leading zeros for IPv4, RFC 5952 for IPv6.
//!
//! Valid: `192.168.1.5`, `2001:db8::1`, `2001:db8:aaaa:bbbb:cccc:dddd:eeee:1`
//! Invalid: `10.01.2.3`, `2001:db8:0:0:0::1`

use crate::references::ParentReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use kube::core::ObjectList;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// IPAddressSpec describes the attributes of an IP address
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "networking.k8s.io",
    version = "v1alpha1",
    kind = "IPAddress",
    plural = "ipaddresses",
    singular = "ipaddress",
    derive = "PartialEq",
    printcolumn = r#"{"name":"ParentRef","type":"string","jsonPath":".spec.parentRef.resource"}"#,
    printcolumn = r#"{"name":"Parent","type":"string","jsonPath":".spec.parentRef.name"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [{
    "rule": "!has(oldSelf.parentRef) || (has(self.parentRef) && self.parentRef == oldSelf.parentRef)",
    "message": "parentRef is immutable once set"
}]))]
pub struct IPAddressSpec {
    /// Resource this IPAddress is attached to. An IPAddress must reference
    /// a parent object, and the reference cannot change once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ref: Option<ParentReference>,
}

/// List of IPAddress objects
pub type IPAddressList = ObjectList<IPAddress>;

impl IPAddress {
    /// IPAddress named after `ip` in canonical form, owned by `parent`
    pub fn for_ip(ip: IpAddr, parent: ParentReference) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(ip.to_string()),
                ..ObjectMeta::default()
            },
            spec: IPAddressSpec {
                parent_ref: Some(parent),
            },
        }
    }

    /// The address this object represents, if its name parses as one
    ///
    /// Parsing accepts some non-canonical spellings; use
    /// [`crate::validation::validate_ip_address`] to enforce the naming rule.
    pub fn ip(&self) -> Option<IpAddr> {
        self.metadata.name.as_deref()?.parse().ok()
    }

    /// The owning object, if one is set
    pub fn parent_ref(&self) -> Option<&ParentReference> {
        self.spec.parent_ref.as_ref()
    }
}
