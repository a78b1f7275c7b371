//! CustomResourceDefinition manifests
//!
//! Groups ending in `k8s.io` are protected: the apiserver only serves CRDs
//! in them when they carry the `api-approved.kubernetes.io` annotation.

use crate::ip_address::IPAddress;
use crate::pod_network::PodNetwork;
use crate::pod_network_attachment::PodNetworkAttachment;
use crate::service_cidr::ServiceCIDR;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

/// Annotation required on CRDs in protected API groups
pub const API_APPROVED_ANNOTATION: &str = "api-approved.kubernetes.io";

/// Value marking the CRDs as not approved through the API review process
pub const API_APPROVED_VALUE: &str = "unapproved, experimental-only; please use the built-in API";

/// The CRD for `K` with the protected-group annotation applied
pub fn crd_for<K: CustomResourceExt>() -> CustomResourceDefinition {
    let mut crd = K::crd();
    crd.metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(API_APPROVED_ANNOTATION.to_string(), API_APPROVED_VALUE.to_string());
    crd
}

/// CRDs for every resource in the group, in a stable order
pub fn all() -> Vec<CustomResourceDefinition> {
    vec![
        crd_for::<IPAddress>(),
        crd_for::<ServiceCIDR>(),
        crd_for::<PodNetwork>(),
        crd_for::<PodNetworkAttachment>(),
    ]
}

/// All CRDs as one multi-document YAML stream
pub fn to_yaml() -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for crd in all() {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&crd)?);
    }
    Ok(out)
}
