//! networking.k8s.io/v1alpha1 resource definitions
//!
//! Kubernetes resource types for IP address management and pod networks:
//! - `IPAddress`: one allocated IP, named after the address itself
//! - `ServiceCIDR`: IP blocks ClusterIPs are allocated from
//! - `PodNetwork`: a logical network pods can attach to
//! - `PodNetworkAttachment`: pod-level configuration of a PodNetwork
//!
//! Alongside the types this crate provides condition helpers, validation of
//! the documented invariants, and CRD manifest generation.

pub mod conditions;
pub mod crd;
pub mod error;
pub mod ip_address;
pub mod pod_network;
pub mod pod_network_attachment;
pub mod references;
pub mod service_cidr;
pub mod validation;

pub use conditions::*;
pub use error::{FieldError, ValidationError};
pub use ip_address::*;
pub use pod_network::*;
pub use pod_network_attachment::*;
pub use references::*;
pub use service_cidr::*;

/// API group of every resource in this crate
pub const API_GROUP: &str = "networking.k8s.io";
/// API version of every resource in this crate
pub const API_VERSION: &str = "v1alpha1";
