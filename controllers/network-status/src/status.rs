//! Desired conditions for each kind.
//!
//! Everything here is a pure function of the objects passed in, so the
//! reconciler only decides when to read and write.

use networking_api::error::join_field_errors;
use networking_api::validation::{
    validate_parameters_refs, validate_pod_network, validate_service_cidr,
};
use networking_api::{
    CONDITION_PARAMS_READY, CONDITION_READY, Condition, ConditionStatus, ConditionedStatus,
    IPAddress, ParametersRef, PodNetwork, PodNetworkAttachment,
    SERVICE_CIDR_REASON_TERMINATING, ServiceCIDR,
};
use std::sync::Arc;

/// ServiceCIDR blocks passed validation
pub const REASON_CIDRS_ACCEPTED: &str = "CIDRsAccepted";
/// ServiceCIDR blocks failed validation
pub const REASON_INVALID_CIDRS: &str = "InvalidCIDRs";
/// PodNetwork is administratively enabled
pub const REASON_ENABLED: &str = "Enabled";
/// PodNetwork is administratively disabled
pub const REASON_DISABLED: &str = "Disabled";
/// Parameters references failed validation
pub const REASON_INVALID_PARAMETERS: &str = "InvalidParameters";
/// Parameters references passed validation
pub const REASON_PARAMETERS_ACCEPTED: &str = "ParametersAccepted";
/// The attachment's PodNetwork exists and is ready
pub const REASON_POD_NETWORK_READY: &str = "PodNetworkReady";
/// The attachment's PodNetwork does not exist
pub const REASON_POD_NETWORK_NOT_FOUND: &str = "PodNetworkNotFound";
/// The attachment's PodNetwork exists but is not ready
pub const REASON_POD_NETWORK_NOT_READY: &str = "PodNetworkNotReady";

/// `Ready` condition of a ServiceCIDR
pub fn service_cidr_ready(cidr: &ServiceCIDR) -> Condition {
    let condition = if cidr.is_terminating() {
        Condition::new(
            CONDITION_READY,
            ConditionStatus::False,
            SERVICE_CIDR_REASON_TERMINATING,
            "ServiceCIDR is being deleted",
        )
    } else {
        match validate_service_cidr(cidr) {
            Ok(()) => Condition::new(
                CONDITION_READY,
                ConditionStatus::True,
                REASON_CIDRS_ACCEPTED,
                "",
            ),
            Err(e) => Condition::new(
                CONDITION_READY,
                ConditionStatus::False,
                REASON_INVALID_CIDRS,
                e.to_string(),
            ),
        }
    };
    condition.with_observed_generation(cidr.metadata.generation)
}

fn params_ready(refs: &[ParametersRef], generation: Option<i64>) -> Condition {
    let errors = validate_parameters_refs("spec.parametersRefs", refs);
    let condition = if errors.is_empty() {
        Condition::new(
            CONDITION_PARAMS_READY,
            ConditionStatus::True,
            REASON_PARAMETERS_ACCEPTED,
            "",
        )
    } else {
        Condition::new(
            CONDITION_PARAMS_READY,
            ConditionStatus::False,
            REASON_INVALID_PARAMETERS,
            join_field_errors(&errors),
        )
    };
    condition.with_observed_generation(generation)
}

/// `Ready` and `ParamsReady` conditions of a PodNetwork
pub fn pod_network_conditions(network: &PodNetwork) -> Vec<Condition> {
    let generation = network.metadata.generation;

    let ready = match validate_pod_network(network) {
        Err(e) => Condition::new(
            CONDITION_READY,
            ConditionStatus::False,
            REASON_INVALID_PARAMETERS,
            e.to_string(),
        ),
        Ok(()) if network.spec.enabled => Condition::new(
            CONDITION_READY,
            ConditionStatus::True,
            REASON_ENABLED,
            "",
        ),
        Ok(()) => Condition::new(
            CONDITION_READY,
            ConditionStatus::False,
            REASON_DISABLED,
            "PodNetwork is administratively disabled",
        ),
    };

    vec![
        ready.with_observed_generation(generation),
        params_ready(&network.spec.parameters_refs, generation),
    ]
}

/// `Ready` and `ParamsReady` conditions of a PodNetworkAttachment, given the
/// PodNetwork it names if that exists
pub fn attachment_conditions(
    attachment: &PodNetworkAttachment,
    network: Option<&PodNetwork>,
) -> Vec<Condition> {
    let generation = attachment.metadata.generation;
    let network_name = &attachment.spec.pod_network_name;

    let ready = match network {
        None => Condition::new(
            CONDITION_READY,
            ConditionStatus::False,
            REASON_POD_NETWORK_NOT_FOUND,
            format!("PodNetwork {network_name:?} not found"),
        ),
        Some(network) if network.is_ready() => Condition::new(
            CONDITION_READY,
            ConditionStatus::True,
            REASON_POD_NETWORK_READY,
            "",
        ),
        Some(_) => Condition::new(
            CONDITION_READY,
            ConditionStatus::False,
            REASON_POD_NETWORK_NOT_READY,
            format!("PodNetwork {network_name:?} is not ready"),
        ),
    };

    vec![
        ready.with_observed_generation(generation),
        params_ready(&attachment.spec.parameters_refs, generation),
    ]
}

/// Applies `desired` on top of the current status
///
/// Returns the status to write back, or `None` when nothing but timestamps
/// would change.
pub fn merge_conditions<S>(current: Option<&S>, desired: Vec<Condition>) -> Option<S>
where
    S: ConditionedStatus + Clone + Default,
{
    let mut status = current.cloned().unwrap_or_default();
    let mut changed = false;
    for condition in desired {
        changed |= status.set_condition(condition);
    }
    changed.then_some(status)
}

/// Names of the IPAddresses inside `cidr` that no other ServiceCIDR would
/// still cover once it is gone
///
/// Only ServiceCIDRs that are ready and not being deleted count as cover.
/// `others` may include `cidr` itself.
pub fn uncovered_addresses(
    cidr: &ServiceCIDR,
    others: &[Arc<ServiceCIDR>],
    addresses: &[Arc<IPAddress>],
) -> Vec<String> {
    let name = cidr.metadata.name.as_deref();
    let cover: Vec<&Arc<ServiceCIDR>> = others
        .iter()
        .filter(|other| other.metadata.name.as_deref() != name)
        .filter(|other| other.is_ready() && !other.is_terminating())
        .collect();

    addresses
        .iter()
        .filter_map(|address| {
            let ip = address.ip()?;
            let uncovered = cidr.contains(ip) && !cover.iter().any(|other| other.contains(ip));
            uncovered.then(|| address.metadata.name.clone().unwrap_or_default())
        })
        .collect()
}
