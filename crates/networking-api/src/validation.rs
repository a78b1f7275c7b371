//! Validation of the networking resources
//!
//! Each `validate_*` function collects every problem in one pass and returns
//! them together as a [`ValidationError`]. Update variants also enforce
//! immutability against the previous object.

use crate::error::{FieldError, ValidationError};
use crate::ip_address::IPAddress;
use crate::pod_network::PodNetwork;
use crate::pod_network_attachment::PodNetworkAttachment;
use crate::references::ParametersRef;
use crate::service_cidr::{MAX_SERVICE_CIDRS, ServiceCIDR};
use ipnetwork::IpNetwork;
use std::net::IpAddr;

const DNS1123_SUBDOMAIN_MAX_LEN: usize = 253;
const DNS1123_LABEL_MAX_LEN: usize = 63;

/// Parses `value` as an IP address and checks that it is spelled canonically
pub fn parse_canonical_ip(value: &str) -> Result<IpAddr, String> {
    let ip: IpAddr = value
        .parse()
        .map_err(|_| "must be a valid IP address, (e.g. 10.9.8.7 or 2001:db8::ffff)".to_string())?;
    let canonical = ip.to_string();
    if canonical != value {
        return Err(format!("must be in canonical form ({canonical:?})"));
    }
    Ok(ip)
}

/// Parses `value` as a CIDR block in canonical `addr/prefix` form with no
/// host bits set
pub fn parse_canonical_cidr(value: &str) -> Result<IpNetwork, String> {
    if !value.contains('/') {
        return Err("must be a valid CIDR value, (e.g. 10.9.8.0/24 or 2001:db8::/64)".to_string());
    }
    let network: IpNetwork = value
        .parse()
        .map_err(|_| "must be a valid CIDR value, (e.g. 10.9.8.0/24 or 2001:db8::/64)".to_string())?;
    let canonical = format!("{}/{}", network.network(), network.prefix());
    if canonical != value {
        return Err(format!("must be in canonical form ({canonical:?})"));
    }
    Ok(network)
}

/// Whether `value` is a lowercase RFC 1123 subdomain, the format of most
/// object names
pub fn is_dns1123_subdomain(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= DNS1123_SUBDOMAIN_MAX_LEN
        && value.split('.').all(is_dns1123_label)
}

fn is_dns1123_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            label.len() <= DNS1123_LABEL_MAX_LEN
                && (first.is_ascii_lowercase() || first.is_ascii_digit())
                && (last.is_ascii_lowercase() || last.is_ascii_digit())
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}

fn finish(kind: &'static str, name: Option<&str>, errors: Vec<FieldError>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            kind,
            name: name.map(str::to_string),
            errors,
        })
    }
}

fn ip_address_errors(address: &IPAddress) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match address.metadata.name.as_deref() {
        None | Some("") => errors.push(FieldError::required("metadata.name")),
        Some(name) => {
            if let Err(reason) = parse_canonical_ip(name) {
                errors.push(FieldError::invalid("metadata.name", name, reason));
            }
        }
    }

    match &address.spec.parent_ref {
        None => errors.push(FieldError::required("spec.parentRef")),
        Some(parent) => {
            if parent.resource.is_empty() {
                errors.push(FieldError::required("spec.parentRef.resource"));
            }
            if parent.name.is_empty() {
                errors.push(FieldError::required("spec.parentRef.name"));
            }
            if parent.namespace.as_deref().is_some_and(|ns| !is_dns1123_label(ns)) {
                errors.push(FieldError::invalid(
                    "spec.parentRef.namespace",
                    parent.namespace.as_deref().unwrap_or_default(),
                    "must be a lowercase RFC 1123 label",
                ));
            }
        }
    }

    errors
}

/// Validates a new IPAddress
pub fn validate_ip_address(address: &IPAddress) -> Result<(), ValidationError> {
    finish("IPAddress", address.metadata.name.as_deref(), ip_address_errors(address))
}

/// Validates an update of an IPAddress; the parent reference may not change
/// once set
pub fn validate_ip_address_update(old: &IPAddress, new: &IPAddress) -> Result<(), ValidationError> {
    let mut errors = ip_address_errors(new);
    if old.spec.parent_ref.is_some() && old.spec.parent_ref != new.spec.parent_ref {
        errors.push(FieldError::immutable("spec.parentRef"));
    }
    finish("IPAddress", new.metadata.name.as_deref(), errors)
}

fn service_cidr_errors(cidr: &ServiceCIDR) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let cidrs = &cidr.spec.cidrs;

    if cidrs.is_empty() {
        errors.push(FieldError::required("spec.cidrs"));
        return errors;
    }
    if cidrs.len() > MAX_SERVICE_CIDRS {
        errors.push(FieldError::TooMany {
            field: "spec.cidrs".to_string(),
            actual: cidrs.len(),
            max: MAX_SERVICE_CIDRS,
        });
        return errors;
    }

    let mut parsed = Vec::with_capacity(cidrs.len());
    for (i, value) in cidrs.iter().enumerate() {
        match parse_canonical_cidr(value) {
            Ok(network) => parsed.push(network),
            Err(reason) => errors.push(FieldError::invalid(format!("spec.cidrs[{i}]"), value, reason)),
        }
    }

    if let [first, second] = parsed.as_slice() {
        if first.is_ipv4() == second.is_ipv4() {
            errors.push(FieldError::invalid(
                "spec.cidrs[1]",
                &cidrs[1],
                "may specify no more than one IP for each IP family, i.e 192.168.0.0/24 and 2001:db8::/64",
            ));
        }
    }

    errors
}

/// Validates a new ServiceCIDR: one or two canonical blocks, at most one per
/// IP family
pub fn validate_service_cidr(cidr: &ServiceCIDR) -> Result<(), ValidationError> {
    finish("ServiceCIDR", cidr.metadata.name.as_deref(), service_cidr_errors(cidr))
}

/// Validates an update of a ServiceCIDR; the blocks are immutable
pub fn validate_service_cidr_update(old: &ServiceCIDR, new: &ServiceCIDR) -> Result<(), ValidationError> {
    let mut errors = service_cidr_errors(new);
    if old.spec.cidrs != new.spec.cidrs {
        errors.push(FieldError::immutable("spec.cidrs"));
    }
    finish("ServiceCIDR", new.metadata.name.as_deref(), errors)
}

/// Field errors of a `parametersRefs` list found at `path`
pub fn validate_parameters_refs(path: &str, refs: &[ParametersRef]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for (i, params) in refs.iter().enumerate() {
        let field = format!("{path}[{i}]");
        if params.kind.is_empty() {
            errors.push(FieldError::required(format!("{field}.kind")));
        }
        if params.name.is_empty() {
            errors.push(FieldError::required(format!("{field}.name")));
        }
        if !params.group.is_empty() && !is_dns1123_subdomain(&params.group) {
            errors.push(FieldError::invalid(
                format!("{field}.group"),
                &params.group,
                "must be a lowercase RFC 1123 subdomain",
            ));
        }
        if refs[..i].contains(params) {
            errors.push(FieldError::Duplicate {
                field,
                value: params.to_string(),
            });
        }
    }
    errors
}

/// Validates a PodNetwork's parameters references and provider
pub fn validate_pod_network(network: &PodNetwork) -> Result<(), ValidationError> {
    let mut errors = validate_parameters_refs("spec.parametersRefs", &network.spec.parameters_refs);
    if network.spec.provider.as_deref() == Some("") {
        errors.push(FieldError::invalid("spec.provider", "", "must not be empty when set"));
    }
    finish("PodNetwork", network.metadata.name.as_deref(), errors)
}

/// Validates a PodNetworkAttachment's PodNetwork name and parameters references
pub fn validate_pod_network_attachment(attachment: &PodNetworkAttachment) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    let pod_network_name = &attachment.spec.pod_network_name;
    if pod_network_name.is_empty() {
        errors.push(FieldError::required("spec.podNetworkName"));
    } else if !is_dns1123_subdomain(pod_network_name) {
        errors.push(FieldError::invalid(
            "spec.podNetworkName",
            pod_network_name,
            "must be a lowercase RFC 1123 subdomain",
        ));
    }
    errors.extend(validate_parameters_refs(
        "spec.parametersRefs",
        &attachment.spec.parameters_refs,
    ));
    finish("PodNetworkAttachment", attachment.metadata.name.as_deref(), errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip_address::IPAddressSpec;
    use crate::pod_network::PodNetworkSpec;
    use crate::pod_network_attachment::PodNetworkAttachmentSpec;
    use crate::references::ParentReference;
    use crate::service_cidr::ServiceCIDRSpec;

    fn address(name: &str) -> IPAddress {
        IPAddress::new(
            name,
            IPAddressSpec {
                parent_ref: Some(ParentReference::service("default", "web")),
            },
        )
    }

    fn service_cidr(cidrs: &[&str]) -> ServiceCIDR {
        ServiceCIDR::new("kubernetes", ServiceCIDRSpec::new(cidrs.iter().copied()))
    }

    #[test]
    fn canonical_ip_names_are_accepted() {
        for name in ["192.168.1.5", "2001:db8::1", "2001:db8:aaaa:bbbb:cccc:dddd:eeee:1", "::ffff:10.0.0.1"] {
            assert!(validate_ip_address(&address(name)).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn non_canonical_ip_names_are_rejected() {
        for name in ["10.01.2.3", "2001:db8:0:0:0::1", "2001:DB8::1", "10.0.0.1/32", "host.example"] {
            let err = validate_ip_address(&address(name)).unwrap_err();
            assert!(err.has_field("metadata.name"), "{name}: {err}");
        }
    }

    #[test]
    fn non_canonical_ipv6_reports_the_canonical_spelling() {
        assert_eq!(
            parse_canonical_ip("2001:db8:0:0:0::1").unwrap_err(),
            "must be in canonical form (\"2001:db8::1\")"
        );
    }

    #[test]
    fn parent_ref_is_required() {
        let address = IPAddress::new("10.0.0.1", IPAddressSpec::default());
        let err = validate_ip_address(&address).unwrap_err();
        assert_eq!(err.errors, vec![FieldError::required("spec.parentRef")]);
    }

    #[test]
    fn parent_ref_needs_resource_and_name() {
        let address = IPAddress::new(
            "10.0.0.1",
            IPAddressSpec {
                parent_ref: Some(ParentReference::default()),
            },
        );
        let err = validate_ip_address(&address).unwrap_err();
        assert!(err.has_field("spec.parentRef.resource"));
        assert!(err.has_field("spec.parentRef.name"));
    }

    #[test]
    fn parent_ref_is_immutable_once_set() {
        let old = address("10.0.0.1");
        let mut new = old.clone();
        new.spec.parent_ref = Some(ParentReference::service("default", "other"));
        let err = validate_ip_address_update(&old, &new).unwrap_err();
        assert_eq!(err.errors, vec![FieldError::immutable("spec.parentRef")]);

        let unbound = IPAddress::new("10.0.0.1", IPAddressSpec::default());
        assert!(validate_ip_address_update(&unbound, &old).is_ok());
    }

    #[test]
    fn single_and_dual_stack_service_cidrs_are_accepted() {
        assert!(validate_service_cidr(&service_cidr(&["10.96.0.0/16"])).is_ok());
        assert!(validate_service_cidr(&service_cidr(&["2001:db8::/64"])).is_ok());
        assert!(validate_service_cidr(&service_cidr(&["10.96.0.0/16", "2001:db8::/64"])).is_ok());
    }

    #[test]
    fn service_cidr_requires_a_block() {
        let err = validate_service_cidr(&service_cidr(&[])).unwrap_err();
        assert_eq!(err.errors, vec![FieldError::required("spec.cidrs")]);
    }

    #[test]
    fn service_cidr_allows_at_most_two_blocks() {
        let err = validate_service_cidr(&service_cidr(&["10.0.0.0/24", "10.1.0.0/24", "2001:db8::/64"])).unwrap_err();
        assert!(matches!(err.errors.as_slice(), [FieldError::TooMany { actual: 3, max: 2, .. }]));
    }

    #[test]
    fn service_cidr_allows_one_block_per_family() {
        let err = validate_service_cidr(&service_cidr(&["10.0.0.0/24", "10.1.0.0/24"])).unwrap_err();
        assert!(err.has_field("spec.cidrs[1]"));

        let err = validate_service_cidr(&service_cidr(&["2001:db8::/64", "fd00::/64"])).unwrap_err();
        assert!(err.has_field("spec.cidrs[1]"));
    }

    #[test]
    fn service_cidr_blocks_must_be_canonical() {
        for value in ["10.0.0.1/24", "10.0.0.0", "10.0/8", "2001:db8:0::/64", "not-a-cidr/8", "10.0.0.0/33"] {
            let err = validate_service_cidr(&service_cidr(&[value])).unwrap_err();
            assert!(err.has_field("spec.cidrs[0]"), "{value}: {err}");
        }
    }

    #[test]
    fn service_cidr_blocks_are_immutable() {
        let old = service_cidr(&["10.96.0.0/16"]);
        let new = service_cidr(&["10.96.0.0/16", "2001:db8::/64"]);
        let err = validate_service_cidr_update(&old, &new).unwrap_err();
        assert_eq!(err.errors, vec![FieldError::immutable("spec.cidrs")]);
        assert!(validate_service_cidr_update(&old, &old.clone()).is_ok());
    }

    #[test]
    fn parameters_refs_need_kind_and_name() {
        let refs = vec![
            ParametersRef::new("k8s.cni.cncf.io", "", ""),
            ParametersRef::new("Not_A_Group", "configmaps", "params"),
        ];
        let errors = validate_parameters_refs("spec.parametersRefs", &refs);
        let fields: Vec<_> = errors.iter().map(FieldError::field).collect();
        assert_eq!(
            fields,
            vec![
                "spec.parametersRefs[0].kind",
                "spec.parametersRefs[0].name",
                "spec.parametersRefs[1].group"
            ]
        );
    }

    #[test]
    fn duplicate_parameters_refs_are_rejected() {
        let params = ParametersRef::new("k8s.cni.cncf.io", "network-attachment-definitions", "macvlan");
        let network = PodNetwork::new(
            "storage",
            PodNetworkSpec {
                parameters_refs: vec![params.clone(), params],
                ..PodNetworkSpec::default()
            },
        );
        let err = validate_pod_network(&network).unwrap_err();
        assert!(matches!(err.errors.as_slice(), [FieldError::Duplicate { field, .. }] if field == "spec.parametersRefs[1]"));
    }

    #[test]
    fn empty_provider_is_rejected() {
        let network = PodNetwork::new("default", PodNetworkSpec::for_provider(""));
        assert!(validate_pod_network(&network).unwrap_err().has_field("spec.provider"));
        assert!(validate_pod_network(&PodNetwork::new("default", PodNetworkSpec::default())).is_ok());
    }

    #[test]
    fn attachment_pod_network_name_must_be_an_object_name() {
        let ok = PodNetworkAttachment::new("a", PodNetworkAttachmentSpec::new("storage.fast"));
        assert!(validate_pod_network_attachment(&ok).is_ok());

        let missing = PodNetworkAttachment::new("a", PodNetworkAttachmentSpec::new(""));
        assert!(validate_pod_network_attachment(&missing).unwrap_err().has_field("spec.podNetworkName"));

        let invalid = PodNetworkAttachment::new("a", PodNetworkAttachmentSpec::new("Storage_Net"));
        assert!(validate_pod_network_attachment(&invalid).unwrap_err().has_field("spec.podNetworkName"));
    }

    #[test]
    fn dns1123_subdomain_rules() {
        assert!(is_dns1123_subdomain("k8s.cni.cncf.io"));
        assert!(is_dns1123_subdomain("a-b.c"));
        assert!(!is_dns1123_subdomain("-a"));
        assert!(!is_dns1123_subdomain("a..b"));
        assert!(!is_dns1123_subdomain(&"a".repeat(254)));
    }
}
