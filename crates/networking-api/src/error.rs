//! Validation errors
//!
//! A `FieldError` names one offending field by its JSON path (e.g.
//! `spec.cidrs[1]`). `ValidationError` carries every field error found in
//! one object.

use thiserror::Error;

/// A problem with a single field
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    /// A required field is missing or empty
    #[error("{field}: Required value")]
    Required {
        /// JSON path of the field
        field: String,
    },

    /// A field has a value that does not satisfy its format
    #[error("{field}: Invalid value {value:?}: {reason}")]
    Invalid {
        /// JSON path of the field
        field: String,
        /// Offending value as received
        value: String,
        /// What the value should look like
        reason: String,
    },

    /// A list holds more entries than allowed
    #[error("{field}: Too many: {actual}: must have at most {max} items")]
    TooMany {
        /// JSON path of the field
        field: String,
        /// Number of entries received
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// A list holds two entries that must be distinct
    #[error("{field}: Duplicate value {value:?}")]
    Duplicate {
        /// JSON path of the field
        field: String,
        /// Duplicated value
        value: String,
    },

    /// An update changed a field that may not change
    #[error("{field}: field is immutable")]
    Immutable {
        /// JSON path of the field
        field: String,
    },
}

impl FieldError {
    pub(crate) fn required(field: impl Into<String>) -> Self {
        Self::Required { field: field.into() }
    }

    pub(crate) fn invalid(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn immutable(field: impl Into<String>) -> Self {
        Self::Immutable { field: field.into() }
    }

    /// JSON path of the offending field
    pub fn field(&self) -> &str {
        match self {
            Self::Required { field }
            | Self::Invalid { field, .. }
            | Self::TooMany { field, .. }
            | Self::Duplicate { field, .. }
            | Self::Immutable { field } => field,
        }
    }
}

/// Joins field errors into one comma-separated line
pub fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn quoted_name(name: &Option<String>) -> String {
    name.as_ref().map(|n| format!(" {n:?}")).unwrap_or_default()
}

/// Every field error found while validating one object
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}{} is invalid: {}", quoted_name(.name), join_field_errors(.errors))]
pub struct ValidationError {
    /// Kind of the object that failed validation
    pub kind: &'static str,
    /// Name of the object, when known
    pub name: Option<String>,
    /// Individual problems, in field order
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Whether any error refers to the given field path
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field() == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_field_error() {
        let err = ValidationError {
            kind: "ServiceCIDR",
            name: Some("kubernetes".to_string()),
            errors: vec![
                FieldError::invalid("spec.cidrs[0]", "10.0.0.1/24", "must be the network address"),
                FieldError::TooMany { field: "spec.cidrs".to_string(), actual: 3, max: 2 },
            ],
        };
        assert_eq!(
            err.to_string(),
            "ServiceCIDR \"kubernetes\" is invalid: \
             spec.cidrs[0]: Invalid value \"10.0.0.1/24\": must be the network address, \
             spec.cidrs: Too many: 3: must have at most 2 items"
        );
        assert!(err.has_field("spec.cidrs"));
        assert!(!err.has_field("metadata.name"));
    }
}
