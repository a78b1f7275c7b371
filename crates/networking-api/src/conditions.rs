//! Status conditions
//!
//! `Condition` has the same wire shape as `meta/v1.Condition`. Condition
//! lists are maps keyed by `type`: the helpers here never leave two entries
//! with the same type, and the generated CRD schema marks every
//! `conditions` field with `x-kubernetes-list-type: map` so that server-side
//! merges key on `type` as well.

use chrono::{DateTime, SubsecRound, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition type reporting that a resource is usable
pub const CONDITION_READY: &str = "Ready";

/// Condition type reporting that a resource's parameters references are acceptable
pub const CONDITION_PARAMS_READY: &str = "ParamsReady";

/// Status value of a condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
pub enum ConditionStatus {
    /// The condition holds
    True,

    /// The condition does not hold
    False,

    /// The controller cannot tell
    #[default]
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        })
    }
}

/// Observed state of one aspect of a resource
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition in CamelCase (e.g. "Ready")
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition
    pub status: ConditionStatus,

    /// `metadata.generation` the condition was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Last time the condition moved from one status to another
    pub last_transition_time: DateTime<Utc>,

    /// Programmatic identifier for the last transition, in CamelCase
    pub reason: String,

    /// Human-readable detail about the transition (may be empty)
    #[serde(default)]
    pub message: String,
}

impl Condition {
    /// New condition stamped with the current time at second precision
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            observed_generation: None,
            last_transition_time: Utc::now().trunc_subsecs(0),
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Records the generation this condition was computed from
    #[must_use]
    pub fn with_observed_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }

    /// Whether the status is `True`
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    fn same_state(&self, other: &Self) -> bool {
        self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
            && self.observed_generation == other.observed_generation
    }
}

/// Finds the condition with the given type
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Whether the condition with the given type exists and is `True`
pub fn is_condition_true(conditions: &[Condition], type_: &str) -> bool {
    find_condition(conditions, type_).is_some_and(Condition::is_true)
}

/// Inserts or replaces the condition with the same type
///
/// The existing `last_transition_time` is kept when the status value does not
/// change. Returns `true` if anything besides the timestamp changed, i.e.
/// when the status needs to be written back.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.same_state(&condition) {
                return false;
            }
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
            true
        }
        None => {
            conditions.push(condition);
            true
        }
    }
}

/// Removes the condition with the given type, returning whether one was present
pub fn remove_condition(conditions: &mut Vec<Condition>, type_: &str) -> bool {
    let before = conditions.len();
    conditions.retain(|c| c.type_ != type_);
    conditions.len() != before
}

/// Status types that carry a condition list
pub trait ConditionedStatus {
    /// The current conditions
    fn conditions(&self) -> &[Condition];

    /// Mutable access to the conditions
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// Finds the condition with the given type
    fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(self.conditions(), type_)
    }

    /// Whether `Ready` is `True`
    fn is_ready(&self) -> bool {
        is_condition_true(self.conditions(), CONDITION_READY)
    }

    /// See [`set_condition`]
    fn set_condition(&mut self, condition: Condition) -> bool {
        set_condition(self.conditions_mut(), condition)
    }
}
