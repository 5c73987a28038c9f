//! Error types for aggregation, simulation and search.
//!
//! Every failure the engine reports is a `GearError`. Data-integrity issues
//! such as unknown stat names or stale path configs are tolerated and never
//! become errors.

use crate::buffs::BuffCategory;
use crate::derive::Derived;
use crate::item::{ItemId, Slot};
use crate::job::Job;
use crate::objective::ProfileId;
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[Derived]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors reported by the engine.
///
/// # Examples
///
/// ```rust
/// use zzgear::{GearError, ProfileId};
///
/// let err = GearError::UnknownProfile(ProfileId::from("speed"));
/// assert_eq!(err.to_string(), "Unknown optimization profile: speed");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GearError {
    /// Derivation rules depend on each other in a loop.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    RuleCycle { path: Vec<Derived> },

    /// Two derivation rules produce the same output.
    #[error("Duplicate derivation rule for {0}")]
    DuplicateRule(Derived),

    /// A derivation rule depends on a value no rule produces.
    #[error("Rule for {rule} depends on {dependency}, which no rule derives")]
    MissingRule { rule: Derived, dependency: Derived },

    /// The scenario needs data the request does not carry.
    #[error("Missing scenario data for profile {profile}: {reason}")]
    MissingScenarioData { profile: ProfileId, reason: String },

    #[error("Unknown optimization profile: {0}")]
    UnknownProfile(ProfileId),

    #[error("Unknown item id: {0}")]
    UnknownItem(ItemId),

    #[error("Too many {category} effects: limit is {limit}")]
    BuffLimit { category: BuffCategory, limit: usize },

    #[error("Duplicate {category} effect: {name}")]
    DuplicateBuff { category: BuffCategory, name: String },

    #[error("{item} cannot be equipped in {slot}")]
    SlotMismatch { item: String, slot: Slot },

    #[error("{job} cannot equip {item}")]
    JobRestricted { item: String, job: Job },

    #[error("Two-handed main weapon {0} requires an empty sub slot")]
    TwoHandedConflict(String),

    #[error("{0} in the sub slot requires dual wield")]
    DualWieldRequired(String),

    #[error("{0} is rare and cannot fill both slots of a pair")]
    RareDuplicate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller cancelled the search; reported at the next slot boundary.
    #[error("Search cancelled before filling {0}")]
    Cancelled(Slot),
}

impl From<serde_json::Error> for GearError {
    fn from(err: serde_json::Error) -> Self {
        GearError::InvalidConfig(err.to_string())
    }
}
