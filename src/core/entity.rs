//! Entity trait - common interface for all entity types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::EntityId;

/// Common trait for all stored entities
pub trait Entity: Serialize + DeserializeOwned {
    /// The entity type prefix (e.g., "BOQ", "CAT")
    const PREFIX: &'static str;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Get the entity's title
    fn title(&self) -> &str;

    /// Get the entity's status
    fn status(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;
}

/// Lifecycle status of a bill of quantities
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Status {
    #[default]
    Draft,
    Validated,
    Approved,
    Rejected,
}

impl Status {
    /// Approved and rejected BOQs can only change through a new version
    pub fn is_locked(&self) -> bool {
        matches!(self, Status::Approved | Status::Rejected)
    }

    pub fn all() -> &'static [Status] {
        &[
            Status::Draft,
            Status::Validated,
            Status::Approved,
            Status::Rejected,
        ]
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Draft => write!(f, "draft"),
            Status::Validated => write!(f, "validated"),
            Status::Approved => write!(f, "approved"),
            Status::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Status::Draft),
            "validated" => Ok(Status::Validated),
            "approved" => Ok(Status::Approved),
            "rejected" => Ok(Status::Rejected),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("Approved".parse::<Status>().unwrap(), Status::Approved);
        assert!("released".parse::<Status>().is_err());
    }

    #[test]
    fn test_locked_statuses() {
        assert!(!Status::Draft.is_locked());
        assert!(!Status::Validated.is_locked());
        assert!(Status::Approved.is_locked());
        assert!(Status::Rejected.is_locked());
    }
}
