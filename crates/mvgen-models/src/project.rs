//! Project identity and the persisted project record.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a string is not a valid project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid project id: {0}")]
pub struct InvalidProjectId(pub String);

/// Unique identifier for a project.
///
/// Project IDs end up in artifact filenames, so only canonical UUIDs are
/// accepted from untrusted input (see [`ProjectId::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Generate a new random project ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse an untrusted identifier, rejecting anything that is not a UUID.
    pub fn parse(s: &str) -> Result<Self, InvalidProjectId> {
        let trimmed = s.trim();
        Uuid::parse_str(trimmed)
            .map(|u| Self(u.hyphenated().to_string()))
            .map_err(|_| InvalidProjectId(s.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename prefix shared by every artifact of this project.
    pub fn file_prefix(&self) -> String {
        format!("{}_", self.0)
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = InvalidProjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Persisted record created by the lyrics stage.
///
/// This is the only artifact the lyrics stage produces; every later stage
/// reads the lyrics from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub prompt: String,
    pub lyrics: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectRecord {
    /// Create a record for freshly generated lyrics under a new ID.
    pub fn new(prompt: impl Into<String>, lyrics: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            prompt: prompt.into(),
            lyrics: lyrics.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_roundtrips_through_parse() {
        let id = ProjectId::new();
        let parsed = ProjectId::parse(id.as_str()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_project_id_rejects_path_segments() {
        assert!(ProjectId::parse("../../etc/passwd").is_err());
        assert!(ProjectId::parse("").is_err());
        assert!(ProjectId::parse("abc").is_err());
    }

    #[test]
    fn test_project_id_normalises_case() {
        let parsed = ProjectId::parse("550E8400-E29B-41D4-A716-446655440000").unwrap();
        assert_eq!(parsed.as_str(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(parsed.file_prefix(), "550e8400-e29b-41d4-a716-446655440000_");
    }

    #[test]
    fn test_project_record_serialization() {
        let record = ProjectRecord::new("a rainy city night", "la la");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["prompt"], "a rainy city night");
        assert_eq!(json["id"], record.id.as_str());
    }
}
