//! Scene identifier type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid scene ids
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SceneIdError {
    #[error("scene id cannot be empty")]
    Empty,

    #[error(
        "scene id contains invalid characters (must be lowercase alphanumeric with underscores, cannot start/end with underscore)"
    )]
    InvalidChars,
}

/// Identifier of a scene as assigned by the host platform (e.g., "movie_time")
///
/// Scene ids are lowercase alphanumeric slugs with underscores. They are
/// stable across renames of the scene's display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SceneId(String);

impl SceneId {
    /// Create a new SceneId, validating the slug rules
    pub fn new(id: impl Into<String>) -> Result<Self, SceneIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(SceneIdError::Empty);
        }
        if !Self::is_valid_slug(&id) {
            return Err(SceneIdError::InvalidChars);
        }

        Ok(Self(id))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check slug validity (lowercase alphanumeric + underscore, cannot start/end with _)
    fn is_valid_slug(s: &str) -> bool {
        if s.starts_with('_') || s.ends_with('_') {
            return false;
        }
        s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl FromStr for SceneId {
    type Err = SceneIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SceneId {
    type Error = SceneIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SceneId> for String {
    fn from(id: SceneId) -> String {
        id.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
