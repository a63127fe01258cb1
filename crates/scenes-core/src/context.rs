//! Context type for tracking the origin and causality of events

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Context identifying who initiated an action
///
/// Every event and activation command carries a Context. Child contexts keep
/// a parent_id so the chain "user selection -> activation command ->
/// activation echo" can be traced, which is how the selection surface tells
/// its own echoes apart from genuinely external activations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this context (ULID)
    pub id: String,

    /// User ID that initiated this action (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Parent context ID for tracking causality chains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Context {
    /// Create a new context with a fresh ULID
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: None,
            parent_id: None,
        }
    }

    /// Create a new context with a specific user
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: Some(user_id.into()),
            parent_id: None,
        }
    }

    /// Create a child context with this context as parent
    pub fn child(&self) -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: self.user_id.clone(),
            parent_id: Some(self.id.clone()),
        }
    }

    /// Check whether `other` is this context or descends from it
    pub fn is_ancestor_of(&self, other: &Context) -> bool {
        other.id == self.id || other.parent_id.as_deref() == Some(&self.id)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
