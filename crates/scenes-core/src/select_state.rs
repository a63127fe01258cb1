//! Published snapshot of one area's select entity

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Context;

/// The outward-facing state of one area's scene select entity
///
/// Consumers (UI, automations) read the current option, the allowed options,
/// and display attributes from this snapshot. `last_changed` only advances
/// when the state value itself changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectState {
    /// Stable unique id of the entity (e.g., "area_scenes_living_room")
    pub unique_id: String,

    /// The current option label (a scene label, or "None")
    pub state: String,

    /// The option labels a consumer may select, in order
    pub options: Vec<String>,

    /// Display attributes (area_id, color, reset_mode, scene ids)
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the state value last changed
    pub last_changed: DateTime<Utc>,

    /// When the snapshot was last written (even if the value didn't change)
    pub last_updated: DateTime<Utc>,

    /// Context of the transition that produced this state
    pub context: Context,
}

impl SelectState {
    /// Create a fresh state with current timestamps
    pub fn new(
        unique_id: impl Into<String>,
        state: impl Into<String>,
        options: Vec<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        Self {
            unique_id: unique_id.into(),
            state: state.into(),
            options,
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    /// Create an updated snapshot, preserving last_changed if the value is the same
    pub fn with_update(
        &self,
        state: impl Into<String>,
        options: Vec<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        let state = state.into();
        let changed = self.state != state;

        Self {
            unique_id: self.unique_id.clone(),
            state,
            options,
            attributes,
            last_changed: if changed { now } else { self.last_changed },
            last_updated: now,
            context,
        }
    }

    /// Get an attribute value by key
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl PartialEq for SelectState {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps and context are not compared
        self.unique_id == other.unique_id
            && self.state == other.state
            && self.options == other.options
            && self.attributes == other.attributes
    }
}
