//! The value an area's state machine can hold

use serde::{Deserialize, Serialize};

use crate::{SceneId, OPTION_NONE};

/// The authoritative "active scene" value of one area
///
/// Always either `None` or a scene belonging to the area's current scene set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// No scene is believed active
    #[default]
    None,
    /// The named scene is believed active
    Scene(SceneId),
}

impl Selection {
    /// Get the contained scene id, if any
    pub fn scene_id(&self) -> Option<&SceneId> {
        match self {
            Selection::None => None,
            Selection::Scene(id) => Some(id),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

impl From<SceneId> for Selection {
    fn from(id: SceneId) -> Self {
        Selection::Scene(id)
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::None => write!(f, "{}", OPTION_NONE),
            Selection::Scene(id) => write!(f, "{}", id),
        }
    }
}
