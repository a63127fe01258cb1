//! Core types for the area scenes engine
//!
//! This crate provides the vocabulary shared by every other crate:
//! SceneId, Selection, Context, Event, and the published SelectState.

mod context;
mod event;
mod scene_id;
mod select_state;
mod selection;

pub use context::Context;
pub use event::{Event, EventData, EventOrigin, EventType};
pub use scene_id::{SceneId, SceneIdError};
pub use select_state::SelectState;
pub use selection::Selection;

/// Option label representing "no scene active"
pub const OPTION_NONE: &str = "None";

/// Standard event types exchanged over the bus
pub mod events {
    use super::*;
    use chrono::{DateTime, Utc};

    /// Event type fired by the host whenever any actor activates a scene
    pub const SCENE_ACTIVATED: &str = "scene_activated";

    /// Event type fired by the host when the area registry changes
    pub const AREA_REGISTRY_UPDATED: &str = "area_registry_updated";

    /// Event type fired by the host when the scene registry changes
    pub const SCENE_REGISTRY_UPDATED: &str = "scene_registry_updated";

    /// Event type fired by the configuration surface when an area's
    /// overrides change
    pub const OVERRIDES_UPDATED: &str = "overrides_updated";

    /// Event type fired when a user selection is accepted (automation hook)
    pub const SCENE_SELECTED: &str = "scene_selected";

    /// Event type fired when a published select state changes
    pub const SELECTION_CHANGED: &str = "selection_changed";

    /// Data for SCENE_ACTIVATED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct SceneActivatedData {
        pub scene_id: SceneId,
        pub time: DateTime<Utc>,
    }

    impl EventData for SceneActivatedData {
        fn event_type() -> &'static str {
            SCENE_ACTIVATED
        }
    }

    /// What changed in a registry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RegistryChange {
        Create,
        Update,
        Remove,
    }

    /// Data for AREA_REGISTRY_UPDATED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct AreaRegistryUpdatedData {
        pub area_id: String,
        pub change: RegistryChange,
    }

    impl EventData for AreaRegistryUpdatedData {
        fn event_type() -> &'static str {
            AREA_REGISTRY_UPDATED
        }
    }

    /// Data for SCENE_REGISTRY_UPDATED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct SceneRegistryUpdatedData {
        pub scene_id: SceneId,
        pub change: RegistryChange,
    }

    impl EventData for SceneRegistryUpdatedData {
        fn event_type() -> &'static str {
            SCENE_REGISTRY_UPDATED
        }
    }

    /// Data for OVERRIDES_UPDATED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct OverridesUpdatedData {
        pub area_id: String,
    }

    impl EventData for OverridesUpdatedData {
        fn event_type() -> &'static str {
            OVERRIDES_UPDATED
        }
    }

    /// Data for SCENE_SELECTED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct SceneSelectedData {
        pub area_id: String,
        pub scene_id: SceneId,
        pub scene_label: String,
    }

    impl EventData for SceneSelectedData {
        fn event_type() -> &'static str {
            SCENE_SELECTED
        }
    }

    /// Data for SELECTION_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct SelectionChangedData {
        pub unique_id: String,
        pub area_id: String,
        pub old_state: Option<SelectState>,
        pub new_state: Option<SelectState>,
    }

    impl EventData for SelectionChangedData {
        fn event_type() -> &'static str {
            SELECTION_CHANGED
        }
    }
}
