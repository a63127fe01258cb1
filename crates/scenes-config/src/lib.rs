//! Per-area configuration overrides
//!
//! The configuration surface (UI options flow) writes per-area override
//! records; this crate holds them behind the [`OverrideStore`] trait and
//! resolves presentation attributes with layered defaults. Overrides may
//! change at any time, so resolution happens on every read.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default icon for an area's scene select entity
pub const DEFAULT_ICON: &str = "mdi:palette-outline";

/// Optional per-area overrides written by the configuration surface
///
/// Absent fields (and an absent record) mean "use platform defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaOverrides {
    /// Custom display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Custom icon (e.g., "mdi:sofa")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Custom color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Auto-revert the selection to "None" after each activation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_mode: Option<bool>,
}

/// Key-value store of per-area overrides, swappable for tests
pub trait OverrideStore: Send + Sync {
    /// Get the override record for an area, if one exists
    fn get(&self, area_id: &str) -> Option<AreaOverrides>;
}

/// In-memory override store
pub struct MemoryOverrideStore {
    by_area: DashMap<String, AreaOverrides>,
}

impl MemoryOverrideStore {
    pub fn new() -> Self {
        Self {
            by_area: DashMap::new(),
        }
    }

    /// Create or replace the override record for an area
    pub fn set(&self, area_id: impl Into<String>, overrides: AreaOverrides) {
        let area_id = area_id.into();
        debug!(area_id = %area_id, "Updated area overrides");
        self.by_area.insert(area_id, overrides);
    }

    /// Remove the override record for an area
    pub fn clear(&self, area_id: &str) -> Option<AreaOverrides> {
        self.by_area.remove(area_id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.by_area.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_area.is_empty()
    }
}

impl Default for MemoryOverrideStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn get(&self, area_id: &str) -> Option<AreaOverrides> {
        self.by_area.get(area_id).map(|r| r.value().clone())
    }
}

/// Fully resolved presentation attributes for one area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAreaConfig {
    pub display_name: String,
    pub icon: String,
    pub color: Option<String>,
    pub reset_mode: bool,
}

/// Resolves per-area attributes with layered defaults
///
/// Explicit override field > platform default derived from the area's own
/// name > system default (reset_mode = false). No caching: the store is
/// consulted on every call.
pub struct ConfigResolver {
    store: Arc<dyn OverrideStore>,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self { store }
    }

    /// Resolve the attributes for an area given its registry display name
    pub fn resolve(&self, area_id: &str, area_name: &str) -> ResolvedAreaConfig {
        let overrides = self.store.get(area_id).unwrap_or_default();

        ResolvedAreaConfig {
            display_name: overrides
                .name
                .unwrap_or_else(|| format!("{} Scenes", area_name)),
            icon: overrides.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            color: overrides.color,
            reset_mode: overrides.reset_mode.unwrap_or(false),
        }
    }
}
