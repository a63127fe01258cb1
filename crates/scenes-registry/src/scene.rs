//! Scenes and the read-only scene source

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use scenes_core::SceneId;

use crate::RegistryError;

/// A host-defined set of device-state changes invocable as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Stable identifier
    pub id: SceneId,

    /// Display label (e.g., "Movie Time")
    pub label: String,

    /// Owning area, if assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
}

/// Read-only view of the host's scene registry
pub trait SceneSource: Send + Sync {
    /// List all scenes in registry order
    fn scenes(&self) -> Result<Vec<Scene>, RegistryError>;
}

/// In-memory scene registry
///
/// Keeps insertion order so per-area option lists are stable. Change
/// notifications are the host's job: after mutating, fire a
/// `scene_registry_updated` event on the bus.
pub struct MemorySceneRegistry {
    by_id: RwLock<IndexMap<SceneId, Arc<Scene>>>,
}

impl MemorySceneRegistry {
    pub fn new() -> Self {
        Self {
            by_id: RwLock::new(IndexMap::new()),
        }
    }

    /// Insert a scene, replacing any existing entry with the same id
    pub fn insert(&self, scene: Scene) -> Arc<Scene> {
        let entry = Arc::new(scene);
        info!(scene_id = %entry.id, label = %entry.label, "Registered scene");
        self.by_id
            .write()
            .unwrap()
            .insert(entry.id.clone(), Arc::clone(&entry));
        entry
    }

    /// Get a scene by id
    pub fn get(&self, scene_id: &SceneId) -> Option<Arc<Scene>> {
        self.by_id.read().unwrap().get(scene_id).cloned()
    }

    /// Move a scene to a different area (or unassign it)
    pub fn assign_area(&self, scene_id: &SceneId, area_id: Option<String>) -> Option<Arc<Scene>> {
        self.update(scene_id, |s| s.area_id = area_id)
    }

    /// Change a scene's display label
    pub fn relabel(&self, scene_id: &SceneId, label: impl Into<String>) -> Option<Arc<Scene>> {
        let label = label.into();
        self.update(scene_id, move |s| s.label = label)
    }

    fn update<F>(&self, scene_id: &SceneId, f: F) -> Option<Arc<Scene>>
    where
        F: FnOnce(&mut Scene),
    {
        let mut by_id = self.by_id.write().unwrap();
        let entry = by_id.get_mut(scene_id)?;
        let mut scene = (**entry).clone();
        f(&mut scene);
        let updated = Arc::new(scene);
        *entry = Arc::clone(&updated);
        Some(updated)
    }

    /// Remove a scene, returning the removed entry
    pub fn remove(&self, scene_id: &SceneId) -> Option<Arc<Scene>> {
        let removed = self.by_id.write().unwrap().shift_remove(scene_id);
        if removed.is_some() {
            info!(scene_id = %scene_id, "Removed scene");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.by_id.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.read().unwrap().is_empty()
    }
}

impl Default for MemorySceneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneSource for MemorySceneRegistry {
    fn scenes(&self) -> Result<Vec<Scene>, RegistryError> {
        Ok(self
            .by_id
            .read()
            .unwrap()
            .values()
            .map(|s| (**s).clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: &str, label: &str, area_id: Option<&str>) -> Scene {
        Scene {
            id: SceneId::new(id).unwrap(),
            label: label.to_string(),
            area_id: area_id.map(String::from),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let registry = MemorySceneRegistry::new();
        registry.insert(scene("relax", "Relax", Some("living_room")));

        let fetched = registry.get(&SceneId::new("relax").unwrap()).unwrap();
        assert_eq!(fetched.label, "Relax");
        assert_eq!(fetched.area_id.as_deref(), Some("living_room"));
    }

    #[test]
    fn test_scenes_keep_insertion_order() {
        let registry = MemorySceneRegistry::new();
        registry.insert(scene("relax", "Relax", Some("a")));
        registry.insert(scene("movie_time", "Movie Time", Some("a")));
        registry.insert(scene("dinner", "Dinner", Some("b")));

        let labels: Vec<_> = registry
            .scenes()
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["Relax", "Movie Time", "Dinner"]);
    }

    #[test]
    fn test_assign_area() {
        let registry = MemorySceneRegistry::new();
        let id = SceneId::new("relax").unwrap();
        registry.insert(scene("relax", "Relax", Some("living_room")));

        registry.assign_area(&id, Some("bedroom".to_string()));
        assert_eq!(registry.get(&id).unwrap().area_id.as_deref(), Some("bedroom"));

        registry.assign_area(&id, None);
        assert_eq!(registry.get(&id).unwrap().area_id, None);
    }

    #[test]
    fn test_remove() {
        let registry = MemorySceneRegistry::new();
        let id = SceneId::new("relax").unwrap();
        registry.insert(scene("relax", "Relax", None));

        assert!(registry.remove(&id).is_some());
        assert!(registry.get(&id).is_none());
    }
}
