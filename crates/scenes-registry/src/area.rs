//! Areas and the read-only area source

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::RegistryError;

/// A named grouping of devices and scenes defined by the host platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    /// Host-assigned stable identifier
    pub id: String,

    /// Display name (e.g., "Living Room")
    pub name: String,
}

/// Read-only view of the host's area registry
pub trait AreaSource: Send + Sync {
    /// List all areas in registry order
    fn areas(&self) -> Result<Vec<Area>, RegistryError>;
}

/// In-memory area registry
///
/// Keeps insertion order so downstream consumers see a stable area ordering.
/// Change notifications are the host's job: after mutating, fire an
/// `area_registry_updated` event on the bus.
pub struct MemoryAreaRegistry {
    by_id: RwLock<IndexMap<String, Arc<Area>>>,
}

impl MemoryAreaRegistry {
    pub fn new() -> Self {
        Self {
            by_id: RwLock::new(IndexMap::new()),
        }
    }

    /// Create a new area with a generated id
    pub fn create(&self, name: impl Into<String>) -> Arc<Area> {
        let entry = Arc::new(Area {
            id: ulid::Ulid::new().to_string().to_lowercase(),
            name: name.into(),
        });
        info!(area_id = %entry.id, name = %entry.name, "Created area");
        self.by_id
            .write()
            .unwrap()
            .insert(entry.id.clone(), Arc::clone(&entry));
        entry
    }

    /// Insert an area with a caller-chosen id, replacing any existing entry
    pub fn insert(&self, area: Area) -> Arc<Area> {
        let entry = Arc::new(area);
        self.by_id
            .write()
            .unwrap()
            .insert(entry.id.clone(), Arc::clone(&entry));
        entry
    }

    /// Get an area by id
    pub fn get(&self, area_id: &str) -> Option<Arc<Area>> {
        self.by_id.read().unwrap().get(area_id).cloned()
    }

    /// Rename an area, returning the updated entry
    pub fn rename(&self, area_id: &str, name: impl Into<String>) -> Option<Arc<Area>> {
        let mut by_id = self.by_id.write().unwrap();
        let entry = by_id.get_mut(area_id)?;
        let updated = Arc::new(Area {
            id: entry.id.clone(),
            name: name.into(),
        });
        *entry = Arc::clone(&updated);
        Some(updated)
    }

    /// Remove an area, returning the removed entry
    pub fn remove(&self, area_id: &str) -> Option<Arc<Area>> {
        let removed = self.by_id.write().unwrap().shift_remove(area_id);
        if removed.is_some() {
            info!(area_id, "Removed area");
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

impl Default for MemoryAreaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaSource for MemoryAreaRegistry {
    fn areas(&self) -> Result<Vec<Area>, RegistryError> {
        Ok(self
            .by_id
            .read()
            .unwrap()
            .values()
            .map(|a| (**a).clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let registry = MemoryAreaRegistry::new();
        let area = registry.create("Living Room");

        let fetched = registry.get(&area.id).unwrap();
        assert_eq!(fetched.name, "Living Room");
    }

    #[test]
    fn test_areas_keep_insertion_order() {
        let registry = MemoryAreaRegistry::new();
        registry.create("Kitchen");
        registry.create("Bedroom");
        registry.create("Office");

        let names: Vec<_> = registry
            .areas()
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Kitchen", "Bedroom", "Office"]);
    }

    #[test]
    fn test_rename() {
        let registry = MemoryAreaRegistry::new();
        let area = registry.create("Liveing Room");

        registry.rename(&area.id, "Living Room").unwrap();
        assert_eq!(registry.get(&area.id).unwrap().name, "Living Room");
    }

    #[test]
    fn test_remove() {
        let registry = MemoryAreaRegistry::new();
        let area = registry.create("Garage");

        assert!(registry.remove(&area.id).is_some());
        assert!(registry.get(&area.id).is_none());
        assert!(registry.remove(&area.id).is_none());
    }
}
