//! Area-scene membership index

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{Area, AreaSource, RegistryError, Scene, SceneSource};

/// One area together with its member scenes, in registry order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaScenes {
    pub area: Area,
    pub scenes: Vec<Scene>,
}

/// Mapping from area id to its member scenes; areas without scenes are absent
pub type IndexSnapshot = IndexMap<String, AreaScenes>;

/// Derives and holds the current area -> scenes mapping
///
/// `rebuild` queries both sources and swaps in a fully-built snapshot; on a
/// transient source failure the previous snapshot stays in place untouched,
/// so readers never observe a partial mapping.
pub struct AreaSceneIndex {
    areas: Arc<dyn AreaSource>,
    scenes: Arc<dyn SceneSource>,
    snapshot: RwLock<Arc<IndexSnapshot>>,
}

impl AreaSceneIndex {
    /// Create an index over the given sources; the initial snapshot is empty
    pub fn new(areas: Arc<dyn AreaSource>, scenes: Arc<dyn SceneSource>) -> Self {
        Self {
            areas,
            scenes,
            snapshot: RwLock::new(Arc::new(IndexSnapshot::new())),
        }
    }

    /// The last successfully built snapshot
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap())
    }

    /// Query the sources and swap in a fresh snapshot
    ///
    /// Areas with zero scenes are excluded; scenes whose area id does not
    /// resolve are skipped. If either source is unavailable the held
    /// snapshot is retained and the error returned.
    pub fn rebuild(&self) -> Result<Arc<IndexSnapshot>, RegistryError> {
        let areas = match self.areas.areas() {
            Ok(areas) => areas,
            Err(err) => {
                warn!(error = %err, "Area registry unavailable, keeping previous index");
                return Err(err);
            }
        };
        let scenes = match self.scenes.scenes() {
            Ok(scenes) => scenes,
            Err(err) => {
                warn!(error = %err, "Scene registry unavailable, keeping previous index");
                return Err(err);
            }
        };

        let mut grouped: IndexMap<String, Vec<Scene>> = IndexMap::new();
        for scene in scenes {
            let Some(area_id) = scene.area_id.clone() else {
                continue;
            };
            grouped.entry(area_id).or_default().push(scene);
        }

        let mut next = IndexSnapshot::new();
        for area in areas {
            let Some(scenes) = grouped.shift_remove(&area.id) else {
                debug!(area = %area.name, "No scenes in area, skipping");
                continue;
            };
            next.insert(area.id.clone(), AreaScenes { area, scenes });
        }
        for orphaned_area_id in grouped.keys() {
            debug!(area_id = %orphaned_area_id, "Scenes reference unknown area, skipping");
        }

        let next = Arc::new(next);
        *self.snapshot.write().unwrap() = Arc::clone(&next);
        debug!(areas = next.len(), "Rebuilt area-scene index");
        Ok(next)
    }
}
