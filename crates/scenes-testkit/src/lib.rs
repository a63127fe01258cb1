//! Test harness for the area scenes engine
//!
//! Provides an isolated hub with in-memory registries, an override store,
//! and a recording scene activator, mirroring how the engine is embedded in
//! a real host but with every collaborator inspectable and fault-injectable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use scenes_core::events::{
    AreaRegistryUpdatedData, OverridesUpdatedData, RegistryChange, SceneActivatedData,
    SceneRegistryUpdatedData,
};
use scenes_core::{Context, SceneId};
use scenes_config::{AreaOverrides, ConfigResolver, MemoryOverrideStore};
use scenes_event_bus::EventBus;
use scenes_registry::{
    Area, AreaSceneIndex, AreaSource, MemoryAreaRegistry, MemorySceneRegistry, RegistryError,
    Scene, SceneSource,
};
use scenes_state_machine::{ActivationError, SceneActivator};

/// Scene activator that records every command
///
/// Can be told to fail, and can optionally echo each successful activation
/// back onto the bus as the host platform would.
#[derive(Default)]
pub struct RecordingActivator {
    calls: Mutex<Vec<SceneId>>,
    failing: AtomicBool,
    echo_bus: RwLock<Option<Arc<EventBus>>>,
}

impl RecordingActivator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo each successful activation as a `scene_activated` event
    pub fn enable_echo(&self, bus: Arc<EventBus>) {
        *self.echo_bus.write().unwrap() = Some(bus);
    }

    /// Make every subsequent activation fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All recorded activation commands, in order
    pub fn calls(&self) -> Vec<SceneId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl SceneActivator for RecordingActivator {
    async fn activate(&self, scene_id: &SceneId, context: &Context) -> Result<(), ActivationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ActivationError::ServiceError(
                "injected activation failure".to_string(),
            ));
        }

        self.calls.lock().unwrap().push(scene_id.clone());

        if let Some(bus) = self.echo_bus.read().unwrap().clone() {
            bus.fire_typed(
                SceneActivatedData {
                    scene_id: scene_id.clone(),
                    time: Utc::now(),
                },
                context.child(),
            );
        }

        Ok(())
    }
}

/// Area source wrapper with an availability switch
pub struct ToggleAreaSource {
    inner: Arc<MemoryAreaRegistry>,
    available: AtomicBool,
}

impl AreaSource for ToggleAreaSource {
    fn areas(&self) -> Result<Vec<Area>, RegistryError> {
        if self.available.load(Ordering::SeqCst) {
            self.inner.areas()
        } else {
            Err(RegistryError::Unavailable("area registry offline".into()))
        }
    }
}

/// Scene source wrapper with an availability switch
pub struct ToggleSceneSource {
    inner: Arc<MemorySceneRegistry>,
    available: AtomicBool,
}

impl SceneSource for ToggleSceneSource {
    fn scenes(&self) -> Result<Vec<Scene>, RegistryError> {
        if self.available.load(Ordering::SeqCst) {
            self.inner.scenes()
        } else {
            Err(RegistryError::Unavailable("scene registry offline".into()))
        }
    }
}

/// An isolated host platform for tests
///
/// Mutation helpers fire the matching registry event on the bus, the way a
/// real host would.
pub struct TestHub {
    pub bus: Arc<EventBus>,
    pub areas: Arc<MemoryAreaRegistry>,
    pub scenes: Arc<MemorySceneRegistry>,
    pub overrides: Arc<MemoryOverrideStore>,
    pub activator: Arc<RecordingActivator>,
    area_source: Arc<ToggleAreaSource>,
    scene_source: Arc<ToggleSceneSource>,
}

impl TestHub {
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let areas = Arc::new(MemoryAreaRegistry::new());
        let scenes = Arc::new(MemorySceneRegistry::new());

        Self {
            area_source: Arc::new(ToggleAreaSource {
                inner: Arc::clone(&areas),
                available: AtomicBool::new(true),
            }),
            scene_source: Arc::new(ToggleSceneSource {
                inner: Arc::clone(&scenes),
                available: AtomicBool::new(true),
            }),
            bus,
            areas,
            scenes,
            overrides: Arc::new(MemoryOverrideStore::new()),
            activator: Arc::new(RecordingActivator::new()),
        }
    }

    /// Build an index over this hub's (toggleable) sources
    pub fn index(&self) -> Arc<AreaSceneIndex> {
        Arc::new(AreaSceneIndex::new(
            Arc::clone(&self.area_source) as _,
            Arc::clone(&self.scene_source) as _,
        ))
    }

    /// Build a resolver over this hub's override store
    pub fn resolver(&self) -> Arc<ConfigResolver> {
        Arc::new(ConfigResolver::new(Arc::clone(&self.overrides) as _))
    }

    /// Flip both registry sources on or off
    pub fn set_registry_available(&self, available: bool) {
        self.area_source.available.store(available, Ordering::SeqCst);
        self.scene_source
            .available
            .store(available, Ordering::SeqCst);
    }

    /// Add an area with a fixed id and announce it
    pub fn add_area(&self, area_id: &str, name: &str) -> Arc<Area> {
        let area = self.areas.insert(Area {
            id: area_id.to_string(),
            name: name.to_string(),
        });
        self.fire_area_update(area_id, RegistryChange::Create);
        area
    }

    /// Rename an area and announce it
    pub fn rename_area(&self, area_id: &str, name: &str) {
        self.areas.rename(area_id, name).expect("unknown area");
        self.fire_area_update(area_id, RegistryChange::Update);
    }

    /// Remove an area and announce it
    pub fn remove_area(&self, area_id: &str) {
        self.areas.remove(area_id).expect("unknown area");
        self.fire_area_update(area_id, RegistryChange::Remove);
    }

    /// Add a scene to an area and announce it
    pub fn add_scene(&self, scene_id: &str, label: &str, area_id: &str) -> Arc<Scene> {
        let scene = self.scenes.insert(Scene {
            id: SceneId::new(scene_id).expect("invalid scene id"),
            label: label.to_string(),
            area_id: Some(area_id.to_string()),
        });
        self.fire_scene_update(&scene.id, RegistryChange::Create);
        scene
    }

    /// Move a scene to a different area (or unassign it) and announce it
    pub fn assign_scene(&self, scene_id: &str, area_id: Option<&str>) {
        let scene_id = SceneId::new(scene_id).expect("invalid scene id");
        self.scenes
            .assign_area(&scene_id, area_id.map(String::from))
            .expect("unknown scene");
        self.fire_scene_update(&scene_id, RegistryChange::Update);
    }

    /// Remove a scene and announce it
    pub fn remove_scene(&self, scene_id: &str) {
        let scene_id = SceneId::new(scene_id).expect("invalid scene id");
        self.scenes.remove(&scene_id).expect("unknown scene");
        self.fire_scene_update(&scene_id, RegistryChange::Remove);
    }

    /// Write per-area overrides and announce the change
    pub fn set_overrides(&self, area_id: &str, overrides: AreaOverrides) {
        self.overrides.set(area_id, overrides);
        self.bus.fire_typed(
            OverridesUpdatedData {
                area_id: area_id.to_string(),
            },
            Context::new(),
        );
    }

    /// Fire a scene activation as an external actor
    pub fn activate_scene(&self, scene_id: &str) {
        self.bus.fire_typed(
            SceneActivatedData {
                scene_id: SceneId::new(scene_id).expect("invalid scene id"),
                time: Utc::now(),
            },
            Context::new(),
        );
    }

    fn fire_area_update(&self, area_id: &str, change: RegistryChange) {
        self.bus.fire_typed(
            AreaRegistryUpdatedData {
                area_id: area_id.to_string(),
                change,
            },
            Context::new(),
        );
    }

    fn fire_scene_update(&self, scene_id: &SceneId, change: RegistryChange) {
        self.bus.fire_typed(
            SceneRegistryUpdatedData {
                scene_id: scene_id.clone(),
                change,
            },
            Context::new(),
        );
    }
}

impl Default for TestHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `check` until it returns true or ~1s elapses
///
/// Returns the final check result, so it can sit inside an `assert!`.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
