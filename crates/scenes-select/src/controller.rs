//! Controller owning one select entity per eligible area

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use scenes_core::events::{
    AreaRegistryUpdatedData, OverridesUpdatedData, SceneActivatedData, SceneRegistryUpdatedData,
};
use scenes_core::{Context, SceneId};
use scenes_config::ConfigResolver;
use scenes_event_bus::{EventBus, TypedEventReceiver};
use scenes_registry::{AreaSceneIndex, IndexSnapshot};
use scenes_state_machine::{SceneActivator, SelectionError};

use crate::{AreaSceneSelect, PublishedStates};

/// The bus subscriptions feeding the controller's event loop
pub struct ControllerEvents {
    activations: TypedEventReceiver<SceneActivatedData>,
    area_updates: TypedEventReceiver<AreaRegistryUpdatedData>,
    scene_updates: TypedEventReceiver<SceneRegistryUpdatedData>,
    override_updates: TypedEventReceiver<OverridesUpdatedData>,
}

/// Reports the scene last known active in an area
///
/// Hosts that track activation history can implement this to seed a freshly
/// created entity's selection; without one, entities start at "None".
pub trait SelectionSeed: Send + Sync {
    fn seed(&self, area_id: &str) -> Option<SceneId>;
}

/// Owns the select entities and drives them from bus events
///
/// Entities are created when an area first has scenes and removed when it
/// loses its last one. Registry-change events trigger an index rebuild and
/// reconciliation; activation events are routed to the owning entity.
pub struct AreaScenesController {
    bus: Arc<EventBus>,
    index: Arc<AreaSceneIndex>,
    resolver: Arc<ConfigResolver>,
    activator: Arc<dyn SceneActivator>,
    published: Arc<PublishedStates>,
    entities: DashMap<String, Arc<AreaSceneSelect>>,
    seed: Option<Arc<dyn SelectionSeed>>,
}

impl AreaScenesController {
    pub fn new(
        bus: Arc<EventBus>,
        index: Arc<AreaSceneIndex>,
        resolver: Arc<ConfigResolver>,
        activator: Arc<dyn SceneActivator>,
    ) -> Arc<Self> {
        Self::build(bus, index, resolver, activator, None)
    }

    /// Like [`new`](Self::new), seeding new entities from activation history
    pub fn new_seeded(
        bus: Arc<EventBus>,
        index: Arc<AreaSceneIndex>,
        resolver: Arc<ConfigResolver>,
        activator: Arc<dyn SceneActivator>,
        seed: Arc<dyn SelectionSeed>,
    ) -> Arc<Self> {
        Self::build(bus, index, resolver, activator, Some(seed))
    }

    fn build(
        bus: Arc<EventBus>,
        index: Arc<AreaSceneIndex>,
        resolver: Arc<ConfigResolver>,
        activator: Arc<dyn SceneActivator>,
        seed: Option<Arc<dyn SelectionSeed>>,
    ) -> Arc<Self> {
        let published = Arc::new(PublishedStates::new(Arc::clone(&bus)));
        Arc::new(Self {
            bus,
            index,
            resolver,
            activator,
            published,
            entities: DashMap::new(),
            seed,
        })
    }

    /// The outward-facing state store
    pub fn states(&self) -> &Arc<PublishedStates> {
        &self.published
    }

    /// Get the select entity for an area
    pub fn entity(&self, area_id: &str) -> Option<Arc<AreaSceneSelect>> {
        self.entities.get(area_id).map(|e| Arc::clone(e.value()))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Forward a user selection to the area's entity
    pub async fn select(&self, area_id: &str, option: &str) -> Result<(), SelectionError> {
        let Some(entity) = self.entity(area_id) else {
            warn!(area_id, option, "No scene select entity for area");
            return Err(SelectionError::UnknownScene {
                area_id: area_id.to_string(),
                option: option.to_string(),
            });
        };
        entity.select(option).await
    }

    /// Rebuild the index and reconcile entities against the new snapshot
    ///
    /// A transiently unavailable registry keeps the previous snapshot and
    /// entities untouched.
    pub async fn refresh(&self) {
        match self.index.rebuild() {
            Ok(snapshot) => self.reconcile(&snapshot).await,
            Err(err) => warn!(error = %err, "Registry refresh failed, entities left as-is"),
        }
    }

    async fn reconcile(&self, snapshot: &IndexSnapshot) {
        let stale: Vec<String> = self
            .entities
            .iter()
            .filter(|e| !snapshot.contains_key(e.key()))
            .map(|e| e.key().clone())
            .collect();
        for area_id in stale {
            self.entities.remove(&area_id);
            self.published.remove(&area_id, Context::new());
            info!(area_id, "Area has no scenes left, removed select entity");
        }

        for (area_id, area_scenes) in snapshot.iter() {
            if let Some(entity) = self.entity(area_id) {
                entity
                    .apply_area_scenes(&area_scenes.area, area_scenes.scenes.clone())
                    .await;
            } else {
                let entity = AreaSceneSelect::new(
                    area_scenes.area.clone(),
                    area_scenes.scenes.clone(),
                    Arc::clone(&self.resolver),
                    Arc::clone(&self.activator),
                    Arc::clone(&self.bus),
                    Arc::clone(&self.published),
                );
                let seeded = match self.seed.as_ref().and_then(|s| s.seed(area_id)) {
                    Some(scene_id) => entity.handle_activation(&scene_id, &Context::new()).await,
                    None => false,
                };
                if !seeded {
                    entity.publish().await;
                }
                info!(
                    area_id,
                    scenes = area_scenes.scenes.len(),
                    "Created scene select entity for area"
                );
                self.entities.insert(area_id.clone(), entity);
            }
        }
    }

    async fn dispatch_activation(&self, scene_id: &SceneId, context: &Context) {
        let snapshot = self.index.snapshot();
        let owner = snapshot
            .iter()
            .find(|(_, a)| a.scenes.iter().any(|s| &s.id == scene_id));

        if let Some((area_id, _)) = owner {
            if let Some(entity) = self.entity(area_id) {
                entity.handle_activation(scene_id, context).await;
            }
        }
    }

    /// Subscribe to the bus events the run loop consumes
    ///
    /// Subscribing is separate from running so no event fired between setup
    /// and the first poll of the spawned task can be missed.
    pub fn subscribe(&self) -> ControllerEvents {
        ControllerEvents {
            activations: self.bus.subscribe_typed::<SceneActivatedData>(),
            area_updates: self.bus.subscribe_typed::<AreaRegistryUpdatedData>(),
            scene_updates: self.bus.subscribe_typed::<SceneRegistryUpdatedData>(),
            override_updates: self.bus.subscribe_typed::<OverridesUpdatedData>(),
        }
    }

    /// Spawn the event loop on the current runtime
    pub fn spawn(self: Arc<Self>, events: ControllerEvents) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(events).await })
    }

    /// Consume bus events until every sender is gone
    ///
    /// Events are handled one at a time, so for any single area a transition
    /// fully applies before the next event is looked at.
    pub async fn run(&self, events: ControllerEvents) {
        let ControllerEvents {
            mut activations,
            mut area_updates,
            mut scene_updates,
            mut override_updates,
        } = events;

        loop {
            tokio::select! {
                event = activations.recv() => match event {
                    Ok(event) => self.dispatch_activation(&event.data.scene_id, &event.context).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Dropped scene activation events");
                    }
                    Err(RecvError::Closed) => break,
                },
                event = area_updates.recv() => match event {
                    Ok(_) => self.refresh().await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Dropped area registry events, refreshing");
                        self.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                },
                event = scene_updates.recv() => match event {
                    Ok(_) => self.refresh().await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Dropped scene registry events, refreshing");
                        self.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                },
                event = override_updates.recv() => match event {
                    Ok(event) => {
                        // Republish with freshly resolved display attributes
                        if let Some(entity) = self.entity(&event.data.area_id) {
                            entity.publish().await;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Dropped override update events, refreshing");
                        self.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }
}
