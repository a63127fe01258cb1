//! One area's scene select entity

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use scenes_core::events::SceneSelectedData;
use scenes_core::{Context, SceneId, Selection, OPTION_NONE};
use scenes_event_bus::EventBus;
use scenes_config::ConfigResolver;
use scenes_registry::{Area, Scene};
use scenes_state_machine::{AreaStateMachine, SceneActivator, SelectionError};

use crate::PublishedStates;

/// State guarded by the entity's per-area mutex
///
/// Holding the lock across a whole transition (including the activation
/// await) is what serializes events per area.
struct SelectInner {
    machine: AreaStateMachine,
    scenes: Vec<Scene>,
    area_name: String,
    /// Context of the in-flight activation command, used to ignore the
    /// host's echo of our own selection
    pending_activation: Option<Context>,
}

impl SelectInner {
    fn scene_by_label(&self, label: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.label == label)
    }

    fn label_of(&self, scene_id: &SceneId) -> Option<&str> {
        self.scenes
            .iter()
            .find(|s| &s.id == scene_id)
            .map(|s| s.label.as_str())
    }
}

/// Selectable state entity for the scenes of one area
///
/// Exposes the current selection and the option labels, relays user
/// selections into the state machine, and republishes after every applied
/// transition. Display attributes are re-resolved from configuration on
/// each publish.
pub struct AreaSceneSelect {
    area_id: String,
    unique_id: String,
    inner: Mutex<SelectInner>,
    resolver: Arc<ConfigResolver>,
    activator: Arc<dyn SceneActivator>,
    bus: Arc<EventBus>,
    published: Arc<PublishedStates>,
}

impl AreaSceneSelect {
    pub fn new(
        area: Area,
        scenes: Vec<Scene>,
        resolver: Arc<ConfigResolver>,
        activator: Arc<dyn SceneActivator>,
        bus: Arc<EventBus>,
        published: Arc<PublishedStates>,
    ) -> Arc<Self> {
        let machine = AreaStateMachine::new(area.id.clone(), scenes.iter().map(|s| s.id.clone()));
        Arc::new(Self {
            unique_id: format!("area_scenes_{}", area.id),
            area_id: area.id,
            inner: Mutex::new(SelectInner {
                machine,
                scenes,
                area_name: area.name,
                pending_activation: None,
            }),
            resolver,
            activator,
            bus,
            published,
        })
    }

    pub fn area_id(&self) -> &str {
        &self.area_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Option labels a consumer may select; "None" only with reset mode on
    pub async fn options(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        self.options_locked(&inner)
    }

    /// The current selection's label, or "None"
    pub async fn current_option(&self) -> String {
        let inner = self.inner.lock().await;
        self.current_option_locked(&inner)
    }

    /// Whether the given scene currently belongs to this area
    pub async fn contains_scene(&self, scene_id: &SceneId) -> bool {
        self.inner.lock().await.machine.contains(scene_id)
    }

    /// UserSelect: activate the scene behind `option` and update the value
    ///
    /// Selecting "None" clears the value without a command. On success a
    /// `scene_selected` event is fired and the state republished; with reset
    /// mode on, the value is then cleared and republished once more, so the
    /// chosen value is observable before the reset.
    #[instrument(skip(self), fields(area_id = %self.area_id))]
    pub async fn select(&self, option: &str) -> Result<(), SelectionError> {
        let mut inner = self.inner.lock().await;
        let context = Context::new();

        if option == OPTION_NONE {
            inner
                .machine
                .select(Selection::None, self.activator.as_ref(), &context)
                .await?;
            self.publish_locked(&mut inner, context);
            return Ok(());
        }

        // Re-selecting the displayed scene is a no-op
        if self.current_option_locked(&inner) == option {
            return Ok(());
        }

        let Some(scene) = inner.scene_by_label(option).cloned() else {
            warn!(
                area_id = %self.area_id,
                option,
                "Could not find a scene with that label to activate"
            );
            return Err(SelectionError::UnknownScene {
                area_id: self.area_id.clone(),
                option: option.to_string(),
            });
        };

        let command_context = context.child();
        inner.pending_activation = Some(command_context.clone());

        let result = inner
            .machine
            .select(
                Selection::Scene(scene.id.clone()),
                self.activator.as_ref(),
                &command_context,
            )
            .await;

        if let Err(err) = result {
            inner.pending_activation = None;
            return Err(err);
        }

        info!(
            area_id = %self.area_id,
            scene_id = %scene.id,
            option,
            "Activating scene from select entity"
        );
        self.bus.fire_typed(
            SceneSelectedData {
                area_id: self.area_id.clone(),
                scene_id: scene.id.clone(),
                scene_label: scene.label.clone(),
            },
            context.clone(),
        );

        self.publish_locked(&mut inner, context.clone());

        let config = self.resolver.resolve(&self.area_id, &inner.area_name);
        if config.reset_mode {
            inner.machine.reset();
            self.publish_locked(&mut inner, context.child());
        }

        Ok(())
    }

    /// ExternalActivation delivered from the bus
    ///
    /// Echoes of this entity's own in-flight selection are ignored (the
    /// value is already set); anything else is applied and republished.
    /// Returns whether the value changed.
    pub async fn handle_activation(&self, scene_id: &SceneId, event_context: &Context) -> bool {
        let mut inner = self.inner.lock().await;

        if !inner.machine.contains(scene_id) {
            return false;
        }

        if let Some(pending) = inner.pending_activation.clone() {
            if pending.is_ancestor_of(event_context) {
                debug!(
                    area_id = %self.area_id,
                    scene_id = %scene_id,
                    "Ignoring echo of our own activation"
                );
                inner.pending_activation = None;
                return false;
            }
        }

        let changed = inner.machine.handle_activation(scene_id);
        if changed {
            debug!(
                area_id = %self.area_id,
                scene_id = %scene_id,
                "Scene activated in area, updating select"
            );
            self.publish_locked(&mut inner, event_context.clone());
        }
        changed
    }

    /// SceneSetChanged: adopt the area's current name and scene membership
    pub async fn apply_area_scenes(&self, area: &Area, scenes: Vec<Scene>) {
        let mut inner = self.inner.lock().await;
        inner.area_name = area.name.clone();
        inner.scenes = scenes;
        let scene_ids: Vec<SceneId> = inner.scenes.iter().map(|s| s.id.clone()).collect();
        let forced = inner.machine.apply_scene_set(scene_ids);
        if forced {
            debug!(area_id = %self.area_id, "Selection cleared by scene set change");
        }
        self.publish_locked(&mut inner, Context::new());
    }

    /// Publish the entity's initial (or current) state
    pub async fn publish(&self) {
        let mut inner = self.inner.lock().await;
        self.publish_locked(&mut inner, Context::new());
    }

    fn options_locked(&self, inner: &SelectInner) -> Vec<String> {
        let config = self.resolver.resolve(&self.area_id, &inner.area_name);
        let mut options: Vec<String> = inner.scenes.iter().map(|s| s.label.clone()).collect();
        if config.reset_mode {
            options.push(OPTION_NONE.to_string());
        }
        options
    }

    fn current_option_locked(&self, inner: &SelectInner) -> String {
        match inner.machine.current() {
            Selection::None => OPTION_NONE.to_string(),
            Selection::Scene(id) => inner
                .label_of(id)
                .map(String::from)
                .unwrap_or_else(|| id.to_string()),
        }
    }

    fn publish_locked(&self, inner: &mut SelectInner, context: Context) {
        let config = self.resolver.resolve(&self.area_id, &inner.area_name);

        let mut attributes = HashMap::new();
        attributes.insert("friendly_name".to_string(), json!(config.display_name));
        attributes.insert("icon".to_string(), json!(config.icon));
        attributes.insert("area_id".to_string(), json!(self.area_id));
        attributes.insert("color".to_string(), json!(config.color));
        attributes.insert("reset_mode".to_string(), json!(config.reset_mode));
        attributes.insert(
            "scenes".to_string(),
            json!(inner
                .scenes
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()),
        );

        self.published.set(
            &self.area_id,
            &self.unique_id,
            self.current_option_locked(inner),
            self.options_locked(inner),
            attributes,
            context,
        );
    }
}
