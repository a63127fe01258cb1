//! The state machine proper

use indexmap::IndexSet;
use thiserror::Error;
use tracing::{debug, warn};

use scenes_core::{Context, SceneId, Selection};

use crate::{ActivationError, SceneActivator};

/// Errors surfaced to whoever requested a selection
#[derive(Debug, Clone, Error)]
pub enum SelectionError {
    /// The requested option names a scene that is not in the area
    #[error("'{option}' is not a scene in area '{area_id}'")]
    UnknownScene { area_id: String, option: String },

    /// The activation command failed; the selection was left unchanged
    #[error(transparent)]
    Activation(#[from] ActivationError),
}

/// Authoritative "active scene" value for one area
///
/// Invariant: `current` is always `Selection::None` or a member of the
/// area's current scene set. Every transition that could break that forces
/// the value back to `None`.
#[derive(Debug)]
pub struct AreaStateMachine {
    area_id: String,
    scene_ids: IndexSet<SceneId>,
    current: Selection,
}

impl AreaStateMachine {
    /// Create a machine for an area; the initial selection is `None`
    pub fn new(area_id: impl Into<String>, scene_ids: impl IntoIterator<Item = SceneId>) -> Self {
        Self {
            area_id: area_id.into(),
            scene_ids: scene_ids.into_iter().collect(),
            current: Selection::None,
        }
    }

    pub fn area_id(&self) -> &str {
        &self.area_id
    }

    pub fn current(&self) -> &Selection {
        &self.current
    }

    /// Whether the scene belongs to this area
    pub fn contains(&self, scene_id: &SceneId) -> bool {
        self.scene_ids.contains(scene_id)
    }

    /// Member scene ids in registry order
    pub fn scene_ids(&self) -> impl Iterator<Item = &SceneId> {
        self.scene_ids.iter()
    }

    /// ExternalActivation: any actor activated `scene_id`
    ///
    /// Foreign scenes are ignored. Returns whether the value changed;
    /// re-activating the already-current scene is a no-op.
    pub fn handle_activation(&mut self, scene_id: &SceneId) -> bool {
        if !self.scene_ids.contains(scene_id) {
            return false;
        }
        if self.current.scene_id() == Some(scene_id) {
            return false;
        }
        debug!(area_id = %self.area_id, scene_id = %scene_id, "Scene activated externally");
        self.current = Selection::Scene(scene_id.clone());
        true
    }

    /// UserSelect: request activation of `choice` and update the value
    ///
    /// `Selection::None` clears the value without issuing a command. A scene
    /// choice issues the activation command and only updates the value once
    /// the command succeeded; on any error the value is left untouched.
    /// Returns whether the value changed.
    pub async fn select(
        &mut self,
        choice: Selection,
        activator: &dyn SceneActivator,
        context: &Context,
    ) -> Result<bool, SelectionError> {
        match choice {
            Selection::None => {
                let changed = !self.current.is_none();
                self.current = Selection::None;
                Ok(changed)
            }
            Selection::Scene(scene_id) => {
                if !self.scene_ids.contains(&scene_id) {
                    warn!(
                        area_id = %self.area_id,
                        scene_id = %scene_id,
                        "Selected scene is not in this area"
                    );
                    return Err(SelectionError::UnknownScene {
                        area_id: self.area_id.clone(),
                        option: scene_id.to_string(),
                    });
                }

                activator.activate(&scene_id, context).await?;

                let changed = self.current.scene_id() != Some(&scene_id);
                self.current = Selection::Scene(scene_id);
                Ok(changed)
            }
        }
    }

    /// ResetModeFire: clear the value without issuing any command
    pub fn reset(&mut self) -> bool {
        let changed = !self.current.is_none();
        self.current = Selection::None;
        changed
    }

    /// SceneSetChanged: replace the member set
    ///
    /// If the current selection left the set, the value is forced to `None`.
    /// Returns whether the value was forced.
    pub fn apply_scene_set(&mut self, scene_ids: impl IntoIterator<Item = SceneId>) -> bool {
        self.scene_ids = scene_ids.into_iter().collect();

        match self.current.scene_id() {
            Some(id) if !self.scene_ids.contains(id) => {
                debug!(
                    area_id = %self.area_id,
                    scene_id = %id,
                    "Selected scene left the area, clearing selection"
                );
                self.current = Selection::None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeActivator {
        calls: Mutex<Vec<SceneId>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl SceneActivator for FakeActivator {
        async fn activate(
            &self,
            scene_id: &SceneId,
            _context: &Context,
        ) -> Result<(), ActivationError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ActivationError::ServiceError("boom".to_string()));
            }
            self.calls.lock().unwrap().push(scene_id.clone());
            Ok(())
        }
    }

    fn scene(id: &str) -> SceneId {
        SceneId::new(id).unwrap()
    }

    fn machine() -> AreaStateMachine {
        AreaStateMachine::new("living_room", [scene("relax"), scene("movie_time")])
    }

    #[test]
    fn test_initial_selection_is_none() {
        assert!(machine().current().is_none());
    }

    #[tokio::test]
    async fn test_select_issues_command_and_sets_value() {
        let mut sm = machine();
        let activator = FakeActivator::default();

        let changed = sm
            .select(Selection::Scene(scene("movie_time")), &activator, &Context::new())
            .await
            .unwrap();

        assert!(changed);
        assert_eq!(sm.current().scene_id(), Some(&scene("movie_time")));
        assert_eq!(*activator.calls.lock().unwrap(), vec![scene("movie_time")]);
    }

    #[tokio::test]
    async fn test_select_none_clears_without_command() {
        let mut sm = machine();
        let activator = FakeActivator::default();
        sm.handle_activation(&scene("relax"));

        let changed = sm
            .select(Selection::None, &activator, &Context::new())
            .await
            .unwrap();

        assert!(changed);
        assert!(sm.current().is_none());
        assert!(activator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_scene_rejected() {
        let mut sm = machine();
        let activator = FakeActivator::default();
        sm.handle_activation(&scene("relax"));

        let err = sm
            .select(Selection::Scene(scene("dinner")), &activator, &Context::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SelectionError::UnknownScene { .. }));
        // State untouched, no command issued
        assert_eq!(sm.current().scene_id(), Some(&scene("relax")));
        assert!(activator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activation_failure_leaves_value_unchanged() {
        let mut sm = machine();
        let activator = FakeActivator::default();
        sm.handle_activation(&scene("relax"));
        activator.fail.store(true, Ordering::SeqCst);

        let err = sm
            .select(Selection::Scene(scene("movie_time")), &activator, &Context::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SelectionError::Activation(_)));
        assert_eq!(sm.current().scene_id(), Some(&scene("relax")));
    }

    #[tokio::test]
    async fn test_reselecting_current_scene_reissues_command() {
        let mut sm = machine();
        let activator = FakeActivator::default();

        sm.select(Selection::Scene(scene("relax")), &activator, &Context::new())
            .await
            .unwrap();
        let changed = sm
            .select(Selection::Scene(scene("relax")), &activator, &Context::new())
            .await
            .unwrap();

        assert!(!changed);
        assert_eq!(activator.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_external_activation_is_idempotent() {
        let mut sm = machine();

        assert!(sm.handle_activation(&scene("relax")));
        assert!(!sm.handle_activation(&scene("relax")));
        assert_eq!(sm.current().scene_id(), Some(&scene("relax")));
    }

    #[test]
    fn test_external_activation_ignores_foreign_scene() {
        let mut sm = machine();

        assert!(!sm.handle_activation(&scene("dinner")));
        assert!(sm.current().is_none());
    }

    #[test]
    fn test_reset_clears_without_command() {
        let mut sm = machine();
        sm.handle_activation(&scene("relax"));

        assert!(sm.reset());
        assert!(sm.current().is_none());
        assert!(!sm.reset());
    }

    #[test]
    fn test_scene_set_change_forces_none_when_selection_removed() {
        let mut sm = machine();
        sm.handle_activation(&scene("movie_time"));

        let forced = sm.apply_scene_set([scene("relax")]);

        assert!(forced);
        assert!(sm.current().is_none());
    }

    #[test]
    fn test_scene_set_change_keeps_surviving_selection() {
        let mut sm = machine();
        sm.handle_activation(&scene("movie_time"));

        let forced = sm.apply_scene_set([scene("movie_time"), scene("dinner")]);

        assert!(!forced);
        assert_eq!(sm.current().scene_id(), Some(&scene("movie_time")));
    }
}
