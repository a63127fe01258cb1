//! Outward-facing store of select entity states

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, instrument, trace};

use scenes_core::events::SelectionChangedData;
use scenes_core::{Context, SelectState};
use scenes_event_bus::EventBus;

/// Tracks the published state of every select entity
///
/// Writes fire a `selection_changed` event carrying the old and new
/// snapshots. `last_changed` is preserved across writes that keep the same
/// state value.
pub struct PublishedStates {
    /// States keyed by area id
    states: DashMap<String, SelectState>,
    bus: Arc<EventBus>,
}

impl PublishedStates {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            states: DashMap::new(),
            bus,
        }
    }

    /// Write an entity's state and fire `selection_changed`
    #[instrument(skip(self, state, options, attributes, context), fields(area_id = %area_id))]
    pub fn set(
        &self,
        area_id: &str,
        unique_id: &str,
        state: impl Into<String>,
        options: Vec<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> SelectState {
        let old_state = self.states.get(area_id).map(|s| s.clone());

        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, options, attributes, context.clone()),
            None => SelectState::new(unique_id, state, options, attributes, context.clone()),
        };

        debug!(
            area_id,
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Publishing select state"
        );

        self.states.insert(area_id.to_string(), new_state.clone());

        self.bus.fire_typed(
            SelectionChangedData {
                unique_id: unique_id.to_string(),
                area_id: area_id.to_string(),
                old_state,
                new_state: Some(new_state.clone()),
            },
            context,
        );

        new_state
    }

    /// Drop an entity's state and fire `selection_changed` with no new state
    #[instrument(skip(self, context), fields(area_id = %area_id))]
    pub fn remove(&self, area_id: &str, context: Context) -> Option<SelectState> {
        let old_state = self.states.remove(area_id).map(|(_, s)| s);

        if let Some(ref state) = old_state {
            trace!(area_id, "Removing published select state");
            self.bus.fire_typed(
                SelectionChangedData {
                    unique_id: state.unique_id.clone(),
                    area_id: area_id.to_string(),
                    old_state: Some(state.clone()),
                    new_state: None,
                },
                context,
            );
        }

        old_state
    }

    /// Get the published state for an area
    pub fn get(&self, area_id: &str) -> Option<SelectState> {
        self.states.get(area_id).map(|s| s.clone())
    }

    /// Get the current state value for an area
    pub fn get_state(&self, area_id: &str) -> Option<String> {
        self.states.get(area_id).map(|s| s.state.clone())
    }

    /// All published states
    pub fn all(&self) -> Vec<SelectState> {
        self.states.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
