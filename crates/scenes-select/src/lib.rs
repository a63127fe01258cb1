//! Selection surface for area scenes
//!
//! The only component visible to UI/automation consumers. One
//! [`AreaSceneSelect`] entity exists per area with scenes; the
//! [`AreaScenesController`] owns them, keeps them in sync with the
//! area-scene index, and routes bus events to the right entity. Consumers
//! read [`PublishedStates`] and write through [`AreaScenesController::select`].

mod controller;
mod entity;
mod published;

pub use controller::{AreaScenesController, ControllerEvents, SelectionSeed};
pub use entity::AreaSceneSelect;
pub use published::PublishedStates;

use std::sync::Arc;

use scenes_config::ConfigResolver;
use scenes_event_bus::EventBus;
use scenes_registry::AreaSceneIndex;
use scenes_state_machine::SceneActivator;

/// Wire up the selection surface and start its event loop
///
/// Builds entities for the current index contents, then spawns the loop that
/// reacts to registry changes and scene activations. The returned join
/// handle is the running loop; dropping it leaves the task running.
pub async fn setup(
    bus: Arc<EventBus>,
    index: Arc<AreaSceneIndex>,
    resolver: Arc<ConfigResolver>,
    activator: Arc<dyn SceneActivator>,
) -> (Arc<AreaScenesController>, tokio::task::JoinHandle<()>) {
    let controller = AreaScenesController::new(bus, index, resolver, activator);
    let events = controller.subscribe();
    controller.refresh().await;
    let handle = Arc::clone(&controller).spawn(events);
    (controller, handle)
}
