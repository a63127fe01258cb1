//! End-to-end scenarios driving the selection surface through the bus

use std::sync::Arc;

use scenes_core::events::{SceneSelectedData, SelectionChangedData};
use scenes_core::{SceneId, OPTION_NONE};
use scenes_config::AreaOverrides;
use scenes_select::{setup, AreaScenesController, SelectionSeed};
use scenes_state_machine::SelectionError;
use scenes_testkit::{wait_until, TestHub};

async fn living_room_hub() -> (TestHub, Arc<AreaScenesController>) {
    let hub = TestHub::new();
    hub.add_area("living_room", "Living Room");
    hub.add_scene("relax", "Relax", "living_room");
    hub.add_scene("movie_time", "Movie Time", "living_room");

    let (controller, _handle) = setup(
        hub.bus.clone(),
        hub.index(),
        hub.resolver(),
        hub.activator.clone(),
    )
    .await;
    (hub, controller)
}

#[tokio::test]
async fn user_select_issues_command_and_updates_state() {
    let (hub, controller) = living_room_hub().await;

    controller.select("living_room", "Movie Time").await.unwrap();

    assert_eq!(
        hub.activator
            .calls()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect::<Vec<_>>(),
        vec!["movie_time"]
    );
    assert_eq!(
        controller.states().get_state("living_room").as_deref(),
        Some("Movie Time")
    );

    let entity = controller.entity("living_room").unwrap();
    assert_eq!(entity.options().await, vec!["Relax", "Movie Time"]);
}

#[tokio::test]
async fn external_activation_updates_selection() {
    let (hub, controller) = living_room_hub().await;

    hub.activate_scene("relax");

    assert!(
        wait_until(|| controller.states().get_state("living_room").as_deref() == Some("Relax"))
            .await
    );

    // The selection invariant holds after the transition
    let state = controller.states().get("living_room").unwrap();
    assert!(state.options.contains(&state.state));
}

#[tokio::test]
async fn repeated_external_activation_is_idempotent() {
    let (hub, controller) = living_room_hub().await;

    hub.activate_scene("relax");
    assert!(
        wait_until(|| controller.states().get_state("living_room").as_deref() == Some("Relax"))
            .await
    );
    let first = controller.states().get("living_room").unwrap();

    hub.activate_scene("relax");
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let second = controller.states().get("living_room").unwrap();
    assert_eq!(second.state, "Relax");
    assert_eq!(second.last_changed, first.last_changed);
}

#[tokio::test]
async fn reset_mode_clears_after_select_without_second_command() {
    let hub = TestHub::new();
    hub.add_area("living_room", "Living Room");
    hub.add_scene("relax", "Relax", "living_room");
    hub.add_scene("movie_time", "Movie Time", "living_room");
    hub.set_overrides(
        "living_room",
        AreaOverrides {
            reset_mode: Some(true),
            ..Default::default()
        },
    );

    let (controller, _handle) = setup(
        hub.bus.clone(),
        hub.index(),
        hub.resolver(),
        hub.activator.clone(),
    )
    .await;

    // Watch the published sequence: the chosen value must be observable
    // before the auto-reset clears it
    let mut changes = hub.bus.subscribe_typed::<SelectionChangedData>();

    controller.select("living_room", "Relax").await.unwrap();

    let selected = changes.recv().await.unwrap();
    assert_eq!(selected.data.new_state.unwrap().state, "Relax");
    let reset = changes.recv().await.unwrap();
    assert_eq!(reset.data.new_state.unwrap().state, OPTION_NONE);

    // Exactly one activation command; the reset issued none
    assert_eq!(hub.activator.call_count(), 1);

    let entity = controller.entity("living_room").unwrap();
    assert_eq!(
        entity.options().await,
        vec!["Relax", "Movie Time", OPTION_NONE]
    );
    assert_eq!(entity.current_option().await, OPTION_NONE);
}

#[tokio::test]
async fn reset_mode_ignores_echo_of_own_activation() {
    let hub = TestHub::new();
    hub.add_area("living_room", "Living Room");
    hub.add_scene("relax", "Relax", "living_room");
    hub.set_overrides(
        "living_room",
        AreaOverrides {
            reset_mode: Some(true),
            ..Default::default()
        },
    );
    // Host echoes every activation command back as an event
    hub.activator.enable_echo(hub.bus.clone());

    let (controller, _handle) = setup(
        hub.bus.clone(),
        hub.index(),
        hub.resolver(),
        hub.activator.clone(),
    )
    .await;

    controller.select("living_room", "Relax").await.unwrap();

    // The echo must not resurrect the selection after the reset
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(
        controller.states().get_state("living_room").as_deref(),
        Some(OPTION_NONE)
    );

    // A genuinely external activation still applies
    hub.activate_scene("relax");
    assert!(
        wait_until(|| controller.states().get_state("living_room").as_deref() == Some("Relax"))
            .await
    );
}

#[tokio::test]
async fn entity_created_when_area_gains_first_scene() {
    let hub = TestHub::new();
    hub.add_area("office", "Office");

    let (controller, _handle) = setup(
        hub.bus.clone(),
        hub.index(),
        hub.resolver(),
        hub.activator.clone(),
    )
    .await;

    // No scenes yet, no selectable state
    assert_eq!(controller.entity_count(), 0);
    assert!(controller.states().get("office").is_none());

    hub.add_scene("focus", "Focus", "office");

    assert!(wait_until(|| controller.entity_count() == 1).await);
    assert_eq!(
        controller.states().get_state("office").as_deref(),
        Some(OPTION_NONE)
    );
}

#[tokio::test]
async fn entity_removed_when_area_loses_last_scene() {
    let (hub, controller) = living_room_hub().await;
    assert_eq!(controller.entity_count(), 1);

    hub.remove_scene("relax");
    hub.remove_scene("movie_time");

    assert!(wait_until(|| controller.entity_count() == 0).await);
    assert!(controller.states().get("living_room").is_none());
}

#[tokio::test]
async fn unknown_selection_is_rejected() {
    let (hub, controller) = living_room_hub().await;

    hub.activate_scene("relax");
    assert!(
        wait_until(|| controller.states().get_state("living_room").as_deref() == Some("Relax"))
            .await
    );

    let err = controller
        .select("living_room", "Nonexistent")
        .await
        .unwrap_err();

    assert!(matches!(err, SelectionError::UnknownScene { .. }));
    assert_eq!(
        controller.states().get_state("living_room").as_deref(),
        Some("Relax")
    );
    assert!(hub.activator.calls().is_empty());
}

#[tokio::test]
async fn activation_failure_leaves_state_unchanged() {
    let (hub, controller) = living_room_hub().await;
    hub.activator.set_failing(true);

    let err = controller
        .select("living_room", "Movie Time")
        .await
        .unwrap_err();

    assert!(matches!(err, SelectionError::Activation(_)));
    assert_eq!(
        controller.states().get_state("living_room").as_deref(),
        Some(OPTION_NONE)
    );
}

#[tokio::test]
async fn removing_selected_scene_forces_none() {
    let (hub, controller) = living_room_hub().await;

    controller.select("living_room", "Movie Time").await.unwrap();
    assert_eq!(
        controller.states().get_state("living_room").as_deref(),
        Some("Movie Time")
    );

    // Reassigning the scene to another area removes it from this one
    hub.add_area("bedroom", "Bedroom");
    hub.assign_scene("movie_time", Some("bedroom"));

    assert!(
        wait_until(|| {
            controller.states().get_state("living_room").as_deref() == Some(OPTION_NONE)
        })
        .await
    );

    // The surviving scene list no longer offers the moved scene
    let entity = controller.entity("living_room").unwrap();
    assert_eq!(entity.options().await, vec!["Relax"]);
}

#[tokio::test]
async fn selection_fires_scene_selected_event() {
    let (hub, controller) = living_room_hub().await;
    let mut rx = hub.bus.subscribe_typed::<SceneSelectedData>();

    controller.select("living_room", "Relax").await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.data.area_id, "living_room");
    assert_eq!(event.data.scene_id.as_str(), "relax");
    assert_eq!(event.data.scene_label, "Relax");
}

#[tokio::test]
async fn reselecting_current_scene_is_a_noop() {
    let (hub, controller) = living_room_hub().await;

    controller.select("living_room", "Relax").await.unwrap();
    controller.select("living_room", "Relax").await.unwrap();

    // Only the first selection reached the activator
    assert_eq!(hub.activator.call_count(), 1);
}

#[tokio::test]
async fn unavailable_registry_keeps_entities_and_state() {
    let (hub, controller) = living_room_hub().await;
    controller.select("living_room", "Relax").await.unwrap();

    hub.set_registry_available(false);
    controller.refresh().await;

    assert_eq!(controller.entity_count(), 1);
    assert_eq!(
        controller.states().get_state("living_room").as_deref(),
        Some("Relax")
    );

    hub.set_registry_available(true);
    controller.refresh().await;
    assert_eq!(controller.entity_count(), 1);
}

#[tokio::test]
async fn override_update_republishes_presentation() {
    let (hub, controller) = living_room_hub().await;

    let state = controller.states().get("living_room").unwrap();
    assert_eq!(
        state.attribute::<String>("friendly_name").as_deref(),
        Some("Living Room Scenes")
    );

    hub.set_overrides(
        "living_room",
        AreaOverrides {
            name: Some("Cinema".to_string()),
            icon: Some("mdi:movie".to_string()),
            color: Some("#aa00ff".to_string()),
            reset_mode: Some(true),
        },
    );

    // No transition needed; the override event alone republishes
    assert!(
        wait_until(|| {
            controller
                .states()
                .get("living_room")
                .and_then(|s| s.attribute::<String>("friendly_name"))
                .as_deref()
                == Some("Cinema")
        })
        .await
    );

    let state = controller.states().get("living_room").unwrap();
    assert_eq!(state.attribute::<String>("icon").as_deref(), Some("mdi:movie"));
    assert_eq!(
        state.attribute::<String>("color").as_deref(),
        Some("#aa00ff")
    );
    // Enabling reset mode makes "None" selectable
    assert!(state.options.contains(&OPTION_NONE.to_string()));
}

struct HistorySeed;

impl SelectionSeed for HistorySeed {
    fn seed(&self, area_id: &str) -> Option<SceneId> {
        (area_id == "living_room").then(|| SceneId::new("relax").unwrap())
    }
}

#[tokio::test]
async fn seeded_controller_starts_at_last_active_scene() {
    let hub = TestHub::new();
    hub.add_area("living_room", "Living Room");
    hub.add_area("office", "Office");
    hub.add_scene("relax", "Relax", "living_room");
    hub.add_scene("focus", "Focus", "office");

    let controller = AreaScenesController::new_seeded(
        hub.bus.clone(),
        hub.index(),
        hub.resolver(),
        hub.activator.clone(),
        Arc::new(HistorySeed),
    );
    controller.refresh().await;

    assert_eq!(
        controller.states().get_state("living_room").as_deref(),
        Some("Relax")
    );
    // Areas without history still start blank
    assert_eq!(
        controller.states().get_state("office").as_deref(),
        Some(OPTION_NONE)
    );
}

#[tokio::test]
async fn area_rename_updates_display_name() {
    let (hub, controller) = living_room_hub().await;

    hub.rename_area("living_room", "Lounge");

    assert!(
        wait_until(|| {
            controller
                .states()
                .get("living_room")
                .and_then(|s| s.attribute::<String>("friendly_name"))
                .as_deref()
                == Some("Lounge Scenes")
        })
        .await
    );
}
