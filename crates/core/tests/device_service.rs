//! Integration tests for the greenest-moment service

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use greenwindow_core::testing::{
    ManualClock, MemoryDeviceStore, RecordingCapabilities, ScriptedEnergyApi,
};
use greenwindow_core::{AlarmUpdate, CapabilitySink, GreenestMomentService};
use greenwindow_domain::constants::{STORE_GREENEST_MOMENT, STORE_ORGANIZATION_ID};
use greenwindow_domain::{Capability, CapabilityValue, GreenWindowError, GreenestMomentWindow};
use serde_json::json;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
}

struct Harness {
    api: Arc<ScriptedEnergyApi>,
    store: Arc<MemoryDeviceStore>,
    capabilities: Arc<RecordingCapabilities>,
    clock: Arc<ManualClock>,
    service: GreenestMomentService,
}

fn harness(window: GreenestMomentWindow, now: DateTime<Utc>) -> Harness {
    let api = Arc::new(ScriptedEnergyApi::new(window, 64));
    let store = Arc::new(MemoryDeviceStore::new());
    let capabilities = Arc::new(RecordingCapabilities::new());
    let clock = Arc::new(ManualClock::new(now, chrono_tz::Europe::Amsterdam));
    let service = GreenestMomentService::new(
        api.clone(),
        store.clone(),
        capabilities.clone(),
        clock.clone(),
    );
    Harness { api, store, capabilities, clock, service }
}

async fn with_organization(h: &Harness) {
    use greenwindow_core::DeviceStore;
    h.store.set(STORE_ORGANIZATION_ID, json!("org-1")).await.unwrap();
}

async fn with_stored_window(h: &Harness, window: &GreenestMomentWindow) {
    use greenwindow_core::DeviceStore;
    h.store.set(STORE_GREENEST_MOMENT, serde_json::to_value(window).unwrap()).await.unwrap();
}

#[tokio::test]
async fn alarm_publishes_only_on_edges() {
    let window = GreenestMomentWindow::new(at(10, 0), at(10, 10));
    let h = harness(window.clone(), at(9, 59));
    with_stored_window(&h, &window).await;

    let mut updates = Vec::new();
    for now in [at(9, 59), at(10, 0), at(10, 5), at(10, 11)] {
        h.clock.set(now);
        updates.push(h.service.update_alarm().await.unwrap());
    }

    assert_eq!(
        updates,
        vec![
            AlarmUpdate::Unchanged(false),
            AlarmUpdate::Changed { from: false, to: true },
            AlarmUpdate::Unchanged(true),
            AlarmUpdate::Changed { from: true, to: false },
        ]
    );
    assert_eq!(
        h.capabilities.events_for(Capability::AlarmGreenestMoment),
        vec![CapabilityValue::Bool(true), CapabilityValue::Bool(false)]
    );
}

#[tokio::test]
async fn alarm_skips_evaluation_without_window() {
    let h = harness(GreenestMomentWindow::new(at(10, 0), at(10, 10)), at(10, 5));

    assert_eq!(h.service.update_alarm().await.unwrap(), AlarmUpdate::NoWindow);
    assert!(h.capabilities.events().is_empty());
    assert!(!h.service.is_greenest_moment_now());
}

#[tokio::test]
async fn alarm_cycle_never_calls_remote_api() {
    let window = GreenestMomentWindow::new(at(10, 0), at(10, 10));
    let h = harness(window.clone(), at(10, 5));
    with_stored_window(&h, &window).await;

    for _ in 0..5 {
        h.service.run_alarm_cycle().await;
    }

    assert_eq!(h.api.window_calls(), 0);
    assert_eq!(h.api.percentage_calls(), 0);
    assert!(h.service.is_greenest_moment_now());
}

#[tokio::test]
async fn sync_cycle_persists_window_and_publishes_state() {
    let window = GreenestMomentWindow::new(at(12, 0), at(15, 0));
    let h = harness(window.clone(), at(9, 0));
    with_organization(&h).await;

    h.service.run_sync_cycle().await;

    let stored: GreenestMomentWindow =
        serde_json::from_value(h.store.snapshot(STORE_GREENEST_MOMENT).unwrap()).unwrap();
    assert_eq!(stored, window);
    assert_eq!(
        h.capabilities.value(Capability::GreenestMoment),
        Some(CapabilityValue::Text("14:00 - 17:00".into()))
    );
    assert_eq!(
        h.capabilities.events_for(Capability::MeasureGreenEnergy),
        vec![CapabilityValue::Number(64)]
    );
    // The slow cycle leaves the alarm to the fast cadence.
    assert!(h.capabilities.events_for(Capability::AlarmGreenestMoment).is_empty());
}

#[tokio::test]
async fn percentage_is_published_every_cycle() {
    let h = harness(GreenestMomentWindow::new(at(12, 0), at(15, 0)), at(9, 0));
    with_organization(&h).await;

    h.service.run_sync_cycle().await;
    h.service.run_sync_cycle().await;

    assert_eq!(
        h.capabilities.events_for(Capability::MeasureGreenEnergy),
        vec![CapabilityValue::Number(64), CapabilityValue::Number(64)]
    );
}

#[tokio::test]
async fn window_failure_does_not_block_percentage() {
    let h = harness(GreenestMomentWindow::new(at(12, 0), at(15, 0)), at(9, 0));
    with_organization(&h).await;
    h.api.set_window(Err(GreenWindowError::Transient("503 Service Unavailable".into())));

    h.service.run_sync_cycle().await;

    assert!(h.store.snapshot(STORE_GREENEST_MOMENT).is_none());
    assert!(h.capabilities.events_for(Capability::GreenestMoment).is_empty());
    assert_eq!(
        h.capabilities.events_for(Capability::MeasureGreenEnergy),
        vec![CapabilityValue::Number(64)]
    );
}

#[tokio::test]
async fn failed_sync_keeps_serving_stale_window() {
    let old = GreenestMomentWindow::new(at(10, 0), at(13, 0));
    let h = harness(old.clone(), at(9, 0));
    with_organization(&h).await;
    with_stored_window(&h, &old).await;
    h.api.set_window(Err(GreenWindowError::Api { status: 400, message: "bad date".into() }));

    let err = h.service.sync_greenest_moment().await.unwrap_err();
    assert!(matches!(err, GreenWindowError::Api { status: 400, .. }));

    assert_eq!(h.service.update_greenest_moment_display().await.unwrap().as_deref(), Some("12:00 - 15:00"));
}

#[tokio::test]
async fn missing_organization_id_is_data_error() {
    let h = harness(GreenestMomentWindow::new(at(12, 0), at(15, 0)), at(9, 0));

    let err = h.service.sync_green_energy_percentage().await.unwrap_err();

    assert!(matches!(err, GreenWindowError::Data(_)));
    assert_eq!(h.api.percentage_calls(), 0);
}

#[tokio::test]
async fn malformed_stored_window_is_data_error() {
    use greenwindow_core::DeviceStore;
    let h = harness(GreenestMomentWindow::new(at(12, 0), at(15, 0)), at(9, 0));
    h.store.set(STORE_GREENEST_MOMENT, json!({ "windowStart": 12 })).await.unwrap();

    assert!(matches!(h.service.update_alarm().await, Err(GreenWindowError::Data(_))));
}

#[tokio::test]
async fn initial_sync_evaluates_alarm_immediately() {
    let window = GreenestMomentWindow::new(at(10, 0), at(13, 0));
    let h = harness(window, at(11, 0));
    with_organization(&h).await;

    h.service.initial_sync().await;

    assert_eq!(
        h.capabilities.events_for(Capability::AlarmGreenestMoment),
        vec![CapabilityValue::Bool(true)]
    );
    assert!(h.service.is_greenest_moment_now());
    assert_eq!(h.api.window_calls(), 1);
    assert_eq!(h.api.percentage_calls(), 1);
}

#[tokio::test]
async fn store_failure_is_contained_to_its_step() {
    let h = harness(GreenestMomentWindow::new(at(12, 0), at(15, 0)), at(9, 0));
    with_organization(&h).await;
    h.store.fail_writes(true);

    h.service.run_sync_cycle().await;

    assert!(h.capabilities.events_for(Capability::GreenestMoment).is_empty());
    assert_eq!(h.capabilities.events_for(Capability::MeasureGreenEnergy).len(), 1);
}
