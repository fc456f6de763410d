//! End-to-end hysteresis tests
//!
//! These tests drive the async display task through its public handle with
//! sub-second grace periods and observe the override type the rendering
//! side would see.

use std::time::Duration;

use integration_tests::{
    init_test_logging, nr_icon_config, nsa_connected_snapshot, plain_lte_snapshot,
    wait_for_condition,
};
use integration_tests::test_utils::{DEFAULT_POLL_INTERVAL, DEFAULT_TEST_TIMEOUT};
use nricon_common::config::CarrierDisplayConfig;
use nricon_common::types::{DataRat, OverrideType, ServiceSnapshot};
use nricon_engine::spawn_display_task;

#[tokio::test]
async fn test_nsa_attach_shows_5g() {
    init_test_logging();

    let (handle, join) = spawn_display_task(nr_icon_config("", ""));
    assert_eq!(handle.current_override(), OverrideType::None);

    handle
        .service_state_changed(nsa_connected_snapshot())
        .await
        .unwrap();

    let mut watch = handle.override_watch();
    watch.changed().await.unwrap();
    assert_eq!(*watch.borrow(), OverrideType::NrNsa);
    assert!(!handle.any_timer_active());

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_grace_period_holds_then_releases() {
    init_test_logging();

    let (handle, join) = spawn_display_task(nr_icon_config("connected,any,1", ""));
    let mut watch = handle.override_watch();

    handle
        .service_state_changed(nsa_connected_snapshot())
        .await
        .unwrap();
    watch.changed().await.unwrap();
    assert_eq!(*watch.borrow(), OverrideType::NrNsa);

    // EN-DC drops; the 5G icon must survive the grace period
    handle
        .service_state_changed(plain_lte_snapshot())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.current_override(), OverrideType::NrNsa);
    assert!(handle.any_timer_active());

    // ... and release once the primary timer fires
    watch.changed().await.unwrap();
    assert_eq!(*watch.borrow(), OverrideType::None);
    assert!(!handle.any_timer_active());

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_revert_before_expiry_keeps_icon_without_flicker() {
    init_test_logging();

    let (handle, join) = spawn_display_task(nr_icon_config("connected,any,1", ""));
    handle
        .service_state_changed(nsa_connected_snapshot())
        .await
        .unwrap();
    wait_for_condition(
        || async { handle.current_override() == OverrideType::NrNsa },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();

    handle
        .service_state_changed(plain_lte_snapshot())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(handle.any_timer_active());

    // EN-DC comes back before the grace period ends
    handle
        .service_state_changed(nsa_connected_snapshot())
        .await
        .unwrap();
    wait_for_condition(
        || async { !handle.any_timer_active() },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();

    // Outlive the superseded expiry: the icon must never have flickered
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(handle.current_override(), OverrideType::NrNsa);
    assert!(!handle.any_timer_active());

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_secondary_grace_period_extends_the_hold() {
    init_test_logging();

    let (handle, join) =
        spawn_display_task(nr_icon_config("connected,any,1", "connected,any,1"));
    handle
        .service_state_changed(nsa_connected_snapshot())
        .await
        .unwrap();
    wait_for_condition(
        || async { handle.current_override() == OverrideType::NrNsa },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();

    handle
        .service_state_changed(plain_lte_snapshot())
        .await
        .unwrap();

    // After the primary expires the secondary still holds the icon
    tokio::time::sleep(Duration::from_millis(1400)).await;
    assert_eq!(handle.current_override(), OverrideType::NrNsa);
    assert!(handle.any_timer_active());

    wait_for_condition(
        || async { handle.current_override() == OverrideType::None },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();
    assert!(!handle.any_timer_active());

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_radio_off_mid_grace_period() {
    init_test_logging();

    let (handle, join) = spawn_display_task(nr_icon_config("connected,any,30", ""));
    handle
        .service_state_changed(nsa_connected_snapshot())
        .await
        .unwrap();
    handle
        .service_state_changed(plain_lte_snapshot())
        .await
        .unwrap();
    wait_for_condition(
        || async { handle.any_timer_active() },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();

    handle.radio_off_or_unavailable().await.unwrap();
    wait_for_condition(
        || async { !handle.any_timer_active() },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();
    assert_eq!(handle.current_override(), OverrideType::None);

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_lte_plus_and_operator_pattern() {
    init_test_logging();

    let config = CarrierDisplayConfig {
        lte_plus_threshold_bandwidth_khz: 10_000,
        ..Default::default()
    };
    let (handle, join) = spawn_display_task(config);

    let snapshot = ServiceSnapshot {
        rat: DataRat::LteCa,
        cell_bandwidths_khz: vec![12_000],
        operator_alpha_long: "Acme Mobile".to_string(),
        ..Default::default()
    };
    handle.service_state_changed(snapshot.clone()).await.unwrap();
    wait_for_condition(
        || async { handle.current_override() == OverrideType::LteCa },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();

    // The operator-pattern upgrade takes effect with the new carrier config
    let upgraded = CarrierDisplayConfig {
        lte_plus_threshold_bandwidth_khz: 10_000,
        lte_enhanced_pattern: "Acme".to_string(),
        ..Default::default()
    };
    handle.carrier_config_changed(upgraded).await.unwrap();
    handle.service_state_changed(snapshot).await.unwrap();
    wait_for_condition(
        || async { handle.current_override() == OverrideType::LteAdvancedPro },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap();

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}
