//! Longer event sequences against the synchronous engine
//!
//! These scenarios step the [`DisplayEngine`] directly, feeding timer
//! expirations by hand, which keeps multi-stage sequences deterministic.

use integration_tests::{
    init_test_logging, nr_icon_config, nsa_connected_snapshot, plain_lte_snapshot,
};
use nricon_common::config::CarrierDisplayConfig;
use nricon_common::types::{
    DataRat, FrequencyRange, LinkStatus, NrState, OverrideType, PhysicalChannelConfig,
    ServiceSnapshot,
};
use nricon_engine::{DisplayEngine, DisplayState, EngineEvent, TimerKind};

fn expire(engine: &mut DisplayEngine, kind: TimerKind, generation: u64) {
    engine.handle_event(EngineEvent::TimerExpired { kind, generation });
}

/// The carrier-config walkthrough: 5G shown while EN-DC is in use, held for
/// 10 seconds after a drop to legacy, then released; a return to EN-DC
/// within the grace period keeps the icon throughout.
#[test]
fn test_grace_period_walkthrough() {
    init_test_logging();

    let mut engine = DisplayEngine::new(nr_icon_config("connected,legacy,10", ""));

    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    assert_eq!(engine.current_state(), DisplayState::NrConnected);
    assert_eq!(engine.override_type(), OverrideType::NrNsa);

    // Drop to a legacy-eligible configuration
    engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
    let requests = engine.take_timer_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].duration_secs, 10);
    assert_eq!(engine.override_type(), OverrideType::NrNsa);

    // Expiry: legacy has no configured icon
    expire(&mut engine, TimerKind::Primary, requests[0].generation);
    assert_eq!(engine.override_type(), OverrideType::None);
    assert!(!engine.any_timer_active());

    // Round two, but EN-DC returns before the grace period ends
    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    assert_eq!(engine.override_type(), OverrideType::NrNsa);
    engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
    let requests = engine.take_timer_requests();
    assert!(engine.any_timer_active());

    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    assert_eq!(engine.override_type(), OverrideType::NrNsa);
    assert!(!engine.any_timer_active());

    // The superseded expiry changes nothing
    expire(&mut engine, TimerKind::Primary, requests[0].generation);
    assert_eq!(engine.current_state(), DisplayState::NrConnected);
    assert_eq!(engine.override_type(), OverrideType::NrNsa);
}

/// A flapping EN-DC connection never lets the icon flicker: each drop arms
/// a timer, each return cancels it, and stale expirations are no-ops.
#[test]
fn test_flapping_connection_does_not_flicker() {
    init_test_logging();

    let mut engine = DisplayEngine::new(nr_icon_config("connected,any,10", ""));
    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));

    let mut stale = Vec::new();
    for _ in 0..5 {
        engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
        stale.extend(engine.take_timer_requests());
        assert_eq!(engine.override_type(), OverrideType::NrNsa);

        engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
        assert_eq!(engine.override_type(), OverrideType::NrNsa);
        assert!(!engine.any_timer_active());
    }

    for request in stale {
        expire(&mut engine, TimerKind::Primary, request.generation);
        assert_eq!(engine.override_type(), OverrideType::NrNsa);
        assert_eq!(engine.current_state(), DisplayState::NrConnected);
    }
}

/// 5G+ to 5G to legacy with both grace-period stages: the 5G+ icon is held
/// by the primary, then by the secondary, and only then released.
#[test]
fn test_two_stage_hold_across_three_states() {
    init_test_logging();

    let mut engine = DisplayEngine::new(nr_icon_config(
        "connected_mmwave,any,10",
        "connected_mmwave,any,30",
    ));

    engine.handle_event(EngineEvent::ServiceStateChanged(ServiceSnapshot {
        rat: DataRat::Lte,
        nr_state: NrState::Connected,
        nr_frequency_range: FrequencyRange::Mmwave,
        ..Default::default()
    }));
    assert_eq!(engine.current_state(), DisplayState::NrConnectedAdvanced);
    assert_eq!(engine.override_type(), OverrideType::NrAdvanced);

    // mmWave coverage ends; plain 5G facts arrive
    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    assert_eq!(engine.current_state(), DisplayState::NrConnected);
    assert_eq!(engine.override_type(), OverrideType::NrAdvanced);
    let primary = engine.take_timer_requests();
    assert_eq!(primary[0].kind, TimerKind::Primary);
    assert_eq!(primary[0].duration_secs, 10);

    // The primary expires while the device sits in plain 5G; the secondary
    // keyed by the post-primary state takes over
    expire(&mut engine, TimerKind::Primary, primary[0].generation);
    assert_eq!(engine.override_type(), OverrideType::NrAdvanced);
    let secondary = engine.take_timer_requests();
    assert_eq!(secondary[0].kind, TimerKind::Secondary);
    assert_eq!(secondary[0].duration_secs, 30);

    expire(&mut engine, TimerKind::Secondary, secondary[0].generation);
    assert_eq!(engine.override_type(), OverrideType::NrNsa);
    assert!(!engine.any_timer_active());
}

/// Facts keep moving while a grace period runs; the transition decision is
/// replayed once against the latest facts when the timer resolves.
#[test]
fn test_deferred_facts_replayed_once() {
    init_test_logging();

    let mut engine = DisplayEngine::new(nr_icon_config("connected,any,10", ""));
    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
    let primary = engine.take_timer_requests();

    // Churn during the grace period: EN-DC advertised, link comes up, a
    // channel list arrives
    engine.handle_event(EngineEvent::ServiceStateChanged(ServiceSnapshot {
        rat: DataRat::Lte,
        nr_state: NrState::NotRestricted,
        ..Default::default()
    }));
    engine.handle_event(EngineEvent::PhysicalChannelConfigsChanged(vec![
        PhysicalChannelConfig::new(DataRat::Lte, 7, 20_000),
    ]));
    assert_eq!(engine.facts().link_status, LinkStatus::Active);
    assert_eq!(engine.override_type(), OverrideType::NrNsa);
    assert!(engine.take_timer_requests().is_empty());

    expire(&mut engine, TimerKind::Primary, primary[0].generation);
    assert_eq!(engine.current_state(), DisplayState::LteConnected);
    assert!(!engine.any_timer_active());
    assert!(engine.take_timer_requests().is_empty());
}

/// Entering idle mode cancels grace periods and suppresses new ones until
/// the device wakes up again.
#[test]
fn test_idle_mode_round_trip() {
    init_test_logging();

    let mut engine = DisplayEngine::new(nr_icon_config("connected,any,10", ""));
    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
    assert!(engine.any_timer_active());

    engine.handle_event(EngineEvent::DeviceIdleModeChanged(true));
    assert!(!engine.any_timer_active());
    assert_eq!(engine.override_type(), OverrideType::None);

    // While idle, drops are immediate
    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    assert_eq!(engine.override_type(), OverrideType::NrNsa);
    engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
    assert_eq!(engine.override_type(), OverrideType::None);
    assert!(engine.take_timer_requests().is_empty());

    // After waking up the grace period applies again
    engine.handle_event(EngineEvent::DeviceIdleModeChanged(false));
    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
    assert!(engine.any_timer_active());
    assert_eq!(engine.override_type(), OverrideType::NrNsa);
}

/// A malformed carrier configuration degrades to immediate transitions
/// instead of failing.
#[test]
fn test_malformed_rules_degrade_to_immediate() {
    init_test_logging();

    let config = CarrierDisplayConfig {
        icon_configuration: "connected:5g,???:???".to_string(),
        primary_timers: "connected,legacy;;;not-a-triple,,".to_string(),
        secondary_timers: "garbage".to_string(),
        ..Default::default()
    };
    let mut engine = DisplayEngine::new(config);

    engine.handle_event(EngineEvent::ServiceStateChanged(nsa_connected_snapshot()));
    assert_eq!(engine.override_type(), OverrideType::NrNsa);

    engine.handle_event(EngineEvent::ServiceStateChanged(plain_lte_snapshot()));
    // No usable timer rules parsed: the drop is immediate
    assert_eq!(engine.override_type(), OverrideType::None);
    assert!(!engine.any_timer_active());
    assert!(engine.take_timer_requests().is_empty());
}
