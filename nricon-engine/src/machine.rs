//! Hysteresis state machine
//!
//! [`DisplayEngine`] owns the current/previous display-state bookkeeping,
//! drives transitions from the [decision function](crate::decision::decide),
//! and arms the primary and secondary grace-period timers that keep the
//! previous icon visible across short-lived state changes.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Legacy` | No EN-DC (or NR restricted, tracked by a flag), or a non-LTE/NR technology |
//! | `Idle` | EN-DC available, physical link dormant |
//! | `LteConnected` | EN-DC available, physical link active |
//! | `NrConnected` | NR in use as a primary or secondary cell |
//! | `NrConnectedAdvanced` | NR in use on mmWave or carrier-designated bands |
//!
//! # Event processing
//!
//! Events are handled strictly one at a time. Control signals (radio off,
//! carrier config change, preferred-mode change, device idle) cancel all
//! timers and recompute directly. Service-fact events re-evaluate with
//! hysteresis: when the freshly computed state differs from the current one
//! and the departed state's rule carries a primary grace period, the old
//! icon stays visible while the internal state already moves on. While any
//! timer is outstanding, fact events only refresh the cache and queue a
//! deferred snapshot; the transition decision is replayed once the timer
//! resolves.

use std::collections::VecDeque;
use std::fmt;

use regex::Regex;
use tracing::{debug, info, warn};

use nricon_common::config::CarrierDisplayConfig;
use nricon_common::types::{
    LinkStatus, OverrideType, PhysicalChannelConfig, ServiceSnapshot,
};

use crate::decision::{decide, Decision};
use crate::facts::ServiceFacts;
use crate::rules::{RuleTable, StateKey};
use crate::timer::{TimerKind, TimerRequest, TimerSession};

/// Maximum number of deferred facts snapshots held while a timer is
/// outstanding; the oldest snapshot is dropped on overflow.
const DEFERRED_FACTS_CAPACITY: usize = 8;

/// The display states of the hysteresis machine.
///
/// Exactly one state is current at any time. `Legacy` carries a restricted
/// flag: a flip of the flag changes the rule-table key but is not a state
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// No EN-DC, NR restricted, or a non-LTE/NR technology
    Legacy {
        /// Whether the use of NR is restricted by the network
        restricted: bool,
    },
    /// EN-DC available, physical link dormant (RRC idle)
    Idle,
    /// EN-DC available, physical link active (RRC connected)
    LteConnected,
    /// NR connected as a primary or secondary cell
    NrConnected,
    /// NR connected on mmWave or carrier-designated bands
    NrConnectedAdvanced,
}

impl DisplayState {
    /// The rule-table key for this state.
    pub fn key(&self) -> StateKey {
        match self {
            DisplayState::Legacy { restricted: true } => StateKey::Restricted,
            DisplayState::Legacy { restricted: false } => StateKey::Legacy,
            DisplayState::Idle => StateKey::NotRestrictedRrcIdle,
            DisplayState::LteConnected => StateKey::NotRestrictedRrcCon,
            DisplayState::NrConnected => StateKey::Connected,
            DisplayState::NrConnectedAdvanced => StateKey::ConnectedMmwave,
        }
    }

    /// True when both values are the same machine state, ignoring the
    /// restricted flag.
    pub fn same_state(&self, other: &DisplayState) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key().name())
    }
}

/// The event vocabulary of the display engine.
///
/// External signals are normalized into these by the adapter task; timer
/// expirations arrive as delayed self-messages carrying their generation
/// token.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Re-evaluate against the cached facts
    Update,
    /// Service state changed (data RAT, bandwidth, NR state, roaming, ...)
    ServiceStateChanged(ServiceSnapshot),
    /// Physical link status changed (user-data based RRC detection)
    PhysicalLinkStatusChanged(LinkStatus),
    /// Physical channel config indications turned on or off
    PhysicalChannelConfigNotifChanged(bool),
    /// Physical channel config list changed
    PhysicalChannelConfigsChanged(Vec<PhysicalChannelConfig>),
    /// Carrier configuration changed
    CarrierConfigChanged(CarrierDisplayConfig),
    /// Preferred network mode changed; carries the new allowed-types bitmask
    PreferredNetworkModeChanged(u64),
    /// PCO-signalled NR-advanced allowance changed
    NrAdvancedByPcoChanged(bool),
    /// Radio turned off or became unavailable
    RadioOffOrUnavailable,
    /// Device entered or left deep-sleep idle mode
    DeviceIdleModeChanged(bool),
    /// A grace-period timer expired
    TimerExpired {
        /// Primary or secondary stage
        kind: TimerKind,
        /// Generation token of the session that armed the timer
        generation: u64,
    },
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::Update => write!(f, "UPDATE"),
            EngineEvent::ServiceStateChanged(_) => write!(f, "SERVICE_STATE_CHANGED"),
            EngineEvent::PhysicalLinkStatusChanged(_) => {
                write!(f, "PHYSICAL_LINK_STATUS_CHANGED")
            }
            EngineEvent::PhysicalChannelConfigNotifChanged(_) => {
                write!(f, "PHYSICAL_CHANNEL_CONFIG_NOTIF_CHANGED")
            }
            EngineEvent::PhysicalChannelConfigsChanged(_) => {
                write!(f, "PHYSICAL_CHANNEL_CONFIGS_CHANGED")
            }
            EngineEvent::CarrierConfigChanged(_) => write!(f, "CARRIER_CONFIG_CHANGED"),
            EngineEvent::PreferredNetworkModeChanged(_) => {
                write!(f, "PREFERRED_NETWORK_MODE_CHANGED")
            }
            EngineEvent::NrAdvancedByPcoChanged(_) => write!(f, "NR_ADVANCED_BY_PCO_CHANGED"),
            EngineEvent::RadioOffOrUnavailable => write!(f, "RADIO_OFF_OR_UNAVAILABLE"),
            EngineEvent::DeviceIdleModeChanged(_) => write!(f, "DEVICE_IDLE_MODE_CHANGED"),
            EngineEvent::TimerExpired { kind, generation } => {
                write!(f, "TIMER_EXPIRED({kind}, gen={generation})")
            }
        }
    }
}

/// The hysteresis state machine.
///
/// Synchronous and single-writer: the owning task feeds it one event at a
/// time and afterwards drains [`DisplayEngine::take_timer_requests`] to
/// schedule expiry self-messages.
pub struct DisplayEngine {
    config: CarrierDisplayConfig,
    pattern: Option<Regex>,
    rules: RuleTable,
    facts: ServiceFacts,
    current: DisplayState,
    /// The state whose rule supplies the next primary grace period;
    /// refreshed to the current state whenever no timer is outstanding.
    previous_stable: StateKey,
    override_type: OverrideType,
    primary: Option<TimerSession>,
    secondary: Option<TimerSession>,
    /// Generation counter for timer sessions; bumped on every arm and reset
    generation: u64,
    device_idle: bool,
    deferred: VecDeque<ServiceFacts>,
    timer_requests: Vec<TimerRequest>,
}

impl DisplayEngine {
    /// Creates an engine in the `Legacy` state from an initial carrier
    /// configuration.
    pub fn new(config: CarrierDisplayConfig) -> Self {
        let facts = ServiceFacts::new(config.allowed_network_types_bitmask);
        let mut engine = Self {
            config: CarrierDisplayConfig::default(),
            pattern: None,
            rules: RuleTable::empty(),
            facts,
            current: DisplayState::Legacy { restricted: false },
            previous_stable: StateKey::Legacy,
            override_type: OverrideType::None,
            primary: None,
            secondary: None,
            generation: 0,
            device_idle: false,
            deferred: VecDeque::new(),
            timer_requests: Vec::new(),
        };
        engine.apply_config(config);
        engine
    }

    /// The currently published override network type.
    pub fn override_type(&self) -> OverrideType {
        self.override_type
    }

    /// The current display state.
    pub fn current_state(&self) -> DisplayState {
        self.current
    }

    /// True while either grace-period timer is outstanding.
    pub fn any_timer_active(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// The cached service facts.
    pub fn facts(&self) -> &ServiceFacts {
        &self.facts
    }

    /// Drains the timer-scheduling requests produced by the last event.
    pub fn take_timer_requests(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.timer_requests)
    }

    /// Processes one event to completion.
    pub fn handle_event(&mut self, event: EngineEvent) {
        debug!("process {event} in state {}", self.current);
        match event {
            EngineEvent::Update => self.evaluate(true),
            EngineEvent::ServiceStateChanged(snapshot) => {
                if self.config.timer_reset_on_plmn_change
                    && self.facts.service.operator_numeric != snapshot.operator_numeric
                {
                    debug!("Reset timers due to PLMN change");
                    self.reset_all_timers();
                }
                self.facts.service = snapshot;
                self.evaluate(true);
            }
            EngineEvent::PhysicalLinkStatusChanged(status) => {
                if self.uses_channel_configs_for_rrc_detection() {
                    debug!("Ignoring link status; RRC detection uses channel configs");
                    return;
                }
                self.facts.link_status = status;
                self.maybe_reset_for_legacy_rrc_idle();
                self.evaluate(true);
            }
            EngineEvent::PhysicalChannelConfigsChanged(configs) => {
                self.facts.update_channel_configs(configs);
                if self.uses_channel_configs_for_rrc_detection() {
                    self.facts.link_status = self.facts.link_status_from_channel_configs();
                    self.maybe_reset_for_legacy_rrc_idle();
                }
                self.evaluate(true);
            }
            EngineEvent::PhysicalChannelConfigNotifChanged(on) => {
                self.facts.physical_channel_config_on = on;
                if !on {
                    debug!("Reset timers since physical channel config indications are off");
                    self.reset_all_timers();
                }
                self.evaluate(false);
            }
            EngineEvent::CarrierConfigChanged(config) => {
                self.apply_config(config);
                debug!("Reset timers since carrier configurations changed");
                self.reset_all_timers();
                self.evaluate(false);
            }
            EngineEvent::PreferredNetworkModeChanged(bitmask) => {
                self.facts.allowed_network_types_bitmask = bitmask;
                debug!("Reset timers since preferred network mode changed");
                self.reset_all_timers();
                self.evaluate(false);
            }
            EngineEvent::NrAdvancedByPcoChanged(allowed) => {
                if self.config.nr_advanced_capable_pco_id <= 0 {
                    return;
                }
                debug!("NR advanced allowed by PCO: {allowed}");
                self.facts.nr_advanced_allowed_by_pco = allowed;
                self.evaluate(true);
            }
            EngineEvent::RadioOffOrUnavailable => {
                debug!("Reset timers since radio is off or unavailable");
                self.reset_all_timers();
                self.facts.clear_channel_configs();
                self.deferred.clear();
                self.current = DisplayState::Legacy { restricted: false };
                self.previous_stable = StateKey::Legacy;
                let icon = self.decide_now().icon;
                self.publish_icon(icon);
            }
            EngineEvent::DeviceIdleModeChanged(idle) => {
                debug!("Device idle mode changed to {idle}");
                self.device_idle = idle;
                if idle {
                    debug!("Reset timers since device is in idle mode");
                    self.reset_all_timers();
                }
                self.evaluate(false);
            }
            EngineEvent::TimerExpired { kind, generation } => {
                self.on_timer_expired(kind, generation);
            }
        }
    }

    fn apply_config(&mut self, config: CarrierDisplayConfig) {
        self.rules = RuleTable::build(
            &config.icon_configuration,
            &config.primary_timers,
            &config.secondary_timers,
        );
        self.pattern = if config.lte_enhanced_pattern.is_empty() {
            None
        } else {
            match Regex::new(&config.lte_enhanced_pattern) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Invalid enhanced-LTE operator pattern: {e}");
                    None
                }
            }
        };
        self.facts.allowed_network_types_bitmask = config.allowed_network_types_bitmask;
        self.config = config;
    }

    fn uses_channel_configs_for_rrc_detection(&self) -> bool {
        !self.config.use_user_data_for_rrc_detection
    }

    fn decide_now(&self) -> Decision {
        decide(&self.facts, &self.config, self.pattern.as_ref(), &self.rules)
    }

    /// Resets timers when the link goes dormant without EN-DC, if the
    /// carrier enabled that behavior.
    fn maybe_reset_for_legacy_rrc_idle(&mut self) {
        if self.config.timer_reset_on_legacy_rrc_idle
            && matches!(self.current, DisplayState::Legacy { .. })
            && !self.facts.is_physical_link_active()
            && self.any_timer_active()
        {
            debug!("Reset timers since the link is dormant without EN-DC");
            self.reset_all_timers();
        }
    }

    /// Re-evaluates the cached facts and applies the outcome.
    ///
    /// With `with_hysteresis` a state change consults the departed state's
    /// primary grace period; without it the machine jumps directly. While a
    /// timer stays outstanding after the guard sweep the transition decision
    /// is deferred instead.
    fn evaluate(&mut self, with_hysteresis: bool) {
        let decision = self.decide_now();
        let cancelled = self.apply_timer_guards(&decision);
        if self.any_timer_active() {
            self.defer_snapshot();
            return;
        }
        self.deferred.clear();

        if decision.state.same_state(&self.current) {
            // Idempotent refresh; a restricted-flag flip is not a transition
            self.current = decision.state;
            self.previous_stable = self.current.key();
            self.publish_icon(decision.icon);
        } else if with_hysteresis && !cancelled {
            self.transition_with_timer(decision);
        } else {
            debug!("Transition directly from {} to {}", self.current, decision.state);
            self.current = decision.state;
            self.previous_stable = self.current.key();
            self.publish_icon(decision.icon);
        }
    }

    /// The guard sweep run before every evaluation while timers are
    /// outstanding. Returns true if it cancelled anything.
    fn apply_timer_guards(&mut self, decision: &Decision) -> bool {
        if !self.any_timer_active() {
            return false;
        }

        if !self.facts.is_nr_allowed() {
            debug!("Reset timers since NR is not allowed");
            self.reset_all_timers();
            return true;
        }

        let rat = self.facts.service.rat;
        if !rat.is_lte() && !rat.is_nr() {
            debug!("Reset timers since legacy technologies don't use grace periods");
            self.reset_all_timers();
            return true;
        }

        if let Some(primary) = self.primary {
            if decision.state.key() == primary.origin {
                debug!(
                    "Remove primary timer since its origin state ({}) was reestablished",
                    primary.origin
                );
                self.primary = None;
                self.generation = self.generation.wrapping_add(1);
                return true;
            }
        }

        if let Some(secondary) = self.secondary {
            if decision.state.key() != secondary.origin {
                debug!(
                    "Remove secondary timer since the device left its state ({})",
                    secondary.origin
                );
                self.secondary = None;
                self.generation = self.generation.wrapping_add(1);
                return true;
            }
        }

        match decision.state {
            DisplayState::NrConnectedAdvanced => {
                debug!("Reset timers since state is NR advanced");
                self.reset_all_timers();
                true
            }
            DisplayState::NrConnected => {
                let held_for_advanced = self
                    .primary
                    .is_some_and(|t| t.origin == StateKey::ConnectedMmwave)
                    || self
                        .secondary
                        .is_some_and(|t| t.origin == StateKey::ConnectedMmwave);
                if !held_for_advanced {
                    debug!("Reset non-NR-advanced timers since state is NR connected");
                    self.reset_all_timers();
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    fn transition_with_timer(&mut self, decision: Decision) {
        let origin = self.previous_stable;
        let target_key = decision.state.key();
        let duration = self.rules.primary_timer(origin, target_key);
        if !self.device_idle && duration > 0 {
            self.generation = self.generation.wrapping_add(1);
            let session = TimerSession {
                kind: TimerKind::Primary,
                origin,
                target: decision.state,
                duration_secs: duration,
                generation: self.generation,
            };
            debug!("{duration}s primary timer started for transition {origin} -> {target_key}");
            self.timer_requests.push(session.request());
            self.primary = Some(session);
            // Subsequent facts are evaluated against the new state while the
            // old icon stays visible until the timer resolves
            self.current = decision.state;
        } else {
            debug!("Transition from {} to {}", self.current, decision.state);
            self.current = decision.state;
            self.previous_stable = target_key;
            self.publish_icon(decision.icon);
        }
    }

    fn on_timer_expired(&mut self, kind: TimerKind, generation: u64) {
        match kind {
            TimerKind::Primary => {
                let Some(session) = self.primary else {
                    debug!("Dropping stale primary timer expiry (gen {generation})");
                    return;
                };
                if session.generation != generation {
                    debug!(
                        "Dropping superseded primary timer expiry (gen {generation}, current {})",
                        session.generation
                    );
                    return;
                }
                self.primary = None;
                debug!("Primary timer expired for state {}", session.origin);

                let current_key = self.current.key();
                let duration = self.rules.secondary_timer(session.origin, current_key);
                if !self.device_idle && duration > 0 {
                    self.generation = self.generation.wrapping_add(1);
                    let secondary = TimerSession {
                        kind: TimerKind::Secondary,
                        origin: current_key,
                        target: self.current,
                        duration_secs: duration,
                        generation: self.generation,
                    };
                    debug!("{duration}s secondary timer started for state {current_key}");
                    self.timer_requests.push(secondary.request());
                    self.secondary = Some(secondary);
                    self.previous_stable = current_key;
                } else {
                    self.resolve_timers();
                }
            }
            TimerKind::Secondary => {
                let Some(session) = self.secondary else {
                    debug!("Dropping stale secondary timer expiry (gen {generation})");
                    return;
                };
                if session.generation != generation {
                    debug!(
                        "Dropping superseded secondary timer expiry (gen {generation}, current {})",
                        session.generation
                    );
                    return;
                }
                self.secondary = None;
                debug!("Secondary timer expired for state {}", session.origin);
                self.resolve_timers();
            }
        }
    }

    /// Releases the held icon once the timer chain has run out and replays
    /// the transition decision deferred while it was pending.
    fn resolve_timers(&mut self) {
        // The newest snapshot matches the live cache; older entries were
        // superseded during the hold and are dropped unreplayed.
        if let Some(latest) = self.deferred.pop_back() {
            debug!(
                "Replaying deferred facts ({} superseded snapshots dropped)",
                self.deferred.len()
            );
            self.facts = latest;
            self.deferred.clear();
        }
        self.evaluate(false);
    }

    fn defer_snapshot(&mut self) {
        if self.deferred.len() == DEFERRED_FACTS_CAPACITY {
            debug!("Deferred facts queue full; dropping the oldest snapshot");
            self.deferred.pop_front();
        }
        self.deferred.push_back(self.facts.clone());
        debug!(
            "Deferred transition decision while a timer is pending ({} queued)",
            self.deferred.len()
        );
    }

    fn reset_all_timers(&mut self) {
        if self.any_timer_active() {
            debug!("Cancelling outstanding grace-period timers");
        }
        self.primary = None;
        self.secondary = None;
        self.generation = self.generation.wrapping_add(1);
    }

    fn publish_icon(&mut self, icon: OverrideType) {
        debug_assert!(!self.any_timer_active());
        if self.override_type != icon {
            info!("Override network type changed: {} -> {}", self.override_type, icon);
            self.override_type = icon;
        }
    }
}

impl fmt::Debug for DisplayEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayEngine")
            .field("current", &self.current)
            .field("previous_stable", &self.previous_stable)
            .field("override_type", &self.override_type)
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .field("device_idle", &self.device_idle)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
