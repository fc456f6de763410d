//! Override timer rule table
//!
//! Carrier configuration describes icon assignments and grace-period timers
//! as three delimited strings (see
//! [`CarrierDisplayConfig`](nricon_common::CarrierDisplayConfig)). This
//! module parses them into a total rule table: every display state owns
//! exactly one [`OverrideTimerRule`] after [`RuleTable::build`], regardless
//! of how malformed the inputs are.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use nricon_common::types::OverrideType;

/// Icon token for 5G in the icon configuration string.
const ICON_5G: &str = "5g";
/// Icon token for 5G+ in the icon configuration string.
const ICON_5G_PLUS: &str = "5g_plus";
/// Wildcard state token in the timer configuration strings.
const STATE_ANY: &str = "any";

/// Rule-table key: the named display states of the carrier configuration
/// grammar.
///
/// `Legacy` and `Restricted` are distinct keys even though they map to the
/// same machine state; which one applies depends on whether the use of NR
/// is restricted by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// No EN-DC, or a non-LTE/NR technology
    Legacy,
    /// EN-DC supported but NR restricted
    Restricted,
    /// EN-DC available, physical link dormant
    NotRestrictedRrcIdle,
    /// EN-DC available, physical link active
    NotRestrictedRrcCon,
    /// NR connected
    Connected,
    /// NR connected on mmWave or carrier-designated bands
    ConnectedMmwave,
}

impl StateKey {
    /// All rule-table keys.
    pub const ALL: [StateKey; 6] = [
        StateKey::Legacy,
        StateKey::Restricted,
        StateKey::NotRestrictedRrcIdle,
        StateKey::NotRestrictedRrcCon,
        StateKey::Connected,
        StateKey::ConnectedMmwave,
    ];

    /// The configuration-string name of this key.
    pub fn name(&self) -> &'static str {
        match self {
            StateKey::Legacy => "legacy",
            StateKey::Restricted => "restricted",
            StateKey::NotRestrictedRrcIdle => "not_restricted_rrc_idle",
            StateKey::NotRestrictedRrcCon => "not_restricted_rrc_con",
            StateKey::Connected => "connected",
            StateKey::ConnectedMmwave => "connected_mmwave",
        }
    }

    /// Parses a configuration-string name. The wildcard token `any` is not
    /// a key and returns `None` here.
    pub fn from_name(name: &str) -> Option<StateKey> {
        match name {
            "legacy" => Some(StateKey::Legacy),
            "restricted" => Some(StateKey::Restricted),
            "not_restricted_rrc_idle" => Some(StateKey::NotRestrictedRrcIdle),
            "not_restricted_rrc_con" => Some(StateKey::NotRestrictedRrcCon),
            "connected" => Some(StateKey::Connected),
            "connected_mmwave" => Some(StateKey::ConnectedMmwave),
            _ => None,
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Timer destination: a specific state or the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKey {
    Any,
    State(StateKey),
}

impl TimerKey {
    fn from_name(name: &str) -> Option<TimerKey> {
        if name == STATE_ANY {
            Some(TimerKey::Any)
        } else {
            StateKey::from_name(name).map(TimerKey::State)
        }
    }
}

/// Icon and grace-period timers for one display state.
///
/// The primary timer map is keyed by the destination state of a transition
/// away from this state; the secondary timer map is keyed by the state the
/// machine is in when the primary timer expires. Both fall back to a
/// wildcard entry when the specific key is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideTimerRule {
    /// The state this rule applies to
    state: StateKey,
    /// Icon shown while in this state (`None` falls through to the LTE
    /// values)
    override_type: OverrideType,
    primary_timers: HashMap<TimerKey, u32>,
    secondary_timers: HashMap<TimerKey, u32>,
}

impl OverrideTimerRule {
    fn new(state: StateKey, override_type: OverrideType) -> Self {
        Self {
            state,
            override_type,
            primary_timers: HashMap::new(),
            secondary_timers: HashMap::new(),
        }
    }

    /// The state this rule applies to.
    pub fn state(&self) -> StateKey {
        self.state
    }

    /// The icon associated with this state.
    pub fn override_type(&self) -> OverrideType {
        self.override_type
    }

    fn add_primary(&mut self, destination: TimerKey, duration_secs: u32) {
        self.primary_timers.insert(destination, duration_secs);
    }

    fn add_secondary(&mut self, state: TimerKey, duration_secs: u32) {
        self.secondary_timers.insert(state, duration_secs);
    }

    /// Primary grace period in seconds for a transition from this state to
    /// `destination`, falling back to the wildcard entry. 0 when unset.
    pub fn primary_timer(&self, destination: StateKey) -> u32 {
        self.primary_timers
            .get(&TimerKey::State(destination))
            .or_else(|| self.primary_timers.get(&TimerKey::Any))
            .copied()
            .unwrap_or(0)
    }

    /// Secondary grace period in seconds for `state` (the state the machine
    /// holds when the primary timer expires), falling back to the wildcard
    /// entry. 0 when unset.
    pub fn secondary_timer(&self, state: StateKey) -> u32 {
        self.secondary_timers
            .get(&TimerKey::State(state))
            .or_else(|| self.secondary_timers.get(&TimerKey::Any))
            .copied()
            .unwrap_or(0)
    }
}

impl fmt::Display for OverrideTimerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{state={}, override={}, primary={:?}, secondary={:?}}}",
            self.state, self.override_type, self.primary_timers, self.secondary_timers
        )
    }
}

/// The complete rule table built from the three carrier rule strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: HashMap<StateKey, OverrideTimerRule>,
}

impl RuleTable {
    /// Builds a rule table from the icon, primary-timer, and
    /// secondary-timer rule strings.
    ///
    /// Parsing is total: malformed pairs and triples are skipped with a
    /// warning, unknown icon tokens leave the state with no icon, and every
    /// state key receives an entry even when absent from the strings.
    pub fn build(icons: &str, timers: &str, secondary_timers: &str) -> Self {
        let mut rules: HashMap<StateKey, OverrideTimerRule> = HashMap::new();

        // Format: "STATE:ICON,STATE2:ICON2"
        for pair in icons.trim().split(',').filter(|p| !p.trim().is_empty()) {
            let pair = pair.trim().to_lowercase();
            let Some((state_name, icon_name)) = pair.split_once(':') else {
                warn!("Invalid icon configuration entry: {pair}");
                continue;
            };
            let Some(state) = StateKey::from_name(state_name) else {
                warn!("Unknown state in icon configuration: {state_name}");
                continue;
            };
            let override_type = match icon_name {
                ICON_5G => OverrideType::NrNsa,
                ICON_5G_PLUS => OverrideType::NrAdvanced,
                other => {
                    warn!("Unknown icon token: {other}");
                    OverrideType::None
                }
            };
            rules.insert(state, OverrideTimerRule::new(state, override_type));
        }

        // Ensure all states have an associated rule and icon
        for state in StateKey::ALL {
            rules
                .entry(state)
                .or_insert_with(|| OverrideTimerRule::new(state, OverrideType::None));
        }

        Self::parse_timers(&mut rules, timers, false);
        Self::parse_timers(&mut rules, secondary_timers, true);

        let table = Self { rules };
        debug!("Rule table built: {table}");
        table
    }

    /// Builds an empty rule table: no icons, no timers.
    pub fn empty() -> Self {
        Self::build("", "", "")
    }

    // Format: "FROM_STATE,TO_STATE,DURATION;FROM_STATE_2,TO_STATE_2,DURATION_2"
    fn parse_timers(
        rules: &mut HashMap<StateKey, OverrideTimerRule>,
        spec: &str,
        secondary: bool,
    ) {
        for triple in spec.trim().split(';').filter(|t| !t.trim().is_empty()) {
            let triple = triple.trim().to_lowercase();
            let parts: Vec<&str> = triple.split(',').collect();
            if parts.len() != 3 {
                warn!("Invalid timer configuration entry: {triple}");
                continue;
            }
            let Some(to) = TimerKey::from_name(parts[1]) else {
                warn!("Unknown destination state in timer configuration: {}", parts[1]);
                continue;
            };
            let Ok(duration) = parts[2].parse::<u32>() else {
                warn!("Non-numeric timer duration: {}", parts[2]);
                continue;
            };
            let from_states: Vec<StateKey> = if parts[0] == STATE_ANY {
                StateKey::ALL.to_vec()
            } else {
                match StateKey::from_name(parts[0]) {
                    Some(state) => vec![state],
                    None => {
                        warn!("Unknown origin state in timer configuration: {}", parts[0]);
                        continue;
                    }
                }
            };
            for from in from_states {
                let rule = rules
                    .entry(from)
                    .or_insert_with(|| OverrideTimerRule::new(from, OverrideType::None));
                if secondary {
                    rule.add_secondary(to, duration);
                } else {
                    rule.add_primary(to, duration);
                }
            }
        }
    }

    /// The rule for `state`. Total: every state key has an entry.
    pub fn get(&self, state: StateKey) -> &OverrideTimerRule {
        &self.rules[&state]
    }

    /// Primary grace period for a transition `from` -> `to` in seconds.
    pub fn primary_timer(&self, from: StateKey, to: StateKey) -> u32 {
        self.get(from).primary_timer(to)
    }

    /// Secondary grace period for `state` after a primary timer keyed by
    /// `origin` expires, in seconds.
    pub fn secondary_timer(&self, origin: StateKey, state: StateKey) -> u32 {
        self.get(origin).secondary_timer(state)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for state in StateKey::ALL {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.rules[&state])?;
            first = false;
        }
        Ok(())
    }
}
