//! Override decision function
//!
//! [`decide`] is the pure mapping from cached service facts to the display
//! state the machine should be in and the icon that state computes. It never
//! touches timers; whether its result becomes visible immediately or after a
//! grace period is the state machine's concern.

use regex::Regex;
use tracing::debug;

use nricon_common::config::CarrierDisplayConfig;
use nricon_common::types::{DataRat, FrequencyRange, NrState, OverrideType};

use crate::facts::ServiceFacts;
use crate::machine::DisplayState;
use crate::rules::{RuleTable, StateKey};

/// Result of one evaluation: the target display state and the icon that
/// state currently computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Target display state
    pub state: DisplayState,
    /// Icon the target state computes from the current facts
    pub icon: OverrideType,
}

/// Evaluates the current facts against the carrier configuration and rule
/// table.
///
/// `pattern` is the pre-compiled enhanced-LTE operator pattern, if one is
/// configured.
pub fn decide(
    facts: &ServiceFacts,
    config: &CarrierDisplayConfig,
    pattern: Option<&Regex>,
    rules: &RuleTable,
) -> Decision {
    let rat = facts.service.rat;
    let nr_nsa = rat.is_lte() && facts.service.nr_state != NrState::None;
    let nr_sa = rat.is_nr();

    // NR display is not accurate when physical channel config notifications
    // are off
    let icon = if facts.physical_channel_config_on && (nr_nsa || nr_sa) {
        let nr_icon = nr_display_type(facts, config, rules, nr_sa);
        if nr_icon == OverrideType::None && !nr_sa {
            // Use LTE values if 5G values aren't defined
            lte_display_type(facts, config, pattern)
        } else {
            nr_icon
        }
    } else if rat.is_lte() {
        lte_display_type(facts, config, pattern)
    } else {
        OverrideType::None
    };

    let state = if nr_sa || (rat.is_lte() && facts.is_nr_connected()) {
        if is_nr_advanced(facts, config) {
            DisplayState::NrConnectedAdvanced
        } else {
            DisplayState::NrConnected
        }
    } else if rat.is_lte() && facts.is_nr_not_restricted() {
        if facts.is_physical_link_active() {
            DisplayState::LteConnected
        } else {
            DisplayState::Idle
        }
    } else {
        DisplayState::Legacy {
            restricted: facts.is_nr_restricted(),
        }
    };

    Decision { state, icon }
}

/// Icon for the NR display path, in key priority order. Returns `None` when
/// 5G is not in the allowed network types or no configured rule matches.
fn nr_display_type(
    facts: &ServiceFacts,
    config: &CarrierDisplayConfig,
    rules: &RuleTable,
    nr_sa: bool,
) -> OverrideType {
    // Don't show 5G icons if the preferred network types do not include NR
    if !facts.is_nr_allowed() {
        return OverrideType::None;
    }

    let mut keys: Vec<StateKey> = Vec::new();
    if nr_sa {
        if is_nr_advanced(facts, config) {
            keys.push(StateKey::ConnectedMmwave);
        }
    } else {
        match facts.service.nr_state {
            NrState::Connected => {
                if is_nr_advanced(facts, config) {
                    keys.push(StateKey::ConnectedMmwave);
                }
                keys.push(StateKey::Connected);
            }
            NrState::NotRestricted => {
                keys.push(if facts.is_physical_link_active() {
                    StateKey::NotRestrictedRrcCon
                } else {
                    StateKey::NotRestrictedRrcIdle
                });
            }
            NrState::Restricted => keys.push(StateKey::Restricted),
            NrState::None => {}
        }
    }

    for key in keys {
        let override_type = rules.get(key).override_type();
        if override_type != OverrideType::None {
            return override_type;
        }
    }
    OverrideType::None
}

/// Icon for the LTE display path: LTE+ above the bandwidth threshold,
/// upgraded to LTE Advanced Pro on an operator-pattern match.
fn lte_display_type(
    facts: &ServiceFacts,
    config: &CarrierDisplayConfig,
    pattern: Option<&Regex>,
) -> OverrideType {
    let mut value = OverrideType::None;
    if (facts.service.rat == DataRat::LteCa || facts.service.using_carrier_aggregation)
        && facts.service.cell_bandwidth_sum_khz() > config.lte_plus_threshold_bandwidth_khz
    {
        value = OverrideType::LteCa;
    }
    if is_lte_enhanced_available(facts, pattern) {
        value = OverrideType::LteAdvancedPro;
    }
    value
}

fn is_lte_enhanced_available(facts: &ServiceFacts, pattern: Option<&Regex>) -> bool {
    let Some(pattern) = pattern else {
        return false;
    };
    [
        facts.service.operator_alpha_long.as_str(),
        facts.service.operator_alpha_short.as_str(),
    ]
    .iter()
    .any(|name| !name.is_empty() && pattern.is_match(name))
}

/// Whether the device qualifies for the 5G+ icon: the PCO, roaming, and
/// bandwidth gates must all pass, and the serving cells must include mmWave
/// or a carrier-designated band.
pub fn is_nr_advanced(facts: &ServiceFacts, config: &CarrierDisplayConfig) -> bool {
    // Carriers using PCO to indicate NR-advanced capability configure a
    // non-zero PCO id
    if config.nr_advanced_capable_pco_id > 0 && !facts.nr_advanced_allowed_by_pco {
        debug!(
            "is_nr_advanced: not allowed by PCO for PCO id {}",
            config.nr_advanced_capable_pco_id
        );
        return false;
    }

    if facts.service.data_roaming && !config.enable_nr_advanced_while_roaming {
        debug!("is_nr_advanced: unavailable while roaming");
        return false;
    }

    if config.nr_advanced_threshold_bandwidth_khz > 0
        && facts.nr_bandwidth_khz < config.nr_advanced_threshold_bandwidth_khz
    {
        debug!(
            "is_nr_advanced: bandwidth {} below threshold {}",
            facts.nr_bandwidth_khz, config.nr_advanced_threshold_bandwidth_khz
        );
        return false;
    }

    is_nr_mmwave(facts) || is_additional_nr_advanced_band(facts, config)
}

fn is_nr_mmwave(facts: &ServiceFacts) -> bool {
    facts.service.nr_frequency_range == FrequencyRange::Mmwave
}

fn is_additional_nr_advanced_band(facts: &ServiceFacts, config: &CarrierDisplayConfig) -> bool {
    !config.additional_nr_advanced_bands.is_empty()
        && config
            .additional_nr_advanced_bands
            .iter()
            .any(|band| facts.nr_bands.contains(band))
}
