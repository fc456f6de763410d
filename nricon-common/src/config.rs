//! Carrier display configuration
//!
//! This module provides the carrier-controlled configuration bundle that
//! drives icon selection and the grace-period timers. Operators ship these
//! values per subscription; a fresh bundle arrives on every
//! carrier-config-changed event and replaces the previous one wholesale.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{NETWORK_TYPE_BITMASK_LTE, NETWORK_TYPE_BITMASK_NR};

/// Default LTE+ bandwidth threshold in kHz.
pub const DEFAULT_LTE_PLUS_THRESHOLD_BANDWIDTH_KHZ: u32 = 20_000;

/// Carrier configuration for network-type icon display.
///
/// The three rule strings use the grammar of the platform carrier configs:
///
/// - `icon_configuration`: comma-separated `state:icon` pairs, for example
///   `"connected:5g,connected_mmwave:5g_plus"`.
/// - `primary_timers` / `secondary_timers`: semicolon-separated
///   `from,to,seconds` triples, where `from` may be the wildcard `any`, for
///   example `"connected,any,10;not_restricted_rrc_con,legacy,30"`.
///
/// Malformed entries are skipped during rule-table construction, never
/// fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierDisplayConfig {
    /// Per-state icon assignments
    pub icon_configuration: String,
    /// Primary grace-period timers between display states
    pub primary_timers: String,
    /// Secondary grace-period timers applied after a primary timer expires
    pub secondary_timers: String,
    /// Minimum summed downlink bandwidth (kHz) for the LTE+ icon
    pub lte_plus_threshold_bandwidth_khz: u32,
    /// Minimum summed NR downlink bandwidth (kHz) for the 5G+ icon
    /// (0 disables the bandwidth requirement)
    pub nr_advanced_threshold_bandwidth_khz: u32,
    /// Carrier-designated bands that qualify for the 5G+ icon in addition
    /// to mmWave
    pub additional_nr_advanced_bands: Vec<i32>,
    /// Whether the 5G+ icon may be shown while data-roaming
    pub enable_nr_advanced_while_roaming: bool,
    /// PCO id gating 5G+ (0 disables the PCO requirement)
    pub nr_advanced_capable_pco_id: i32,
    /// Allowed network types; 5G icons require the NR bit
    pub allowed_network_types_bitmask: u64,
    /// Regular expression matched against raw operator names for the
    /// LTE Advanced Pro icon (empty disables the check)
    pub lte_enhanced_pattern: String,
    /// RRC detection method: true derives link activity from user-data
    /// link-status callbacks, false derives it from the physical channel
    /// configuration list
    pub use_user_data_for_rrc_detection: bool,
    /// Reset grace-period timers when the registered PLMN changes
    pub timer_reset_on_plmn_change: bool,
    /// Reset grace-period timers when the link goes dormant without EN-DC
    pub timer_reset_on_legacy_rrc_idle: bool,
}

impl Default for CarrierDisplayConfig {
    fn default() -> Self {
        Self {
            icon_configuration: String::new(),
            primary_timers: String::new(),
            secondary_timers: String::new(),
            lte_plus_threshold_bandwidth_khz: DEFAULT_LTE_PLUS_THRESHOLD_BANDWIDTH_KHZ,
            nr_advanced_threshold_bandwidth_khz: 0,
            additional_nr_advanced_bands: Vec::new(),
            enable_nr_advanced_while_roaming: true,
            nr_advanced_capable_pco_id: 0,
            allowed_network_types_bitmask: NETWORK_TYPE_BITMASK_LTE | NETWORK_TYPE_BITMASK_NR,
            lte_enhanced_pattern: String::new(),
            use_user_data_for_rrc_detection: false,
            timer_reset_on_plmn_change: false,
            timer_reset_on_legacy_rrc_idle: false,
        }
    }
}

impl CarrierDisplayConfig {
    /// Loads a configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Loads a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Returns true if the NR bit is present in the allowed network types.
    pub fn is_nr_allowed(&self) -> bool {
        self.allowed_network_types_bitmask & NETWORK_TYPE_BITMASK_NR != 0
    }
}
