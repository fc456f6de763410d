//! Service-state vocabulary for the display engine
//!
//! These types describe the radio/service facts the display engine consumes:
//! the current data RAT, the NR connection sub-state advertised by the LTE
//! anchor cell, the physical link activity, and the per-channel physical
//! channel configuration reported by the modem.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bit for NR in the allowed-network-types bitmask.
///
/// 5G icons are only shown while this bit is present in the preferred
/// network type selection.
pub const NETWORK_TYPE_BITMASK_NR: u64 = 1 << 19;

/// Bit for LTE in the allowed-network-types bitmask.
pub const NETWORK_TYPE_BITMASK_LTE: u64 = 1 << 12;

/// Data Radio Access Technology, reduced to the distinctions the display
/// engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataRat {
    /// No registration or unknown technology
    #[default]
    Unknown,
    /// LTE
    Lte,
    /// LTE with carrier aggregation reported as the RAT itself
    LteCa,
    /// NR standalone
    Nr,
    /// Any other technology (2G/3G families)
    Other,
}

impl DataRat {
    /// Returns true for LTE and LTE-CA.
    pub fn is_lte(&self) -> bool {
        matches!(self, DataRat::Lte | DataRat::LteCa)
    }

    /// Returns true for NR standalone.
    pub fn is_nr(&self) -> bool {
        matches!(self, DataRat::Nr)
    }
}

impl fmt::Display for DataRat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRat::Unknown => write!(f, "UNKNOWN"),
            DataRat::Lte => write!(f, "LTE"),
            DataRat::LteCa => write!(f, "LTE_CA"),
            DataRat::Nr => write!(f, "NR"),
            DataRat::Other => write!(f, "OTHER"),
        }
    }
}

/// NR connection sub-state reported with an LTE registration.
///
/// For an LTE anchor cell this describes whether EN-DC is available and
/// whether NR is currently in use as a secondary cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NrState {
    /// The LTE cell does not support EN-DC
    #[default]
    None,
    /// EN-DC is supported but the use of NR is restricted
    Restricted,
    /// EN-DC is supported and NR is not restricted
    NotRestricted,
    /// NR is connected as a secondary cell
    Connected,
}

impl fmt::Display for NrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NrState::None => write!(f, "NONE"),
            NrState::Restricted => write!(f, "RESTRICTED"),
            NrState::NotRestricted => write!(f, "NOT_RESTRICTED"),
            NrState::Connected => write!(f, "CONNECTED"),
        }
    }
}

/// Physical data link activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkStatus {
    /// Link state is not known
    #[default]
    Unknown,
    /// The link is established but dormant (RRC idle)
    Dormant,
    /// The link is actively transferring data (RRC connected)
    Active,
}

impl LinkStatus {
    /// Returns true if the link is actively transferring data.
    pub fn is_active(&self) -> bool {
        matches!(self, LinkStatus::Active)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Unknown => write!(f, "UNKNOWN"),
            LinkStatus::Dormant => write!(f, "DORMANT"),
            LinkStatus::Active => write!(f, "ACTIVE"),
        }
    }
}

/// NR frequency range of the serving cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrequencyRange {
    /// Frequency range is not known
    #[default]
    Unknown,
    /// Low range (< 1GHz)
    Low,
    /// Mid range (1GHz - 3GHz)
    Mid,
    /// High range (3GHz - 6GHz)
    High,
    /// Millimeter wave (> 24GHz)
    Mmwave,
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyRange::Unknown => write!(f, "UNKNOWN"),
            FrequencyRange::Low => write!(f, "LOW"),
            FrequencyRange::Mid => write!(f, "MID"),
            FrequencyRange::High => write!(f, "HIGH"),
            FrequencyRange::Mmwave => write!(f, "MMWAVE"),
        }
    }
}

/// The override network type published to the rendering collaborator.
///
/// This is the value that replaces the plain data-RAT icon on the status
/// display. `None` means no override and the plain RAT icon is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverrideType {
    /// No override, show the plain RAT icon
    #[default]
    None,
    /// LTE+ (carrier aggregation above the configured bandwidth threshold)
    LteCa,
    /// LTE Advanced Pro (operator-name pattern match)
    LteAdvancedPro,
    /// 5G (NR connected)
    NrNsa,
    /// 5G+ (NR advanced: mmWave or carrier-designated bands)
    NrAdvanced,
}

impl fmt::Display for OverrideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideType::None => write!(f, "NONE"),
            OverrideType::LteCa => write!(f, "LTE_CA"),
            OverrideType::LteAdvancedPro => write!(f, "LTE_ADVANCED_PRO"),
            OverrideType::NrNsa => write!(f, "NR_NSA"),
            OverrideType::NrAdvanced => write!(f, "NR_ADVANCED"),
        }
    }
}

/// One entry of the physical channel configuration list reported by the
/// modem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalChannelConfig {
    /// RAT of this channel
    pub rat: DataRat,
    /// Band number of this channel
    pub band: i32,
    /// Downlink cell bandwidth in kHz
    pub downlink_bandwidth_khz: u32,
}

impl PhysicalChannelConfig {
    /// Creates a new physical channel configuration entry.
    pub fn new(rat: DataRat, band: i32, downlink_bandwidth_khz: u32) -> Self {
        Self {
            rat,
            band,
            downlink_bandwidth_khz,
        }
    }
}

/// A wholesale snapshot of the service state relevant to icon selection.
///
/// A new snapshot replaces the previous one entirely on every
/// service-state-changed event; individual fields are never mutated in
/// place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Current data RAT
    pub rat: DataRat,
    /// NR connection sub-state
    pub nr_state: NrState,
    /// NR frequency range of the serving cell
    pub nr_frequency_range: FrequencyRange,
    /// Downlink cell bandwidths in kHz, one entry per aggregated carrier
    pub cell_bandwidths_khz: Vec<u32>,
    /// Whether carrier aggregation is in use
    pub using_carrier_aggregation: bool,
    /// Whether the device is data-roaming
    pub data_roaming: bool,
    /// Raw long operator name
    pub operator_alpha_long: String,
    /// Raw short operator name
    pub operator_alpha_short: String,
    /// Numeric operator identity (MCC + MNC)
    pub operator_numeric: String,
    /// Absolute RF channel number of the serving cell
    pub channel_number: i32,
}

impl ServiceSnapshot {
    /// Sum of the downlink cell bandwidths in kHz.
    pub fn cell_bandwidth_sum_khz(&self) -> u32 {
        self.cell_bandwidths_khz.iter().sum()
    }
}
