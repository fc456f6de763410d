//! Cached service facts
//!
//! The engine owns one [`ServiceFacts`] value: a snapshot of everything the
//! decision function reads. Events replace whole sections of it (the service
//! snapshot wholesale, the physical channel config list wholesale); nothing
//! outside the engine mutates it.

use std::collections::HashSet;

use nricon_common::types::{
    DataRat, LinkStatus, NrState, PhysicalChannelConfig, ServiceSnapshot,
};

/// The complete set of inputs to icon and state selection.
#[derive(Debug, Clone, Default)]
pub struct ServiceFacts {
    /// Latest service-state snapshot
    pub service: ServiceSnapshot,
    /// Latest physical channel configuration list (`None` until the first
    /// report, and after a radio-off reset)
    pub channel_configs: Option<Vec<PhysicalChannelConfig>>,
    /// NR bands present in the channel list
    pub nr_bands: HashSet<i32>,
    /// Summed NR downlink bandwidth in kHz from the channel list
    pub nr_bandwidth_khz: u32,
    /// Physical link activity
    pub link_status: LinkStatus,
    /// Whether physical-channel-config notifications are enabled; NR icons
    /// are unreliable while they are off
    pub physical_channel_config_on: bool,
    /// PCO-signalled NR-advanced allowance
    pub nr_advanced_allowed_by_pco: bool,
    /// Allowed network types; updated on preferred-network-mode changes
    pub allowed_network_types_bitmask: u64,
}

impl ServiceFacts {
    /// Creates fresh facts with the given initial allowed-network-types
    /// bitmask. Channel-config notifications start enabled.
    pub fn new(allowed_network_types_bitmask: u64) -> Self {
        Self {
            physical_channel_config_on: true,
            allowed_network_types_bitmask,
            ..Default::default()
        }
    }

    /// Replaces the channel config list and recomputes the NR band set and
    /// bandwidth sum.
    pub fn update_channel_configs(&mut self, configs: Vec<PhysicalChannelConfig>) {
        self.nr_bands.clear();
        self.nr_bandwidth_khz = 0;
        for config in &configs {
            if config.rat == DataRat::Nr {
                self.nr_bands.insert(config.band);
                self.nr_bandwidth_khz += config.downlink_bandwidth_khz;
            }
        }
        self.channel_configs = Some(configs);
    }

    /// Clears the channel config list and its derived fields.
    pub fn clear_channel_configs(&mut self) {
        self.channel_configs = None;
        self.nr_bands.clear();
        self.nr_bandwidth_khz = 0;
    }

    /// Link status derived from the channel list: an empty or absent list
    /// means the radio is dormant.
    pub fn link_status_from_channel_configs(&self) -> LinkStatus {
        match &self.channel_configs {
            Some(configs) if !configs.is_empty() => LinkStatus::Active,
            _ => LinkStatus::Dormant,
        }
    }

    /// True if NR is connected as a secondary cell.
    pub fn is_nr_connected(&self) -> bool {
        self.service.nr_state == NrState::Connected
    }

    /// True if EN-DC is available and unrestricted.
    pub fn is_nr_not_restricted(&self) -> bool {
        self.service.nr_state == NrState::NotRestricted
    }

    /// True if the use of NR is restricted by the network.
    pub fn is_nr_restricted(&self) -> bool {
        self.service.nr_state == NrState::Restricted
    }

    /// True if the physical link is actively transferring data.
    pub fn is_physical_link_active(&self) -> bool {
        self.link_status.is_active()
    }

    /// True if the NR bit is present in the allowed network types.
    pub fn is_nr_allowed(&self) -> bool {
        self.allowed_network_types_bitmask & nricon_common::types::NETWORK_TYPE_BITMASK_NR != 0
    }
}
