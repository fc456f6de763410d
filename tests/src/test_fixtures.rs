//! Common fixtures for display-engine integration tests

use nricon_common::config::CarrierDisplayConfig;
use nricon_common::types::{DataRat, NrState, ServiceSnapshot};

/// A carrier configuration with the usual 5G icon assignments and the given
/// timer rule strings.
pub fn nr_icon_config(primary_timers: &str, secondary_timers: &str) -> CarrierDisplayConfig {
    CarrierDisplayConfig {
        icon_configuration: "connected:5g,connected_mmwave:5g_plus".to_string(),
        primary_timers: primary_timers.to_string(),
        secondary_timers: secondary_timers.to_string(),
        ..Default::default()
    }
}

/// LTE anchor with NR connected as a secondary cell (EN-DC in use).
pub fn nsa_connected_snapshot() -> ServiceSnapshot {
    ServiceSnapshot {
        rat: DataRat::Lte,
        nr_state: NrState::Connected,
        ..Default::default()
    }
}

/// Plain LTE without EN-DC.
pub fn plain_lte_snapshot() -> ServiceSnapshot {
    ServiceSnapshot {
        rat: DataRat::Lte,
        nr_state: NrState::None,
        ..Default::default()
    }
}
