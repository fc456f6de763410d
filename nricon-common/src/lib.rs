//! Common types and utilities for nricon
//!
//! This crate provides the shared service-state vocabulary, the carrier
//! display configuration, and logging/error utilities used by the nricon
//! display engine.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::CarrierDisplayConfig;
pub use error::{Error, Result};
pub use logging::{init_logging, init_logging_with_filter, LogLevel};
pub use types::*;
