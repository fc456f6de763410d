//! Integration test framework for nricon
//!
//! This crate provides test utilities and fixtures for integration testing
//! of the nricon display engine.
//!
//! # Test Categories
//!
//! 1. **Hysteresis Tests** - Drive the async display task end-to-end with
//!    short grace periods and observe the published override type
//! 2. **Engine Scenarios** - Longer event sequences against the synchronous
//!    engine

pub mod test_fixtures;

pub use test_fixtures::{nr_icon_config, nsa_connected_snapshot, plain_lte_snapshot};
pub use test_utils::{init_test_logging, wait_for_condition, TestResult};
