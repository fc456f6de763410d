//! nricon display engine
//!
//! This crate decides which network-type override icon (LTE+, 5G, 5G+, or
//! none) should currently be shown to the user, given a serialized stream of
//! radio and service-state events. Carrier-configurable grace-period timers
//! suppress rapid flicker between icons: after a transition away from a 5G
//! state the previous icon is held for a primary grace period, optionally
//! followed by a secondary grace period, before the freshly computed icon is
//! released.
//!
//! # Architecture
//!
//! - [`rules`] - the carrier-configured rule table: per-state icons plus
//!   primary and secondary timer maps, parsed from three rule strings.
//! - [`facts`] - the cached service facts every decision is computed from.
//! - [`decision`] - the pure function mapping facts to a target display
//!   state and icon.
//! - [`machine`] - the hysteresis state machine owning current/previous
//!   state bookkeeping, timer sessions, and deferred-event handling.
//! - [`timer`] - grace-period timer sessions and their generation tokens.
//! - [`task`] - the async event-adapter task that serializes external
//!   signals, schedules timer expirations as delayed self-messages, and
//!   publishes the override type.

pub mod decision;
pub mod facts;
pub mod machine;
pub mod rules;
pub mod task;
pub mod timer;

pub use decision::{decide, Decision};
pub use facts::ServiceFacts;
pub use machine::{DisplayEngine, DisplayState, EngineEvent};
pub use rules::{OverrideTimerRule, RuleTable, StateKey};
pub use task::{spawn_display_task, DisplayHandle, DisplayTask, Task, TaskMessage};
pub use timer::{TimerKind, TimerRequest, TimerSession};
