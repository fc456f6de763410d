//! Grace-period timer sessions
//!
//! The engine owns at most one primary and one secondary timer session at a
//! time. Sessions carry a generation token: the engine bumps its generation
//! counter on every arm and reset, and an expiry message whose token no
//! longer matches the outstanding session is stale and silently dropped.
//! The actual delay is scheduled by the task layer from a [`TimerRequest`]
//! as a delayed self-message on the engine's own event queue.

use std::fmt;
use std::time::Duration;

use crate::machine::DisplayState;
use crate::rules::StateKey;

/// Which of the two grace-period stages a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Holds the old icon after a transition is decided
    Primary,
    /// Holds the intermediate icon after the primary timer expires
    Secondary,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Primary => write!(f, "primary"),
            TimerKind::Secondary => write!(f, "secondary"),
        }
    }
}

/// An outstanding grace-period timer.
///
/// For a primary session, `origin` is the stable state the transition left
/// (whose rule supplied the duration) and `target` the state transitioned
/// to. For a secondary session, `origin` is the state the machine held when
/// the primary expired (the key its duration was looked up by), and `target`
/// is that same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSession {
    /// Primary or secondary stage
    pub kind: TimerKind,
    /// State key the duration was looked up by
    pub origin: StateKey,
    /// State the machine holds while the timer runs
    pub target: DisplayState,
    /// Configured duration in seconds
    pub duration_secs: u32,
    /// Generation token identifying this session
    pub generation: u64,
}

impl TimerSession {
    /// The scheduling request handed to the task layer.
    pub fn request(&self) -> TimerRequest {
        TimerRequest {
            kind: self.kind,
            duration_secs: self.duration_secs,
            generation: self.generation,
        }
    }
}

impl fmt::Display for TimerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} timer gen[{}] origin[{}] target[{}] {}s",
            self.kind, self.generation, self.origin, self.target, self.duration_secs
        )
    }
}

/// A request to schedule a delayed expiry self-message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    /// Primary or secondary stage
    pub kind: TimerKind,
    /// Delay in seconds
    pub duration_secs: u32,
    /// Generation token to carry back in the expiry message
    pub generation: u64,
}

impl TimerRequest {
    /// The delay as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }
}
