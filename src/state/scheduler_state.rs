//! Lifecycle states of the batch scheduler
//!
//! ```text
//! Idle -> Loading -> Running <-> Checkpointing
//!            |          |             |
//!            +------> Stopped <-------+
//! ```

use std::fmt;

/// Represents the current state of the batch scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// Constructed, nothing loaded yet
    Idle,

    /// Reading the location list and the persisted cursor
    Loading,

    /// Walking locations until a stop condition is met
    Running,

    /// Flushing the ledger and cursor into the checkpoint store
    Checkpointing,

    /// Run finished; the summary is available
    Stopped,
}

impl SchedulerState {
    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: SchedulerState) -> bool {
        use SchedulerState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Running)
                | (Loading, Stopped)
                | (Running, Checkpointing)
                | (Checkpointing, Running)
                | (Running, Stopped)
                | (Checkpointing, Stopped)
                | (Stopped, Loading)
        )
    }

    /// Returns true while the scheduler owns the cursor and ledger
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loading | Self::Running | Self::Checkpointing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Running => "running",
            Self::Checkpointing => "checkpointing",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
