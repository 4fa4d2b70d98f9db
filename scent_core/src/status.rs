//! Lifecycle state and per-poll outcomes of the execution state machine.

use crate::error::{BlendError, LedgerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecState {
    #[default]
    Idle,
    Ready,
    Running,
    Complete,
    Error,
}

impl std::fmt::Display for ExecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// What a single `poll` did.
#[derive(Debug, Clone)]
pub enum PollStatus {
    /// Nothing pending.
    Idle,
    /// A recipe is reserved and waiting for the start command.
    Waiting,
    /// The inventory check failed; nothing was actuated.
    Rejected(LedgerError),
    /// A recipe ran to completion and its stock was committed.
    Completed,
    /// A recipe was abandoned; its reservation was released.
    Failed(BlendError),
}
