//! Handle state machine

use std::fmt;

/// Lifecycle state of a worker handle
///
/// ```text
/// FAILURE (spawn failed, terminal)
/// IDLE --exec--> BUSY --done reply--> IDLE
/// IDLE/BUSY --error event--> ERROR (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum WorkerState {
    Failure = -1,
    Idle = 0,
    Busy = 1,
    Error = 2,
}

impl WorkerState {
    /// Numeric state code
    pub fn code(self) -> i8 {
        self as i8
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(WorkerState::Failure),
            0 => Some(WorkerState::Idle),
            1 => Some(WorkerState::Busy),
            2 => Some(WorkerState::Error),
            _ => None,
        }
    }

    /// No transition leaves a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Failure | WorkerState::Error)
    }

    pub(crate) fn on_exec(self) -> Self {
        match self {
            WorkerState::Idle | WorkerState::Busy => WorkerState::Busy,
            terminal => terminal,
        }
    }

    pub(crate) fn on_done(self) -> Self {
        match self {
            WorkerState::Busy => WorkerState::Idle,
            other => other,
        }
    }

    pub(crate) fn on_error(self) -> Self {
        match self {
            WorkerState::Failure => WorkerState::Failure,
            _ => WorkerState::Error,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Failure => "FAILURE",
            WorkerState::Idle => "IDLE",
            WorkerState::Busy => "BUSY",
            WorkerState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Inter-worker channel marker
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Unconnected,
    /// `connect_to` was called; wiring is not implemented yet
    Pending { peer: u64 },
}
