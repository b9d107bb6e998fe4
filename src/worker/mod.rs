//! Worker handles and their state machine

pub mod handle;
pub mod state;

pub use handle::{
    ErrorCallback, EventKind, HandleOptions, MessageCallback, ShutdownCallback, WorkerHandle,
};
pub use state::{ChannelState, WorkerState};
