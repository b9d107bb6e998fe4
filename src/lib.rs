//! Dynamic Workers
//!
//! Named worker images generated from scripts, started as background
//! execution contexts and driven by name.
//!
//! # Example
//!
//! ```no_run
//! use dynamic_workers::manager::{ImageSpec, WorkerManager};
//! use dynamic_workers::util::config::WorkerConfig;
//! use std::time::Duration;
//!
//! fn main() -> dynamic_workers::Result<()> {
//!     let mut manager = WorkerManager::new(WorkerConfig::default());
//!     manager.create_image(
//!         ImageSpec::new("echo")
//!             .method("reply", "fn(x) { done('reply', x) }")
//!             .on_message(|payload| println!("{}", payload)),
//!     )?;
//!     manager.start("echo")?;
//!     manager.exec("echo", "reply", Some(vec![42.into()]))?;
//!     manager.wait_idle("echo", Duration::from_secs(1))?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/dynamic-workers")]
#![warn(rust_2018_idioms)]

pub mod codegen;
pub mod error;
pub mod host;
pub mod manager;
pub mod protocol;
pub mod runtime;
pub mod script;
pub mod worker;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use codegen::{generate_code, GenerateError};
pub use error::{Missing, WorkerError};
pub use manager::{Image, ImageManifest, ImageSpec, WorkerManager};
pub use protocol::{WorkerEvent, WorkerFault};
pub use script::Script;
pub use worker::{WorkerHandle, WorkerState};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::script::Program;
use crate::util::config::WorkerConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "dynamic-workers";

/// What a worker produced for one [`run_manifest`] call
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Every message payload, in delivery order
    pub replies: Vec<serde_json::Value>,
    pub errors: Vec<WorkerFault>,
    /// State when the run stopped waiting
    pub state: WorkerState,
}

/// Generate the program text for the image described by `path`
pub fn generate_manifest(path: &Path) -> Result<String> {
    let manifest = ImageManifest::load(path)?;
    let code = manifest
        .to_spec()
        .generate()
        .with_context(|| format!("Failed to generate image \"{}\"", manifest.name))?;
    Ok(code)
}

/// Parse generated program text, as a worker would on start-up
pub fn check_program(path: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program: {}", path.display()))?;
    let program = Program::parse(&source)
        .with_context(|| format!("Invalid program: {}", path.display()))?;
    Ok(program)
}

/// Start the image in `path`, run one method and collect what comes back
///
/// Waits until the worker leaves BUSY or `timeout` elapses, then shuts down.
pub fn run_manifest(
    path: &Path,
    method: &str,
    args: Option<Vec<serde_json::Value>>,
    config: WorkerConfig,
    timeout: Duration,
) -> Result<RunOutcome> {
    let manifest = ImageManifest::load(path)?;
    let name = manifest.name.clone();

    let replies = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let reply_sink = replies.clone();
    let error_sink = errors.clone();

    let mut manager = WorkerManager::new(config);
    manager.create_image(
        manifest
            .to_spec()
            .on_message(move |payload| reply_sink.lock().push(payload.clone()))
            .on_error(move |fault| error_sink.lock().push(fault.clone())),
    )?;
    manager.start(&name)?;
    manager.exec(&name, method, args)?;
    debug!(image = %name, method, "waiting for replies");
    let state = manager.wait_idle(&name, timeout)?;
    manager.shutdown(&name);

    let replies = std::mem::take(&mut *replies.lock());
    let errors = std::mem::take(&mut *errors.lock());
    Ok(RunOutcome {
        replies,
        errors,
        state,
    })
}
