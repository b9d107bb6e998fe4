//! Worker bootstrap
//!
//! The loop every spawned context runs: parse the program once, then
//! dispatch each inbound exec request to the named method.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, info_span, warn};

use crate::protocol::{ExecRequest, WorkerEvent, WorkerFault};
use crate::runtime::interpreter::{Interpreter, ScriptHost};
use crate::runtime::value::Value;
use crate::script::Program;

/// How often an idle worker re-checks its termination flag
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Granularity of interruptible `sleep`
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Identity of the running worker, exposed to scripts as `self`
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    pub name: String,
    pub id: u64,
}

/// Worker-side ends of the context's channels
pub struct WorkerIo {
    pub inbox: Receiver<serde_json::Value>,
    pub outbox: Sender<WorkerEvent>,
    pub terminated: Arc<AtomicBool>,
}

/// [`ScriptHost`] backed by the context channels
struct ChannelHost<'a> {
    io: &'a WorkerIo,
    identity: &'a WorkerIdentity,
}

impl ChannelHost<'_> {
    fn emit(
        &self,
        event: WorkerEvent,
    ) {
        // The handle may already be gone; nothing is listening then.
        let _ = self.io.outbox.send(event);
    }
}

impl ScriptHost for ChannelHost<'_> {
    fn post(
        &mut self,
        message: serde_json::Value,
    ) {
        self.emit(WorkerEvent::Message(message));
    }

    fn receiver(&self) -> Value {
        Value::from(serde_json::json!({
            "name": self.identity.name,
            "id": self.identity.id,
        }))
    }

    fn is_terminated(&self) -> bool {
        self.io.terminated.load(Ordering::Acquire)
    }

    fn sleep(
        &mut self,
        duration: Duration,
    ) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_terminated() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    fn log(
        &mut self,
        line: &str,
    ) {
        info!("{}", line);
    }
}

/// Run the worker loop until terminated or the handle drops its sender
pub fn run(
    source: &str,
    identity: WorkerIdentity,
    max_call_depth: usize,
    io: WorkerIo,
) {
    let span = info_span!("worker", name = %identity.name, id = identity.id);
    let _enter = span.enter();

    let mut host = ChannelHost {
        io: &io,
        identity: &identity,
    };

    let program = match Program::parse(source) {
        Ok(program) => Some(program),
        Err(e) => {
            warn!("program failed to load: {}", e);
            host.emit(WorkerEvent::Error(WorkerFault::new(format!(
                "failed to load program: {}",
                e
            ))));
            None
        }
    };
    debug!("worker started");

    loop {
        if host.is_terminated() {
            break;
        }
        let payload = match io.inbox.recv_timeout(POLL_INTERVAL) {
            Ok(payload) => payload,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let Some(program) = &program else {
            continue;
        };
        dispatch(program, max_call_depth, &mut host, &payload);
    }

    debug!("worker stopped");
}

fn dispatch(
    program: &Program,
    max_call_depth: usize,
    host: &mut ChannelHost<'_>,
    payload: &serde_json::Value,
) {
    let request = match ExecRequest::from_payload(payload) {
        None => {
            debug!("ignoring non-exec message");
            return;
        }
        Some(Err(e)) => {
            host.emit(WorkerEvent::Error(WorkerFault::new(format!(
                "malformed exec request: {}",
                e
            ))));
            return;
        }
        Some(Ok(request)) => request,
    };

    let args = request
        .args
        .unwrap_or_default()
        .into_iter()
        .map(Value::from)
        .collect();

    debug!(method = %request.exec, "exec");
    let result = Interpreter::new(program, max_call_depth).invoke(host, &request.exec, args);
    match result {
        Ok(_) => {}
        // Termination is the owner's doing; there is nobody to tell.
        Err(crate::runtime::RuntimeError::Terminated) => {}
        Err(e) => host.emit(WorkerEvent::Error(WorkerFault::in_method(
            e.to_string(),
            request.exec,
        ))),
    }
}
