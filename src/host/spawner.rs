//! Execution contexts and the spawners that create them

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::protocol::WorkerEvent;
use crate::runtime::bootstrap::{self, WorkerIdentity, WorkerIo};
use crate::util::config::WorkerConfig;

/// Failure to produce a live context
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("worker limit reached ({max} live workers)")]
    Limit { max: usize },
    #[error("failed to spawn worker thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// The context has stopped accepting messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("execution context is closed")]
pub struct ContextClosed;

/// What a spawner needs to start one worker
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub name: String,
    pub id: u64,
    pub source: String,
}

/// Produces live execution contexts
pub trait Spawner: Send + Sync {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Result<Context, SpawnError>;
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Host side of a live execution context
pub struct Context {
    inbox: Sender<serde_json::Value>,
    events: Receiver<WorkerEvent>,
    terminated: Arc<AtomicBool>,
    on_terminate: Mutex<Option<ReleaseFn>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Context {
    /// Wrap channel ends that some worker loop is serving
    pub fn new(
        inbox: Sender<serde_json::Value>,
        events: Receiver<WorkerEvent>,
        terminated: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inbox,
            events,
            terminated,
            on_terminate: Mutex::new(None),
            thread: None,
        }
    }

    /// Run `release` once, when the context is first terminated
    pub fn on_terminate(
        self,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        *self.on_terminate.lock() = Some(Box::new(release));
        self
    }

    fn with_thread(
        mut self,
        thread: thread::JoinHandle<()>,
    ) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Send a structured message; delivered in send order
    pub fn post(
        &self,
        message: serde_json::Value,
    ) -> Result<(), ContextClosed> {
        if self.is_terminated() {
            return Err(ContextClosed);
        }
        self.inbox.send(message).map_err(|_| ContextClosed)
    }

    pub fn try_recv(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Option<WorkerEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Stop the context. The worker abandons its current call at the next
    /// statement; the thread is not joined.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(release) = self.on_terminate.lock().take() {
            release();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Whether the serving thread is still running, when there is one
    pub fn is_alive(&self) -> bool {
        match &self.thread {
            Some(thread) => !thread.is_finished(),
            None => !self.is_terminated(),
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// One OS thread per worker
pub struct ThreadSpawner {
    max_workers: Option<usize>,
    stack_size: usize,
    thread_name_prefix: String,
    max_call_depth: usize,
    active: Arc<AtomicUsize>,
}

impl ThreadSpawner {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            max_workers: config.max_workers,
            stack_size: config.stack_size,
            thread_name_prefix: config.thread_name_prefix.clone(),
            max_call_depth: config.max_call_depth,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Contexts spawned and not yet terminated
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn acquire_slot(&self) -> Result<(), SpawnError> {
        let max = self.max_workers.unwrap_or(usize::MAX);
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then(|| n + 1)
            })
            .map(|_| ())
            .map_err(|_| SpawnError::Limit { max })
    }

    fn release_slot(active: &AtomicUsize) {
        active.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new(&WorkerConfig::default())
    }
}

impl Spawner for ThreadSpawner {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Result<Context, SpawnError> {
        if let Err(e) = self.acquire_slot() {
            warn!(worker = %request.name, "{}", e);
            return Err(e);
        }

        let (inbox_tx, inbox_rx) = channel::unbounded();
        let (events_tx, events_rx) = channel::unbounded();
        let terminated = Arc::new(AtomicBool::new(false));

        let io = WorkerIo {
            inbox: inbox_rx,
            outbox: events_tx,
            terminated: terminated.clone(),
        };
        let identity = WorkerIdentity {
            name: request.name.clone(),
            id: request.id,
        };
        let max_call_depth = self.max_call_depth;
        let source = request.source;

        let thread_name = format!("{}-{}-{}", self.thread_name_prefix, request.name, request.id);
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .stack_size(self.stack_size)
            .spawn(move || bootstrap::run(&source, identity, max_call_depth, io));

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                Self::release_slot(&self.active);
                return Err(SpawnError::Thread(e));
            }
        };
        debug!(thread = %thread_name, "spawned worker thread");

        let active = self.active.clone();
        Ok(Context::new(inbox_tx, events_rx, terminated)
            .with_thread(thread)
            .on_terminate(move || Self::release_slot(&active)))
    }
}
