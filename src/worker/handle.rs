//! Worker handle
//!
//! Owns one live execution context and the object URL it was started from.
//! Events are delivered on the thread that calls [`WorkerHandle::poll`] or
//! [`WorkerHandle::wait`], never on the worker thread.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::host::{Blob, BlobRegistry, Context, ObjectUrl, SpawnError, SpawnRequest, Spawner};
use crate::protocol::{ExecRequest, WorkerEvent, WorkerFault, WorkerMessage};
use crate::worker::state::{ChannelState, WorkerState};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Callback for `message` events
pub type MessageCallback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Callback for `error` events
pub type ErrorCallback = Arc<dyn Fn(&WorkerFault) + Send + Sync>;

/// Optional completion callback for [`WorkerHandle::shutdown`]
pub type ShutdownCallback<'a> = Box<dyn FnOnce() + 'a>;

/// Event names accepted by [`WorkerHandle::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Error,
}

impl FromStr for EventKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(EventKind::Message),
            "error" => Ok(EventKind::Error),
            other => Err(WorkerError::UnknownEvent(other.to_string())),
        }
    }
}

/// Settings for a new handle
#[derive(Debug, Clone, Default)]
pub struct HandleOptions {
    /// Image name, used for logs and thread names
    pub name: String,
    pub use_channels: bool,
}

/// A running (or failed) worker
pub struct WorkerHandle {
    id: u64,
    name: String,
    blobs: BlobRegistry,
    url: Option<ObjectUrl>,
    context: Option<Context>,
    state: WorkerState,
    channel: ChannelState,
    use_channels: bool,
    failure: Option<SpawnError>,
    on_message: MessageCallback,
    on_error: ErrorCallback,
}

impl WorkerHandle {
    /// Stage `blob`, spawn a context from it and wrap it
    ///
    /// Spawn failure does not return an error: the handle comes back in
    /// [`WorkerState::Failure`] with the reason in [`WorkerHandle::failure`].
    pub fn create(
        blobs: &BlobRegistry,
        spawner: &dyn Spawner,
        blob: Blob,
        options: HandleOptions,
    ) -> Result<Self, WorkerError> {
        if !blob.is_script() {
            return Err(WorkerError::Construction(format!(
                "unexpected content type {:?}",
                blob.content_type()
            )));
        }
        let source = blob
            .text()
            .map_err(|e| WorkerError::Construction(format!("program is not UTF-8: {}", e)))?
            .to_string();

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let url = blobs.create_object_url(blob);

        let request = SpawnRequest {
            name: options.name.clone(),
            id,
            source,
        };
        let (context, state, failure) = match spawner.spawn(request) {
            Ok(context) => (Some(context), WorkerState::Idle, None),
            Err(e) => {
                warn!(worker = %options.name, id, "spawn failed: {}", e);
                (None, WorkerState::Failure, Some(e))
            }
        };
        debug!(worker = %options.name, id, %url, %state, "handle created");

        let name = options.name;
        Ok(Self {
            id,
            on_message: default_message_callback(name.clone()),
            on_error: default_error_callback(name.clone()),
            name,
            blobs: blobs.clone(),
            url: Some(url),
            context,
            state,
            channel: ChannelState::Unconnected,
            use_channels: options.use_channels,
            failure,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Object URL the handle was started from, until shutdown
    pub fn url(&self) -> Option<&ObjectUrl> {
        self.url.as_ref()
    }

    pub fn channel(&self) -> &ChannelState {
        &self.channel
    }

    pub fn use_channels(&self) -> bool {
        self.use_channels
    }

    /// Why the spawn failed, for a handle in [`WorkerState::Failure`]
    pub fn failure(&self) -> Option<&SpawnError> {
        self.failure.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.context
            .as_ref()
            .map(|ctx| !ctx.is_terminated())
            .unwrap_or(false)
    }

    /// Bind a callback by event name; the last binding wins
    pub fn on<F>(
        &mut self,
        event: &str,
        callback: F,
    ) -> Result<(), WorkerError>
    where
        F: Fn(&WorkerEvent) + Send + Sync + 'static,
    {
        match event.parse::<EventKind>()? {
            EventKind::Message => {
                self.on_message = Arc::new(move |payload: &serde_json::Value| {
                    callback(&WorkerEvent::Message(payload.clone()))
                });
            }
            EventKind::Error => {
                self.on_error = Arc::new(move |fault: &WorkerFault| {
                    callback(&WorkerEvent::Error(fault.clone()))
                });
            }
        }
        Ok(())
    }

    pub fn on_message(
        &mut self,
        callback: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) {
        self.on_message = Arc::new(callback);
    }

    pub fn on_error(
        &mut self,
        callback: impl Fn(&WorkerFault) + Send + Sync + 'static,
    ) {
        self.on_error = Arc::new(callback);
    }

    /// Bind shared callbacks, keeping the logging defaults for any left out
    pub(crate) fn bind(
        &mut self,
        on_message: Option<MessageCallback>,
        on_error: Option<ErrorCallback>,
    ) {
        if let Some(callback) = on_message {
            self.on_message = callback;
        }
        if let Some(callback) = on_error {
            self.on_error = callback;
        }
    }

    /// Mark both handles as wanting a channel between them
    ///
    /// No data moves yet; both sides become [`ChannelState::Pending`].
    pub fn connect_to(
        &mut self,
        other: &mut WorkerHandle,
    ) -> Result<(), WorkerError> {
        self.check_channels()?;
        other.check_channels()?;
        self.channel = ChannelState::Pending { peer: other.id };
        other.channel = ChannelState::Pending { peer: self.id };
        info!(from = self.id, to = other.id, "channel pending");
        Ok(())
    }

    pub(crate) fn check_channels(&self) -> Result<(), WorkerError> {
        if self.use_channels {
            Ok(())
        } else {
            Err(WorkerError::ChannelsDisabled(self.name.clone()))
        }
    }

    pub(crate) fn set_channel(
        &mut self,
        channel: ChannelState,
    ) {
        self.channel = channel;
    }

    /// Post `{exec, args}`; the state becomes BUSY unless it is ERROR
    pub fn exec(
        &mut self,
        method: &str,
        args: Option<Vec<serde_json::Value>>,
    ) -> Result<(), WorkerError> {
        if self.state == WorkerState::Failure {
            return Err(WorkerError::NotRunning(self.id));
        }
        let context = self
            .context
            .as_ref()
            .ok_or(WorkerError::NotRunning(self.id))?;
        context
            .post(ExecRequest::new(method, args).to_payload())
            .map_err(|_| WorkerError::NotRunning(self.id))?;
        self.state = self.state.on_exec();
        debug!(worker = %self.name, id = self.id, method, state = %self.state, "exec");
        Ok(())
    }

    /// Deliver every pending event; returns how many were delivered
    pub fn poll(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.context.as_ref().and_then(Context::try_recv) {
            self.deliver(event);
            delivered += 1;
        }
        delivered
    }

    /// Block up to `timeout` for one event, then drain the rest
    pub fn wait(
        &mut self,
        timeout: Duration,
    ) -> bool {
        let first = self
            .context
            .as_ref()
            .and_then(|ctx| ctx.recv_timeout(timeout));
        match first {
            Some(event) => {
                self.deliver(event);
                self.poll();
                true
            }
            None => false,
        }
    }

    /// Deliver events until the handle leaves BUSY or `timeout` elapses
    pub fn wait_idle(
        &mut self,
        timeout: Duration,
    ) -> WorkerState {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.state == WorkerState::Busy {
            let now = Instant::now();
            if now >= deadline || !self.wait(deadline - now) {
                break;
            }
        }
        self.state
    }

    fn deliver(
        &mut self,
        event: WorkerEvent,
    ) {
        match event {
            WorkerEvent::Message(payload) => {
                if WorkerMessage::from_payload(&payload).is_some() {
                    self.state = self.state.on_done();
                }
                (self.on_message)(&payload);
            }
            WorkerEvent::Error(fault) => {
                self.state = self.state.on_error();
                (self.on_error)(&fault);
            }
        }
    }

    /// Terminate the context, release the object URL, then run `callback`
    pub fn shutdown(
        mut self,
        callback: Option<ShutdownCallback<'_>>,
    ) {
        self.release();
        info!(worker = %self.name, id = self.id, "worker shut down");
        if let Some(callback) = callback {
            callback();
        }
    }

    fn release(&mut self) {
        if let Some(context) = self.context.take() {
            context.terminate();
        }
        if let Some(url) = self.url.take() {
            self.blobs.revoke(&url);
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("url", &self.url)
            .field("channel", &self.channel)
            .finish()
    }
}

fn default_message_callback(name: String) -> MessageCallback {
    Arc::new(move |payload: &serde_json::Value| {
        debug!(worker = %name, %payload, "unhandled worker message");
    })
}

fn default_error_callback(name: String) -> ErrorCallback {
    Arc::new(move |fault: &WorkerFault| {
        error!(worker = %name, "unhandled worker error: {}", fault);
    })
}
