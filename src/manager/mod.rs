//! Image registry and lifecycle manager
//!
//! A [`WorkerManager`] keeps two name-keyed tables: registered images and the
//! live worker started from each. It is an ordinary value owned by the host
//! application; wrap it in a mutex to share it between threads.
//!
//! ```no_run
//! use dynamic_workers::manager::{ImageSpec, WorkerManager};
//! use dynamic_workers::util::config::WorkerConfig;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), dynamic_workers::WorkerError> {
//! let mut manager = WorkerManager::new(WorkerConfig::default());
//! manager.create_image(
//!     ImageSpec::new("echo")
//!         .method("reply", "fn(x) { done('reply', x) }")
//!         .on_message(|payload| println!("{}", payload)),
//! )?;
//! manager.start("echo")?;
//! manager.exec("echo", "reply", Some(vec![42.into()]))?;
//! manager.wait("echo", Duration::from_secs(1))?;
//! manager.shutdown("echo");
//! # Ok(())
//! # }
//! ```

pub mod image;
pub mod manifest;

pub use image::{Image, ImageSpec};
pub use manifest::{ImageManifest, ManifestError};

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::host::{Blob, BlobRegistry, SpawnError, Spawner, ThreadSpawner};
use crate::script::Script;
use crate::util::config::WorkerConfig;
use crate::worker::{
    ChannelState, ErrorCallback, HandleOptions, MessageCallback, WorkerHandle, WorkerState,
};

/// Registry of images and their running workers
pub struct WorkerManager {
    config: WorkerConfig,
    spawner: Arc<dyn Spawner>,
    blobs: BlobRegistry,
    images: IndexMap<String, Image>,
    workers: IndexMap<String, WorkerHandle>,
}

impl WorkerManager {
    /// Manager spawning one thread per worker
    pub fn new(config: WorkerConfig) -> Self {
        let spawner = Arc::new(ThreadSpawner::new(&config));
        Self::with_spawner(config, spawner)
    }

    pub fn with_spawner(
        config: WorkerConfig,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        Self {
            config,
            spawner,
            blobs: BlobRegistry::new(),
            images: IndexMap::new(),
            workers: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Object URLs staged for running workers
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Generate and register an image; an existing image of that name is replaced
    pub fn create_image(
        &mut self,
        spec: ImageSpec,
    ) -> Result<(), WorkerError> {
        let image = spec.build()?;
        let name = image.name().to_string();
        if self.images.insert(name.clone(), image).is_some() {
            info!(image = %name, "image replaced");
        } else {
            info!(image = %name, "image created");
        }
        Ok(())
    }

    /// Positional form of [`WorkerManager::create_image`]
    pub fn create_image_with(
        &mut self,
        name: &str,
        executables: IndexMap<String, Script>,
        helpers: Vec<Script>,
        on_message: Option<MessageCallback>,
        on_error: Option<ErrorCallback>,
        use_channels: bool,
    ) -> Result<(), WorkerError> {
        self.create_image(
            ImageSpec::new(name)
                .methods(executables)
                .helpers(helpers)
                .callbacks(on_message, on_error)
                .use_channels(use_channels),
        )
    }

    pub fn image(
        &self,
        name: &str,
    ) -> Option<&Image> {
        self.images.get(name)
    }

    pub fn has_image(
        &self,
        name: &str,
    ) -> bool {
        self.images.contains_key(name)
    }

    /// Registered image names in registration order
    pub fn image_names(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// Names with a live worker
    pub fn running(&self) -> impl Iterator<Item = &str> {
        self.workers.keys().map(String::as_str)
    }

    /// Start a worker from image `name`
    ///
    /// A worker already running under `name` keeps running until its
    /// replacement has spawned, then is shut down. When the spawner is at its
    /// worker limit the old worker is shut down first to free its slot, so a
    /// failed retry leaves no worker under `name`. If no context can be
    /// spawned nothing new is registered.
    pub fn start(
        &mut self,
        name: &str,
    ) -> Result<(), WorkerError> {
        let image = self
            .images
            .get(name)
            .ok_or_else(|| WorkerError::image_not_found(name))?;
        let blobs = &self.blobs;
        let spawner = self.spawner.as_ref();
        let spawn = || {
            WorkerHandle::create(
                blobs,
                spawner,
                Blob::script(image.code()),
                HandleOptions {
                    name: name.to_string(),
                    use_channels: image.use_channels(),
                },
            )
        };

        let mut handle = spawn()?;
        let at_limit = matches!(handle.failure(), Some(SpawnError::Limit { .. }));
        if handle.state() == WorkerState::Failure && at_limit && self.workers.contains_key(name) {
            if let Some(previous) = self.workers.shift_remove(name) {
                warn!(worker = name, id = previous.id(), "worker limit reached, stopping old worker first");
                previous.shutdown(None);
            }
            handle.shutdown(None);
            handle = spawn()?;
        }

        if handle.state() == WorkerState::Failure {
            let reason = handle
                .failure()
                .map(ToString::to_string)
                .unwrap_or_else(|| "spawn failed".to_string());
            handle.shutdown(None);
            return Err(WorkerError::Spawn {
                name: name.to_string(),
                reason,
            });
        }

        if let Some(previous) = self.workers.shift_remove(name) {
            warn!(worker = name, id = previous.id(), "replacing running worker");
            previous.shutdown(None);
        }

        handle.bind(image.on_message.clone(), image.on_error.clone());
        info!(worker = name, id = handle.id(), "worker started");
        self.workers.insert(name.to_string(), handle);
        Ok(())
    }

    /// Shut down the worker running under `name`; a no-op when there is none
    pub fn shutdown(
        &mut self,
        name: &str,
    ) -> bool {
        match self.workers.shift_remove(name) {
            Some(handle) => {
                handle.shutdown(None);
                true
            }
            None => false,
        }
    }

    pub fn shutdown_all(&mut self) {
        for (_, handle) in self.workers.drain(..) {
            handle.shutdown(None);
        }
    }

    /// Run `method` on the worker running under `name`
    pub fn exec(
        &mut self,
        name: &str,
        method: &str,
        args: Option<Vec<serde_json::Value>>,
    ) -> Result<(), WorkerError> {
        self.worker_mut(name)?.exec(method, args)
    }

    /// State of the worker running under `name`
    pub fn get_state(
        &self,
        name: &str,
    ) -> Option<WorkerState> {
        self.workers.get(name).map(WorkerHandle::state)
    }

    pub fn worker(
        &self,
        name: &str,
    ) -> Option<&WorkerHandle> {
        self.workers.get(name)
    }

    fn worker_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut WorkerHandle, WorkerError> {
        self.workers
            .get_mut(name)
            .ok_or_else(|| WorkerError::not_running(name))
    }

    /// Mark a pending channel between two running workers
    pub fn connect(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<(), WorkerError> {
        let (from_id, to_id) = {
            let a = self
                .workers
                .get(from)
                .ok_or_else(|| WorkerError::not_running(from))?;
            let b = self
                .workers
                .get(to)
                .ok_or_else(|| WorkerError::not_running(to))?;
            a.check_channels()?;
            b.check_channels()?;
            (a.id(), b.id())
        };
        self.worker_mut(from)?
            .set_channel(ChannelState::Pending { peer: to_id });
        self.worker_mut(to)?
            .set_channel(ChannelState::Pending { peer: from_id });
        info!(from, to, "channel pending");
        Ok(())
    }

    /// Deliver pending events of every worker
    pub fn poll(&mut self) -> usize {
        self.workers.values_mut().map(WorkerHandle::poll).sum()
    }

    /// Wait up to `timeout` for an event from `name`
    pub fn wait(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<bool, WorkerError> {
        Ok(self.worker_mut(name)?.wait(timeout))
    }

    /// Deliver events from `name` until it is no longer BUSY or `timeout` elapses
    pub fn wait_idle(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<WorkerState, WorkerError> {
        Ok(self.worker_mut(name)?.wait_idle(timeout))
    }
}

impl Drop for WorkerManager {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}
