//! Host worker primitive
//!
//! Blobs of program text, the object URLs that reference them while a worker
//! is alive, and the spawners that turn program text into a live context.

pub mod blob;
pub mod spawner;

pub use blob::{Blob, BlobRegistry, ObjectUrl, SCRIPT_CONTENT_TYPE};
pub use spawner::{Context, ContextClosed, SpawnError, SpawnRequest, Spawner, ThreadSpawner};
