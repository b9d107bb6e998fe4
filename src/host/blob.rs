//! Staged program text and its object URLs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

/// Content type of generated worker programs
pub const SCRIPT_CONTENT_TYPE: &str = "application/x-worker-script";

const URL_PREFIX: &str = "blob:dynamic-worker/";

/// Immutable bytes plus a content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
    content_type: String,
}

impl Blob {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// A worker program blob
    pub fn script(text: impl Into<String>) -> Self {
        Self::new(text.into().into_bytes(), SCRIPT_CONTENT_TYPE)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_script(&self) -> bool {
        self.content_type == SCRIPT_CONTENT_TYPE
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

/// Transient reference to a registered blob
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    blobs: HashMap<ObjectUrl, Arc<Blob>>,
}

/// Shared table of live object URLs
#[derive(Clone, Default)]
pub struct BlobRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `blob` and hand out a fresh URL for it
    pub fn create_object_url(
        &self,
        blob: Blob,
    ) -> ObjectUrl {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let url = ObjectUrl(format!("{}{}", URL_PREFIX, inner.next_id));
        inner.blobs.insert(url.clone(), Arc::new(blob));
        trace!(%url, "object url created");
        url
    }

    pub fn resolve(
        &self,
        url: &ObjectUrl,
    ) -> Option<Arc<Blob>> {
        self.inner.lock().blobs.get(url).cloned()
    }

    /// Release `url`; returns `false` if it was not live
    pub fn revoke(
        &self,
        url: &ObjectUrl,
    ) -> bool {
        let removed = self.inner.lock().blobs.remove(url).is_some();
        if removed {
            trace!(%url, "object url revoked");
        } else {
            warn!(%url, "revoking an object url that is not live");
        }
        removed
    }

    /// Number of URLs created and not yet revoked
    pub fn live_count(&self) -> usize {
        self.inner.lock().blobs.len()
    }
}

impl fmt::Debug for BlobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}
