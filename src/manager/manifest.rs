//! TOML image manifests
//!
//! ```toml
//! name = "echo"
//! use_channels = false
//! helpers = ["fn twice(x) { return x * 2; }"]
//!
//! [methods]
//! reply = "fn(x) { done('reply', x) }"
//! double = "fn(x) { done('double', twice(x)) }"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::manager::image::ImageSpec;
use crate::script::Script;

/// Manifest loading errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
}

/// An image described on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageManifest {
    pub name: String,
    #[serde(default)]
    pub use_channels: bool,
    #[serde(default)]
    pub helpers: Vec<Script>,
    /// Method table; file order is preserved
    #[serde(default)]
    pub methods: IndexMap<String, Script>,
}

impl ImageManifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Image spec without callbacks
    pub fn to_spec(&self) -> ImageSpec {
        ImageSpec::new(self.name.clone())
            .methods(self.methods.clone())
            .helpers(self.helpers.iter().cloned())
            .use_channels(self.use_channels)
    }
}
