//! Worker images

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::codegen::{self, GenerateError};
use crate::protocol::WorkerFault;
use crate::script::Script;
use crate::worker::{ErrorCallback, MessageCallback};

/// A named program plus the callbacks every instance gets
#[derive(Clone)]
pub struct Image {
    name: String,
    code: String,
    use_channels: bool,
    pub(crate) on_message: Option<MessageCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl Image {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generated program text
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn use_channels(&self) -> bool {
        self.use_channels
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("name", &self.name)
            .field("code_len", &self.code.len())
            .field("use_channels", &self.use_channels)
            .field("on_message", &self.on_message.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Everything needed to register an image
///
/// ```
/// use dynamic_workers::manager::ImageSpec;
///
/// let spec = ImageSpec::new("echo")
///     .method("reply", "fn(x) { done('reply', x) }")
///     .helper("fn twice(x) { return x * 2; }")
///     .use_channels(false);
/// assert_eq!(spec.name(), "echo");
/// ```
#[derive(Clone, Default)]
pub struct ImageSpec {
    name: String,
    executables: IndexMap<String, Script>,
    helpers: Vec<Script>,
    on_message: Option<MessageCallback>,
    on_error: Option<ErrorCallback>,
    use_channels: bool,
}

impl ImageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a dispatchable method; re-adding a name replaces it in place
    pub fn method(
        mut self,
        name: impl Into<String>,
        source: impl Into<Script>,
    ) -> Self {
        self.executables.insert(name.into(), source.into());
        self
    }

    pub fn methods(
        mut self,
        executables: IndexMap<String, Script>,
    ) -> Self {
        self.executables.extend(executables);
        self
    }

    pub fn helper(
        mut self,
        source: impl Into<Script>,
    ) -> Self {
        self.helpers.push(source.into());
        self
    }

    pub fn helpers(
        mut self,
        helpers: impl IntoIterator<Item = Script>,
    ) -> Self {
        self.helpers.extend(helpers);
        self
    }

    pub fn on_message(
        mut self,
        callback: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Arc::new(callback));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl Fn(&WorkerFault) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub(crate) fn callbacks(
        mut self,
        on_message: Option<MessageCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        self.on_message = on_message;
        self.on_error = on_error;
        self
    }

    pub fn use_channels(
        mut self,
        use_channels: bool,
    ) -> Self {
        self.use_channels = use_channels;
        self
    }

    /// Generate the program text
    pub fn generate(&self) -> Result<String, GenerateError> {
        codegen::generate_code(&self.name, &self.executables, &self.helpers)
    }

    /// Generate and freeze into an [`Image`]
    pub fn build(self) -> Result<Image, GenerateError> {
        let code = self.generate()?;
        Ok(Image {
            name: self.name,
            code,
            use_channels: self.use_channels,
            on_message: self.on_message,
            on_error: self.on_error,
        })
    }
}
