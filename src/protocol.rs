//! Host/worker message shapes
//!
//! Messages cross the thread boundary as `serde_json::Value`. The two shapes
//! the runtime itself understands are the exec request sent by a handle and
//! the done reply posted by `done(...)` inside a worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Host → worker: run `exec` with `args`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub exec: String,
    #[serde(default)]
    pub args: Option<Vec<Value>>,
}

impl ExecRequest {
    pub fn new(
        exec: impl Into<String>,
        args: Option<Vec<Value>>,
    ) -> Self {
        Self {
            exec: exec.into(),
            args,
        }
    }

    pub fn to_payload(&self) -> Value {
        let mut payload = serde_json::Map::new();
        payload.insert("exec".to_string(), Value::String(self.exec.clone()));
        let args = match &self.args {
            Some(args) => Value::Array(args.clone()),
            None => Value::Null,
        };
        payload.insert("args".to_string(), args);
        Value::Object(payload)
    }

    /// `None` when the payload carries no `exec` field; such messages are ignored
    pub fn from_payload(payload: &Value) -> Option<Result<Self, serde_json::Error>> {
        let object = payload.as_object()?;
        if !object.contains_key("exec") {
            return None;
        }
        Some(serde_json::from_value(payload.clone()))
    }
}

/// Worker → host: `{fn, response}` posted by `done(...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMessage {
    #[serde(rename = "fn")]
    pub method: String,
    pub response: Vec<Value>,
}

impl WorkerMessage {
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "fn": self.method,
            "response": self.response,
        })
    }

    /// Recognise a done-shaped payload
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;
        let method = object.get("fn")?.as_str()?;
        let response = object.get("response")?.as_array()?;
        Some(Self {
            method: method.to_string(),
            response: response.clone(),
        })
    }
}

/// An error raised inside a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
    pub message: String,
    /// Method that was executing, if any
    pub method: Option<String>,
}

impl WorkerFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            method: None,
        }
    }

    pub fn in_method(
        message: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            method: Some(method.into()),
        }
    }
}

impl fmt::Display for WorkerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{} (in '{}')", self.message, method),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for WorkerFault {}

/// Events delivered from a worker to its handle, in send order
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Message(Value),
    Error(WorkerFault),
}
