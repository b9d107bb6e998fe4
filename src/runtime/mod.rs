//! Worker-side runtime
//!
//! Values, built-ins and the interpreter that executes a generated program
//! inside a spawned context, plus the bootstrap loop that drives it.

pub mod bootstrap;
pub mod builtins;
pub mod errors;
pub mod interpreter;
pub mod value;

pub use errors::RuntimeError;
pub use interpreter::{Interpreter, ScriptHost};
pub use value::Value;
