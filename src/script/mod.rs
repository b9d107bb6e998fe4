//! Worker script language
//!
//! Executables and helpers travel to workers as *source text*, never as live
//! closures. A [`Script`] holds that text; parsing it yields a [`FnDef`] the
//! worker-side interpreter can run. Anything a function needs from the host
//! must arrive through its arguments, since nothing is captured.
//!
//! ```text
//! fn(x) { done('reply', x) }          // executable (anonymous is fine)
//! fn add(a, b) { return a + b; }      // helper (must be named)
//! ```

pub mod lexer;
pub mod parser;
pub mod program;

pub use parser::ast::FnDef;
pub use program::{MethodInfo, Program};

use std::fmt;

/// Error from lexing or parsing script text
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("lex error: {0}")]
    Lex(#[from] lexer::LexError),
    #[error("parse error: {0}")]
    Parse(#[from] parser::ParseError),
}

/// Source text of one worker function
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Script {
    source: String,
}

impl Script {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The exact text that will be embedded in generated programs
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parse as a single function expression
    pub fn parse(&self) -> Result<FnDef, ScriptError> {
        parse_function(&self.source)
    }
}

impl From<&str> for Script {
    fn from(source: &str) -> Self {
        Script::new(source)
    }
}

impl From<String> for Script {
    fn from(source: String) -> Self {
        Script::new(source)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Lex and parse `source` as one function expression
pub fn parse_function(source: &str) -> Result<FnDef, ScriptError> {
    let tokens = lexer::tokenize(source)?;
    Ok(parser::parse_function(&tokens)?)
}
