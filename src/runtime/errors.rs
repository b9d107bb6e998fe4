//! Errors raised while running worker scripts

/// Runtime errors inside a worker
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),
    #[error("{function}() expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },
    #[error("type error: {0}")]
    Type(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in '{0}'")]
    IntegerOverflow(&'static str),
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("maximum call depth {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("'{0}' outside of a loop")]
    StrayControlFlow(&'static str),
    #[error("{0}")]
    Failed(String),
    #[error("worker terminated")]
    Terminated,
}

impl RuntimeError {
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::Type(message.into())
    }
}
