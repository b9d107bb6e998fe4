//! Parser module
//!
//! Pratt parser for worker scripts. Entry points parse a single function
//! expression (an executable or helper) or a bare expression.

pub mod ast;
pub mod parser_state;
pub mod pratt;
pub mod statements;

pub use ast::*;
pub use parser_state::{ParseError, ParserState};
pub use pratt::BP_LOWEST;
pub use statements::StatementParser;

use crate::script::lexer::tokens::*;

/// Parse tokens holding exactly one function expression
pub fn parse_function(tokens: &[Token]) -> Result<FnDef, ParseError> {
    let mut state = ParserState::new(tokens);
    let def = state.parse_function()?;
    if !state.at_end() {
        return Err(state.expected("end of function"));
    }
    Ok(def)
}

/// Parse tokens holding exactly one expression
pub fn parse_expression(tokens: &[Token]) -> Result<Expr, ParseError> {
    let mut state = ParserState::new(tokens);
    let expr = state.parse_expression(BP_LOWEST)?;
    if !state.at_end() {
        return Err(state.unexpected());
    }
    Ok(expr)
}

#[cfg(test)]
mod tests;
