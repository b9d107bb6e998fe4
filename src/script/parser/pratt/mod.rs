//! Pratt parser implementation
//! Handles expression parsing with binding power

pub mod led;
pub mod nud;
pub mod precedence;

pub use led::InfixParser;
pub use nud::PrefixParser;
pub use precedence::*;

use crate::script::parser::ast::*;
use crate::script::parser::{ParseError, ParserState};

impl ParserState<'_> {
    /// Parse an expression whose operators bind at least as tightly as `min_bp`
    pub fn parse_expression(
        &mut self,
        min_bp: u8,
    ) -> Result<Expr, ParseError> {
        self.nested(|p| {
            let mut left = p.parse_prefix()?;

            while let Some((left_bp, right_bp, parser_fn)) = p.infix_info() {
                if left_bp < min_bp {
                    break;
                }
                // every infix node wraps `left`, so chains count as nesting
                p.enter()?;
                left = parser_fn(p, left, right_bp)?;
            }

            Ok(left)
        })
    }
}
