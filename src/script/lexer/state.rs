//! Keyword recognition

use crate::script::lexer::tokens::TokenKind;

/// Convert an identifier-shaped word to its keyword token, if it is one
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "fn" => Some(TokenKind::KwFn),
        "let" => Some(TokenKind::KwLet),

        // Control flow keywords
        "if" => Some(TokenKind::KwIf),
        "else" => Some(TokenKind::KwElse),
        "while" => Some(TokenKind::KwWhile),
        "for" => Some(TokenKind::KwFor),
        "in" => Some(TokenKind::KwIn),
        "return" => Some(TokenKind::KwReturn),
        "break" => Some(TokenKind::KwBreak),
        "continue" => Some(TokenKind::KwContinue),

        // Receiver of the dispatched call
        "self" => Some(TokenKind::KwSelf),

        "true" => Some(TokenKind::BoolLiteral(true)),
        "false" => Some(TokenKind::BoolLiteral(false)),
        "null" => Some(TokenKind::NullLiteral),

        _ => None,
    }
}
