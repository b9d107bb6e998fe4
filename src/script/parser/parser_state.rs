//! 解析器状态与错误处理

use crate::script::lexer::tokens::*;
use crate::util::span::Span;

/// 解析错误类型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Expected a specific token
    #[error("expected {expected}, found {found} at {}", .span.start)]
    ExpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    /// Unexpected token encountered
    #[error("unexpected {found} at {}", .span.start)]
    UnexpectedToken { found: String, span: Span },
    /// Anything else, with a message
    #[error("{message} at {}", .span.start)]
    Message { message: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::ExpectedToken { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::Message { span, .. } => *span,
        }
    }
}

/// 脚本允许的最大块/表达式嵌套层数
pub const MAX_NESTING: usize = 256;

/// Parser state for Pratt parsing
pub struct ParserState<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> ParserState<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Go one nesting level deeper
    pub fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.message(
                format!("nesting exceeds {} levels", MAX_NESTING),
                self.span(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one level deeper, restoring the depth afterwards
    pub fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let entry = self.depth;
        let result = self.enter().and_then(|()| f(self));
        self.depth = entry;
        result
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
            || matches!(self.current().map(|t| &t.kind), Some(TokenKind::Eof))
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    pub fn current_kind(&self) -> &TokenKind {
        self.current().map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    pub fn span(&self) -> Span {
        self.current()
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(Span::dummy())
    }

    /// Span of the most recently consumed token
    pub fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or(Span::dummy())
    }

    pub fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    pub fn at(
        &self,
        kind: &TokenKind,
    ) -> bool {
        self.current_kind() == kind
    }

    pub fn skip(
        &mut self,
        kind: &TokenKind,
    ) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect(
        &mut self,
        kind: &TokenKind,
    ) -> Result<Span, ParseError> {
        if self.at(kind) {
            let span = self.span();
            self.bump();
            Ok(span)
        } else {
            Err(self.expected(&kind.describe()))
        }
    }

    /// Consume an identifier and return its name
    pub fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        match self.current_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.span();
                self.bump();
                Ok((name, span))
            }
            _ => Err(self.expected("identifier")),
        }
    }

    /// Build an "expected X, found <current>" error
    pub fn expected(
        &self,
        what: &str,
    ) -> ParseError {
        ParseError::ExpectedToken {
            expected: what.to_string(),
            found: self.current_kind().describe(),
            span: self.span(),
        }
    }

    /// Build an "unexpected <current>" error
    pub fn unexpected(&self) -> ParseError {
        ParseError::UnexpectedToken {
            found: self.current_kind().describe(),
            span: self.span(),
        }
    }

    pub fn message(
        &self,
        message: impl Into<String>,
        span: Span,
    ) -> ParseError {
        ParseError::Message {
            message: message.into(),
            span,
        }
    }
}
