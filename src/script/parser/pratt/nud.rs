//! Prefix expression parsing (nud - null denotation)

use crate::script::lexer::tokens::*;
use crate::script::parser::ast::*;
use crate::script::parser::pratt::precedence::*;
use crate::script::parser::{ParseError, ParserState};

/// Extension trait for prefix parsing
pub trait PrefixParser {
    /// Parse prefix expression at current position
    fn parse_prefix(&mut self) -> Result<Expr, ParseError>;
}

type PrefixFn<'a> = fn(&mut ParserState<'a>) -> Result<Expr, ParseError>;

impl<'a> PrefixParser for ParserState<'a> {
    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        match self.prefix_info() {
            Some(parser_fn) => parser_fn(self),
            None => Err(self.expected("expression")),
        }
    }
}

impl<'a> ParserState<'a> {
    /// Get the prefix parser for the current token
    #[inline]
    pub(crate) fn prefix_info(&self) -> Option<PrefixFn<'a>> {
        match self.current_kind() {
            TokenKind::Minus | TokenKind::Not => Some(Self::parse_unary),
            TokenKind::IntLiteral(_)
            | TokenKind::FloatLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::BoolLiteral(_)
            | TokenKind::NullLiteral => Some(Self::parse_literal),
            TokenKind::Identifier(_) => Some(Self::parse_identifier),
            TokenKind::KwSelf => Some(Self::parse_self),
            TokenKind::LParen => Some(Self::parse_group),
            TokenKind::LBracket => Some(Self::parse_array),
            TokenKind::LBrace => Some(Self::parse_object),
            TokenKind::KwFn => Some(Self::reject_nested_fn),
            _ => None,
        }
    }

    /// Parse unary operator expression
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        let op = match self.current_kind() {
            TokenKind::Minus => UnOp::Neg,
            _ => UnOp::Not,
        };
        self.bump();

        let operand = self.parse_expression(BP_UNARY)?;
        let span = span.to(operand.span());

        Ok(Expr::UnOp {
            op,
            expr: Box::new(operand),
            span,
        })
    }

    fn parse_literal(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        let lit = match self.current_kind().clone() {
            TokenKind::IntLiteral(n) => Literal::Int(n),
            TokenKind::FloatLiteral(f) => Literal::Float(f),
            TokenKind::StringLiteral(s) => Literal::String(s),
            TokenKind::BoolLiteral(b) => Literal::Bool(b),
            TokenKind::NullLiteral => Literal::Null,
            _ => return Err(self.expected("literal")),
        };
        self.bump();
        Ok(Expr::Lit(lit, span))
    }

    /// Variable reference, or a call when directly followed by `(`
    fn parse_identifier(&mut self) -> Result<Expr, ParseError> {
        let (name, span) = self.expect_identifier()?;

        if !self.at(&TokenKind::LParen) {
            return Ok(Expr::Var(name, span));
        }

        self.bump();
        let args = self.parse_comma_list(&TokenKind::RParen, |p| p.parse_expression(BP_LOWEST))?;
        let end = self.expect(&TokenKind::RParen)?;

        Ok(Expr::Call {
            callee: name,
            args,
            span: span.to(end),
        })
    }

    fn parse_self(&mut self) -> Result<Expr, ParseError> {
        let span = self.expect(&TokenKind::KwSelf)?;
        Ok(Expr::SelfRef(span))
    }

    fn parse_group(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let expr = self.parse_expression(BP_LOWEST)?;
        self.expect(&TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::LBracket)?;
        let items =
            self.parse_comma_list(&TokenKind::RBracket, |p| p.parse_expression(BP_LOWEST))?;
        let end = self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Array(items, start.to(end)))
    }

    /// Object literal: `{ key: value, 'quoted key': value }`
    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::LBrace)?;
        let entries = self.parse_comma_list(&TokenKind::RBrace, |p| {
            let key = match p.current_kind().clone() {
                TokenKind::Identifier(name) => name,
                TokenKind::StringLiteral(s) => s,
                _ => return Err(p.expected("object key")),
            };
            p.bump();
            p.expect(&TokenKind::Colon)?;
            let value = p.parse_expression(BP_LOWEST)?;
            Ok((key, value))
        })?;
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Object(entries, start.to(end)))
    }

    fn reject_nested_fn(&mut self) -> Result<Expr, ParseError> {
        Err(self.message(
            "function expressions are only allowed as methods or helpers",
            self.span(),
        ))
    }

    /// Parse `item, item, ...` up to (not including) `close`; trailing comma allowed
    pub(crate) fn parse_comma_list<T, F>(
        &mut self,
        close: &TokenKind,
        mut item: F,
    ) -> Result<Vec<T>, ParseError>
    where
        F: FnMut(&mut Self) -> Result<T, ParseError>,
    {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(item(self)?);
            if !self.skip(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }
}
