//! Infix expression parsing (led - left denotation)

use crate::script::lexer::tokens::*;
use crate::script::parser::ast::*;
use crate::script::parser::pratt::precedence::*;
use crate::script::parser::{ParseError, ParserState};

/// Extension trait for infix parsing
pub trait InfixParser {
    /// Parse the infix form at the current token with `lhs` already parsed
    fn parse_infix(
        &mut self,
        lhs: Expr,
    ) -> Result<Expr, ParseError>;
}

type InfixFn<'a> = fn(&mut ParserState<'a>, Expr, u8) -> Result<Expr, ParseError>;

impl<'a> InfixParser for ParserState<'a> {
    fn parse_infix(
        &mut self,
        lhs: Expr,
    ) -> Result<Expr, ParseError> {
        match self.infix_info() {
            Some((_, right_bp, parser_fn)) => parser_fn(self, lhs, right_bp),
            None => Err(self.unexpected()),
        }
    }
}

impl<'a> ParserState<'a> {
    /// Get infix binding powers (left, right) and parser for the current token
    #[inline]
    pub(crate) fn infix_info(&self) -> Option<(u8, u8, InfixFn<'a>)> {
        match self.current_kind() {
            TokenKind::Or => Some((BP_OR, BP_OR + 1, Self::parse_binary)),
            TokenKind::And => Some((BP_AND, BP_AND + 1, Self::parse_binary)),
            TokenKind::EqEq | TokenKind::Neq => Some((BP_EQ, BP_EQ + 1, Self::parse_binary)),
            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => {
                Some((BP_CMP, BP_CMP + 1, Self::parse_binary))
            }
            TokenKind::Plus | TokenKind::Minus => Some((BP_ADD, BP_ADD + 1, Self::parse_binary)),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => {
                Some((BP_MUL, BP_MUL + 1, Self::parse_binary))
            }
            TokenKind::Dot => Some((BP_CALL, BP_CALL + 1, Self::parse_field)),
            TokenKind::LBracket => Some((BP_CALL, BP_CALL + 1, Self::parse_index)),
            TokenKind::LParen => Some((BP_CALL, BP_CALL + 1, Self::reject_call)),
            _ => None,
        }
    }

    fn parse_binary(
        &mut self,
        left: Expr,
        right_bp: u8,
    ) -> Result<Expr, ParseError> {
        let op = match self.current_kind() {
            TokenKind::Or => BinOp::Or,
            TokenKind::And => BinOp::And,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::Neq => BinOp::Neq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Rem,
            _ => return Err(self.unexpected()),
        };
        self.bump();

        let right = self.parse_expression(right_bp)?;
        let span = left.span().to(right.span());

        Ok(Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    fn parse_field(
        &mut self,
        target: Expr,
        _right_bp: u8,
    ) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::Dot)?;
        let (name, end) = self.expect_identifier()?;
        let span = target.span().to(end);
        Ok(Expr::Field {
            target: Box::new(target),
            name,
            span,
        })
    }

    fn parse_index(
        &mut self,
        target: Expr,
        _right_bp: u8,
    ) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LBracket)?;
        let index = self.parse_expression(BP_LOWEST)?;
        let end = self.expect(&TokenKind::RBracket)?;
        let span = target.span().to(end);
        Ok(Expr::Index {
            target: Box::new(target),
            index: Box::new(index),
            span,
        })
    }

    /// Only named helpers and built-ins are callable; `(f)(x)` or `a.b(x)` is not
    fn reject_call(
        &mut self,
        callee: Expr,
        _right_bp: u8,
    ) -> Result<Expr, ParseError> {
        Err(self.message(
            "only helper functions and built-ins can be called by name",
            callee.span(),
        ))
    }
}
