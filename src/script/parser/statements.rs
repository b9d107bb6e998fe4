//! Statement, block and function parsing

use crate::script::lexer::tokens::*;
use crate::script::parser::ast::*;
use crate::script::parser::pratt::BP_LOWEST;
use crate::script::parser::{ParseError, ParserState};
use crate::util::Spanned;

/// Extension trait for statement-level parsing
pub trait StatementParser {
    /// Parse one statement
    fn parse_statement(&mut self) -> Result<Stmt, ParseError>;
    /// Parse `{ stmt* }`
    fn parse_block(&mut self) -> Result<Block, ParseError>;
    /// Parse `fn [name](params) { body }`
    fn parse_function(&mut self) -> Result<FnDef, ParseError>;
}

impl<'a> StatementParser for ParserState<'a> {
    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current_kind() {
            TokenKind::KwLet => self.parse_let(),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwReturn => {
                let span = self.span();
                self.bump();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression(BP_LOWEST)?)
                };
                self.end_statement()?;
                Ok(Stmt::Return(value, span))
            }
            TokenKind::KwBreak => {
                let span = self.span();
                self.bump();
                self.end_statement()?;
                Ok(Stmt::Break(span))
            }
            TokenKind::KwContinue => {
                let span = self.span();
                self.bump();
                self.end_statement()?;
                Ok(Stmt::Continue(span))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.nested(|p| {
            let start = p.expect(&TokenKind::LBrace)?;
            let mut stmts = Vec::new();

            while !p.at(&TokenKind::RBrace) {
                if p.at_end() {
                    return Err(p.expected("'}'"));
                }
                if p.skip(&TokenKind::Semicolon) {
                    continue;
                }
                stmts.push(p.parse_statement()?);
            }

            let end = p.expect(&TokenKind::RBrace)?;
            Ok(Block {
                stmts,
                span: start.to(end),
            })
        })
    }

    fn parse_function(&mut self) -> Result<FnDef, ParseError> {
        let start = self.expect(&TokenKind::KwFn)?;

        let name = match self.current_kind() {
            TokenKind::Identifier(_) => Some(self.expect_identifier()?.0),
            _ => None,
        };

        self.expect(&TokenKind::LParen)?;
        let params = self.parse_comma_list(&TokenKind::RParen, |p| {
            let (name, span) = p.expect_identifier()?;
            Ok(Spanned::new(name, span))
        })?;
        self.expect(&TokenKind::RParen)?;

        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.value == param.value) {
                return Err(self.message(
                    format!("duplicate parameter '{}'", param.value),
                    param.span,
                ));
            }
        }

        let body = self.parse_block()?;
        let span = start.to(body.span);

        Ok(FnDef {
            name,
            params,
            body,
            span,
        })
    }
}

impl<'a> ParserState<'a> {
    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&TokenKind::KwLet)?;
        let (name, _) = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression(BP_LOWEST)?;
        let span = start.to(value.span());
        self.end_statement()?;
        Ok(Stmt::Let { name, value, span })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&TokenKind::KwIf)?;
        let cond = self.parse_expression(BP_LOWEST)?;
        let then_block = self.parse_block()?;

        let else_block = if self.skip(&TokenKind::KwElse) {
            if self.at(&TokenKind::KwIf) {
                // `else if` desugars to an else block holding a single if
                let nested = self.nested(|p| p.parse_if())?;
                let span = nested.span();
                Some(Block {
                    stmts: vec![nested],
                    span,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        let end = else_block.as_ref().map(|b| b.span).unwrap_or(then_block.span);
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
            span: start.to(end),
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&TokenKind::KwWhile)?;
        let cond = self.parse_expression(BP_LOWEST)?;
        let body = self.parse_block()?;
        let span = start.to(body.span);
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&TokenKind::KwFor)?;
        let (var, _) = self.expect_identifier()?;
        self.expect(&TokenKind::KwIn)?;
        let iterable = self.parse_expression(BP_LOWEST)?;
        let body = self.parse_block()?;
        let span = start.to(body.span);
        Ok(Stmt::For {
            var,
            iterable,
            body,
            span,
        })
    }

    /// Expression statement, or an assignment when followed by `=`
    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression(BP_LOWEST)?;

        if !self.skip(&TokenKind::Eq) {
            self.end_statement()?;
            return Ok(Stmt::Expr(expr));
        }

        let place = self.expr_to_place(expr)?;
        let value = self.parse_expression(BP_LOWEST)?;
        let span = place.span.to(value.span());
        self.end_statement()?;
        Ok(Stmt::Assign { place, value, span })
    }

    /// Turn `a`, `a[i]`, `a.k`, `a[i].k[j]` into an assignable place
    fn expr_to_place(
        &self,
        expr: Expr,
    ) -> Result<Place, ParseError> {
        let span = expr.span();
        let mut path = Vec::new();
        let mut current = expr;

        loop {
            match current {
                Expr::Var(root, _) => {
                    path.reverse();
                    return Ok(Place { root, path, span });
                }
                Expr::Index { target, index, .. } => {
                    path.push(PlaceStep::Index(*index));
                    current = *target;
                }
                Expr::Field { target, name, .. } => {
                    path.push(PlaceStep::Field(name));
                    current = *target;
                }
                other => {
                    return Err(self.message("invalid assignment target", other.span()));
                }
            }
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        )
    }

    /// Statements end with `;`, which may be omitted right before `}`
    fn end_statement(&mut self) -> Result<(), ParseError> {
        if self.skip(&TokenKind::Semicolon) || self.at(&TokenKind::RBrace) {
            Ok(())
        } else {
            Err(self.expected("';'"))
        }
    }
}
