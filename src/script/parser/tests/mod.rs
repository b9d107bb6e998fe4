//! Parser tests


use crate::script::lexer::tokenize;
use crate::script::parser::ast::*;
use crate::script::parser::{parse_expression, parse_function, ParseError};

fn expr(source: &str) -> Expr {
    parse_expression(&tokenize(source).unwrap()).unwrap()
}

fn function(source: &str) -> FnDef {
    parse_function(&tokenize(source).unwrap()).unwrap()
}

fn function_err(source: &str) -> ParseError {
    parse_function(&tokenize(source).unwrap()).unwrap_err()
}
