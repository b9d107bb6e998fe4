//! Generated worker programs
//!
//! A program is what the code generator emits and what a worker parses on
//! start-up: named helper functions plus one `methods = { ... };` table.

use indexmap::IndexMap;

use crate::script::lexer::{self, tokens::TokenKind};
use crate::script::parser::{FnDef, ParseError, ParserState, StatementParser};
use crate::script::ScriptError;

/// Name of the table that holds dispatchable methods
pub const METHODS_SLOT: &str = "methods";

/// A dispatchable method and the number of parameters it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    pub arity: usize,
}

/// A parsed worker program
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    name: Option<String>,
    helpers: IndexMap<String, FnDef>,
    methods: IndexMap<String, FnDef>,
}

impl Program {
    /// Parse generated program text
    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        let tokens = lexer::tokenize(source)?;
        let mut state = ParserState::new(&tokens);

        let mut helpers = IndexMap::new();
        let mut methods = None;

        while !state.at_end() {
            if state.skip(&TokenKind::Semicolon) {
                continue;
            }
            match state.current_kind() {
                TokenKind::KwFn => {
                    let span = state.span();
                    let def = state.parse_function()?;
                    let name = def.name.clone().ok_or_else(|| {
                        state.message("top-level helper functions must be named", span)
                    })?;
                    if helpers.contains_key(&name) {
                        return Err(state
                            .message(format!("duplicate helper '{}'", name), span)
                            .into());
                    }
                    helpers.insert(name, def);
                }
                TokenKind::Identifier(slot) if slot == METHODS_SLOT => {
                    let span = state.span();
                    if methods.is_some() {
                        return Err(state.message("duplicate methods table", span).into());
                    }
                    methods = Some(parse_methods_table(&mut state)?);
                }
                _ => return Err(state.expected("helper function or methods table").into()),
            }
        }

        let methods = methods.ok_or_else(|| ParseError::Message {
            message: "program has no methods table".to_string(),
            span: state.span(),
        })?;

        Ok(Self {
            name: header_field(source, "name").map(str::to_string),
            helpers,
            methods,
        })
    }

    /// Worker name recorded in the generated header, if present
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Dispatchable methods in declaration order
    pub fn methods(&self) -> Vec<MethodInfo> {
        self.methods
            .iter()
            .map(|(name, def)| MethodInfo {
                name: name.clone(),
                arity: def.arity(),
            })
            .collect()
    }

    pub fn method(
        &self,
        name: &str,
    ) -> Option<&FnDef> {
        self.methods.get(name)
    }

    pub fn helper(
        &self,
        name: &str,
    ) -> Option<&FnDef> {
        self.helpers.get(name)
    }

    /// Helper names in declaration order
    pub fn helper_names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }
}

/// `methods = { 'name': fn(...) { ... }, ... };`
fn parse_methods_table(state: &mut ParserState<'_>) -> Result<IndexMap<String, FnDef>, ParseError> {
    state.bump();
    state.expect(&TokenKind::Eq)?;
    state.expect(&TokenKind::LBrace)?;

    let mut methods = IndexMap::new();
    let entries = state.parse_comma_list(&TokenKind::RBrace, |p| {
        let span = p.span();
        let key = match p.current_kind().clone() {
            TokenKind::StringLiteral(s) => s,
            TokenKind::Identifier(s) => s,
            _ => return Err(p.expected("method name")),
        };
        p.bump();
        p.expect(&TokenKind::Colon)?;
        let def = p.parse_function()?;
        Ok((key, def, span))
    })?;
    state.expect(&TokenKind::RBrace)?;
    state.skip(&TokenKind::Semicolon);

    for (key, def, span) in entries {
        if methods.contains_key(&key) {
            return Err(state.message(format!("duplicate method '{}'", key), span));
        }
        methods.insert(key, def);
    }

    Ok(methods)
}

/// Read ` * <field>: value` from the leading header comment
pub fn header_field<'s>(
    source: &'s str,
    field: &str,
) -> Option<&'s str> {
    let header = source.trim_start().strip_prefix("/**")?;
    let header = &header[..header.find("*/")?];
    header.lines().find_map(|line| {
        let line = line.trim().trim_start_matches('*').trim();
        line.strip_prefix(field)?
            .strip_prefix(':')
            .map(str::trim)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
/**
 * dynamic-worker
 * name: sample
 * created: 0
 */

fn add(a, b) { return a + b; }

methods = {
    'sum': fn(a, b) { done('sum', add(a, b)) },
    'ping': fn() { done('ping') },
};
"#;

    #[test]
    fn test_parse_sample() {
        let program = Program::parse(SAMPLE).unwrap();
        assert_eq!(program.name(), Some("sample"));
        assert_eq!(
            program.methods(),
            vec![
                MethodInfo {
                    name: "sum".to_string(),
                    arity: 2
                },
                MethodInfo {
                    name: "ping".to_string(),
                    arity: 0
                },
            ]
        );
        assert_eq!(program.helper_names().collect::<Vec<_>>(), vec!["add"]);
        assert!(program.method("sum").is_some());
        assert!(program.helper("sum").is_none());
    }

    #[test]
    fn test_missing_methods_table() {
        let err = Program::parse("fn add(a, b) { return a + b; }").unwrap_err();
        assert!(err.to_string().contains("no methods table"));
    }

    #[test]
    fn test_duplicate_method() {
        let err = Program::parse("methods = { 'a': fn() {}, 'a': fn() {} };").unwrap_err();
        assert!(err.to_string().contains("duplicate method 'a'"));
    }

    #[test]
    fn test_duplicate_helper() {
        let src = "fn h() {} fn h() {} methods = {};";
        assert!(Program::parse(src)
            .unwrap_err()
            .to_string()
            .contains("duplicate helper 'h'"));
    }

    #[test]
    fn test_anonymous_helper_rejected() {
        let err = Program::parse("fn() {} methods = {};").unwrap_err();
        assert!(err.to_string().contains("must be named"));
    }

    #[test]
    fn test_stray_statement_rejected() {
        assert!(Program::parse("let x = 1; methods = {};").is_err());
    }

    #[test]
    fn test_header_field_absent() {
        assert_eq!(header_field("methods = {};", "name"), None);
        assert_eq!(header_field(SAMPLE, "created"), Some("0"));
    }
}
