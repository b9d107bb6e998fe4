//! worker 脚本词法分析模块
//! 分为关键字表、字面量扫描和分词器本体

pub mod literals;
pub mod state;
pub mod tokenizer;
pub mod tokens;

pub use tokenizer::Lexer;
pub use tokens::{LexError, Token, TokenKind};

/// Tokenize source code, appending a trailing `Eof` token
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    tracing::trace!("lexing {} bytes", source.len());

    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }

    let end = lexer.position();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: crate::util::span::Span::new(end, end),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_function_expression() {
        assert_eq!(
            kinds("fn(x){done('reply', x)}"),
            vec![
                TokenKind::KwFn,
                TokenKind::LParen,
                TokenKind::Identifier("x".to_string()),
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Identifier("done".to_string()),
                TokenKind::LParen,
                TokenKind::StringLiteral("reply".to_string()),
                TokenKind::Comma,
                TokenKind::Identifier("x".to_string()),
                TokenKind::RParen,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5 1e3 2.5E-1 0xff 1_000"),
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::FloatLiteral(3.5),
                TokenKind::FloatLiteral(1000.0),
                TokenKind::FloatLiteral(0.25),
                TokenKind::IntLiteral(255),
                TokenKind::IntLiteral(1000),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dot_after_integer_is_separate() {
        assert_eq!(
            kinds("a.0"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Dot,
                TokenKind::IntLiteral(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\n\u{41}""#),
            vec![
                TokenKind::StringLiteral("it's".to_string()),
                TokenKind::StringLiteral("a\nA".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != <= >= && || ! = < >"),
            vec![
                TokenKind::EqEq,
                TokenKind::Neq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Eq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("/* outer /* nested */ */ a // trailing\nb"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Identifier("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_literals() {
        assert_eq!(
            kinds("let self true null"),
            vec![
                TokenKind::KwLet,
                TokenKind::KwSelf,
                TokenKind::BoolLiteral(true),
                TokenKind::NullLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("'open"),
            Err(LexError::UnterminatedString { .. })
        ));
        assert!(matches!(
            tokenize("/* never closed"),
            Err(LexError::UnterminatedComment { .. })
        ));
        assert!(matches!(
            tokenize("a # b"),
            Err(LexError::UnexpectedChar { ch: '#', .. })
        ));
        assert!(matches!(
            tokenize(r"'\q'"),
            Err(LexError::InvalidEscape { .. })
        ));
        assert!(matches!(
            tokenize("99999999999999999999"),
            Err(LexError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = tokenize("a\n  bc").unwrap();
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 3);
        assert_eq!(tokens[1].span.start.offset, 4);
        assert_eq!(tokens[1].span.end.offset, 6);
    }
}
