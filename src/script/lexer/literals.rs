//! Literal scanning implementations
//! Handles number and string literals

use super::tokenizer::Lexer;
use crate::script::lexer::tokens::*;

/// Scan a number literal (decimal integer, hex integer or float)
pub fn scan_number(
    lexer: &mut Lexer<'_>,
    first_char: char,
) -> Result<Token, LexError> {
    if first_char == '0' && matches!(lexer.peek(), Some('x') | Some('X')) {
        lexer.advance();
        return scan_hex_number(lexer);
    }

    let mut value = String::new();
    value.push(first_char);
    let mut is_float = false;

    scan_digits(lexer, &mut value);

    // `1.` without a following digit leaves the dot for the parser
    if lexer.peek() == Some(&'.') && lexer.peek_next().map(is_digit).unwrap_or(false) {
        is_float = true;
        value.push('.');
        lexer.advance();
        scan_digits(lexer, &mut value);
    }

    if matches!(lexer.peek(), Some('e') | Some('E')) {
        let exponent_follows = match lexer.peek_next() {
            Some(c) if is_digit(c) => true,
            Some('+') | Some('-') => true,
            _ => false,
        };
        if exponent_follows {
            is_float = true;
            value.push('e');
            lexer.advance();
            if let Some(&sign) = lexer.peek() {
                if sign == '+' || sign == '-' {
                    value.push(sign);
                    lexer.advance();
                }
            }
            let before = value.len();
            scan_digits(lexer, &mut value);
            if value.len() == before {
                return Err(LexError::InvalidNumber {
                    literal: value,
                    position: lexer.start_position(),
                });
            }
        }
    }

    if is_float {
        value
            .parse::<f64>()
            .map(|f| lexer.make_token(TokenKind::FloatLiteral(f)))
            .map_err(|_| LexError::InvalidNumber {
                literal: value,
                position: lexer.start_position(),
            })
    } else {
        value
            .parse::<i64>()
            .map(|n| lexer.make_token(TokenKind::IntLiteral(n)))
            .map_err(|_| LexError::InvalidNumber {
                literal: value,
                position: lexer.start_position(),
            })
    }
}

/// Consume decimal digits (and `_` separators) into `value`
fn scan_digits(
    lexer: &mut Lexer<'_>,
    value: &mut String,
) {
    while let Some(&c) = lexer.peek() {
        if is_digit(c) {
            value.push(c);
            lexer.advance();
        } else if c == '_' {
            lexer.advance();
        } else {
            break;
        }
    }
}

/// Scan hexadecimal number after the `0x` prefix
fn scan_hex_number(lexer: &mut Lexer<'_>) -> Result<Token, LexError> {
    let mut digits = String::new();

    while let Some(&c) = lexer.peek() {
        if c.is_ascii_hexdigit() {
            digits.push(c);
            lexer.advance();
        } else if c == '_' {
            lexer.advance();
        } else {
            break;
        }
    }

    i64::from_str_radix(&digits, 16)
        .map(|n| lexer.make_token(TokenKind::IntLiteral(n)))
        .map_err(|_| LexError::InvalidNumber {
            literal: format!("0x{}", digits),
            position: lexer.start_position(),
        })
}

/// Scan a string literal delimited by `quote` (`'` or `"`)
pub fn scan_string(
    lexer: &mut Lexer<'_>,
    quote: char,
) -> Result<Token, LexError> {
    let mut value = String::new();

    loop {
        match lexer.advance() {
            None | Some('\n') => {
                return Err(LexError::UnterminatedString {
                    position: lexer.start_position(),
                })
            }
            Some(c) if c == quote => break,
            Some('\\') => {
                let escaped = scan_escape(lexer)?;
                value.push(escaped);
            }
            Some(c) => value.push(c),
        }
    }

    Ok(lexer.make_token(TokenKind::StringLiteral(value)))
}

/// Decode the escape sequence following a backslash
fn scan_escape(lexer: &mut Lexer<'_>) -> Result<char, LexError> {
    let position = lexer.position();
    match lexer.advance() {
        Some('n') => Ok('\n'),
        Some('t') => Ok('\t'),
        Some('r') => Ok('\r'),
        Some('0') => Ok('\0'),
        Some('\\') => Ok('\\'),
        Some('\'') => Ok('\''),
        Some('"') => Ok('"'),
        Some('u') => {
            if lexer.advance() != Some('{') {
                return Err(LexError::InvalidEscape {
                    sequence: "\\u".to_string(),
                    position,
                });
            }
            let mut hex = String::new();
            loop {
                match lexer.advance() {
                    Some('}') => break,
                    Some(c) if c.is_ascii_hexdigit() && hex.len() < 6 => hex.push(c),
                    _ => {
                        return Err(LexError::InvalidEscape {
                            sequence: format!("\\u{{{}", hex),
                            position,
                        })
                    }
                }
            }
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or(LexError::InvalidEscape {
                    sequence: format!("\\u{{{}}}", hex),
                    position,
                })
        }
        Some(c) => Err(LexError::InvalidEscape {
            sequence: format!("\\{}", c),
            position,
        }),
        None => Err(LexError::UnterminatedString {
            position: lexer.start_position(),
        }),
    }
}

/// Escape `s` so it can be embedded in a single-quoted string literal
pub fn escape_single_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

/// Check if character can start an identifier
#[inline]
pub fn is_identifier_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Check if character can continue an identifier
#[inline]
pub fn is_identifier_char(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Check if character is a decimal digit
#[inline]
pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}
