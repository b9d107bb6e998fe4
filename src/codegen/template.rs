//! Program text template

use std::fmt::Write;

use crate::script::lexer::literals::escape_single_quoted;
use crate::script::program::METHODS_SLOT;

/// Marker on the first line of every generated header
pub const HEADER_MARKER: &str = "dynamic-worker";

/// Already-validated pieces of one program
pub struct ProgramParts<'a> {
    pub name: &'a str,
    pub created_ms: u128,
    pub helpers: Vec<&'a str>,
    pub methods: Vec<(&'a str, &'a str)>,
}

/// Assemble the program text
pub fn render(parts: &ProgramParts<'_>) -> String {
    let mut out = String::new();

    // Writing into a String never fails.
    let _ = writeln!(out, "/**");
    let _ = writeln!(out, " * {}", HEADER_MARKER);
    let _ = writeln!(out, " * name: {}", parts.name);
    let _ = writeln!(out, " * created: {}", parts.created_ms);
    let _ = writeln!(out, " */");
    out.push('\n');

    if !parts.helpers.is_empty() {
        out.push_str(&parts.helpers.join("\n"));
        out.push_str("\n\n");
    }

    let _ = writeln!(out, "{} = {{", METHODS_SLOT);
    for (method, source) in &parts.methods {
        let _ = write!(out, "    '{}': {}", escape_single_quoted(method), source);
        if ends_in_line_comment(source) {
            out.push_str("\n    ");
        }
        out.push_str(",\n");
    }
    out.push_str("};\n");
    out
}

/// A `//` on the last line could swallow whatever follows on that line
fn ends_in_line_comment(source: &str) -> bool {
    source.lines().last().is_some_and(|line| line.contains("//"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_layout() {
        let text = render(&ProgramParts {
            name: "echo",
            created_ms: 1700000000000,
            helpers: vec!["fn twice(x) { return x * 2; }"],
            methods: vec![("reply", "fn(x) { done('reply', x) }")],
        });
        assert_eq!(
            text,
            "/**\n * dynamic-worker\n * name: echo\n * created: 1700000000000\n */\n\n\
             fn twice(x) { return x * 2; }\n\n\
             methods = {\n    'reply': fn(x) { done('reply', x) },\n};\n"
        );
    }

    #[test]
    fn test_render_escapes_method_names() {
        let text = render(&ProgramParts {
            name: "w",
            created_ms: 0,
            helpers: vec![],
            methods: vec![("it's\\", "fn() {}")],
        });
        assert!(text.contains(r"'it\'s\\': fn() {},"));
    }

    #[test]
    fn test_trailing_line_comment_keeps_comma() {
        let text = render(&ProgramParts {
            name: "w",
            created_ms: 0,
            helpers: vec![],
            methods: vec![("a", "fn() {} // first"), ("b", "fn() {}")],
        });
        assert!(text.contains("    'a': fn() {} // first\n    ,\n    'b': fn() {},\n"));
    }
}
