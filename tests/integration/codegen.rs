//! Generated program text: layout, round trip and validation

use dynamic_workers::codegen::{generate_code, generate_code_at, GenerateError};
use dynamic_workers::script::{program::header_field, MethodInfo, Program, Script};
use indexmap::IndexMap;
use proptest::prelude::*;

fn executables(entries: &[(&str, &str)]) -> IndexMap<String, Script> {
    entries
        .iter()
        .map(|(name, source)| (name.to_string(), Script::from(*source)))
        .collect()
}

#[test]
fn test_header_records_name_and_time() {
    let code = generate_code_at("echo", &executables(&[("m", "fn() {}")]), &[], 1234).unwrap();
    assert!(code.starts_with("/**\n * dynamic-worker\n"));
    assert_eq!(header_field(&code, "name"), Some("echo"));
    assert_eq!(header_field(&code, "created"), Some("1234"));
}

#[test]
fn test_sources_are_embedded_verbatim() {
    let source = "fn (x)   {\n  // keep me\n  done('m', x)\n}";
    let code = generate_code("w", &executables(&[("m", source)]), &[]).unwrap();
    assert!(code.contains(source));
}

#[test]
fn test_helpers_precede_methods() {
    let code = generate_code(
        "w",
        &executables(&[("m", "fn(x) { done('m', twice(x)) }")]),
        &[Script::from("fn twice(x) { return x * 2; }")],
    )
    .unwrap();
    assert!(code.find("fn twice").unwrap() < code.find("methods = {").unwrap());
}

#[test]
fn test_non_function_executable_names_method() {
    let err = generate_code(
        "w",
        &executables(&[("ok", "fn() {}"), ("broken", "'text'")]),
        &[],
    )
    .unwrap_err();
    match err {
        GenerateError::NotAFunction { method, .. } => assert_eq!(method, "broken"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_trailing_line_comment_round_trips() {
    let code = generate_code(
        "c",
        &executables(&[
            ("a", "fn(x) { done('a', x) } // first"),
            ("b", "fn(x, y) { done('b', x) }"),
        ]),
        &[],
    )
    .unwrap();
    let program = Program::parse(&code).unwrap();
    assert_eq!(
        program.methods(),
        vec![
            MethodInfo { name: "a".to_string(), arity: 1 },
            MethodInfo { name: "b".to_string(), arity: 2 },
        ]
    );
}

#[test]
fn test_deep_nesting_is_rejected() {
    let source = format!("fn() {{ return {}1{}; }}", "(".repeat(100_000), ")".repeat(100_000));
    let err = generate_code("d", &executables(&[("m", source.as_str())]), &[]).unwrap_err();
    match err {
        GenerateError::NotAFunction { method, reason } => {
            assert_eq!(method, "m");
            assert!(reason.contains("nesting exceeds"), "{}", reason);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

fn method_name() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_' \\\\-]{0,12}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip_names_and_arity(
        entries in prop::collection::vec((method_name(), 0usize..6), 0..8)
    ) {
        let mut execs = IndexMap::new();
        for (name, arity) in &entries {
            let params: Vec<String> = (0..*arity).map(|i| format!("p{}", i)).collect();
            execs.insert(
                name.clone(),
                Script::from(format!("fn({}) {{ done('x') }}", params.join(", "))),
            );
        }

        let code = generate_code("prop", &execs, &[]).unwrap();
        let program = Program::parse(&code).unwrap();

        let expected: Vec<MethodInfo> = execs
            .iter()
            .map(|(name, script)| MethodInfo {
                name: name.clone(),
                arity: script.parse().unwrap().arity(),
            })
            .collect();
        prop_assert_eq!(program.methods(), expected);
    }
}
