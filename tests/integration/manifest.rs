//! Manifest-driven entry points used by the CLI

use dynamic_workers::util::config::WorkerConfig;
use dynamic_workers::{check_program, generate_manifest, run_manifest, WorkerState};
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const MANIFEST: &str = r#"
name = "calc"
helpers = ["fn twice(x) { return x * 2; }"]

[methods]
double = "fn(x) { done('double', twice(x)) }"
explode = "fn() { fail('bad input') }"
"#;

fn write(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_generate_then_check() {
    let manifest = write(MANIFEST);
    let code = generate_manifest(manifest.path()).unwrap();
    let program_file = write(&code);

    let program = check_program(program_file.path()).unwrap();
    assert_eq!(program.name(), Some("calc"));
    let methods: Vec<_> = program
        .methods()
        .into_iter()
        .map(|m| (m.name, m.arity))
        .collect();
    assert_eq!(
        methods,
        vec![("double".to_string(), 1), ("explode".to_string(), 0)]
    );
}

#[test]
fn test_run_collects_replies() {
    let manifest = write(MANIFEST);
    let outcome = run_manifest(
        manifest.path(),
        "double",
        Some(vec![json!(21)]),
        WorkerConfig::default(),
        Duration::from_secs(5),
    )
    .unwrap();
    assert_eq!(outcome.state, WorkerState::Idle);
    assert_eq!(outcome.replies, vec![json!({"fn": "double", "response": [42]})]);
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_run_collects_errors() {
    let manifest = write(MANIFEST);
    let outcome = run_manifest(
        manifest.path(),
        "explode",
        None,
        WorkerConfig::default(),
        Duration::from_secs(5),
    )
    .unwrap();
    assert_eq!(outcome.state, WorkerState::Error);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].message, "bad input");
}

#[test]
fn test_check_rejects_garbage() {
    let file = write("this is not a program");
    assert!(check_program(file.path()).is_err());
}
