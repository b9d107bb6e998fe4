//! Code generator
//!
//! Turns a set of named executables plus helper functions into the program
//! text a worker loads. Executables are validated up front so a broken
//! function fails here instead of inside a running worker.

pub mod template;

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::script::Script;
use template::ProgramParts;

/// Code generation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerateError {
    #[error("invalid worker name {0:?}: expected letters, digits, '_', '-' or '.'")]
    InvalidName(String),
    #[error("executable '{method}' is not a function: {reason}")]
    NotAFunction { method: String, reason: String },
}

/// Check a worker name
pub fn validate_name(name: &str) -> Result<(), GenerateError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(GenerateError::InvalidName(name.to_string()))
    }
}

/// Generate program text for `name`
///
/// Methods are emitted in the map's insertion order. Helpers keep their input
/// order; any that are not named functions are dropped with a warning.
pub fn generate_code(
    name: &str,
    executables: &IndexMap<String, Script>,
    helpers: &[Script],
) -> Result<String, GenerateError> {
    let created_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    generate_code_at(name, executables, helpers, created_ms)
}

/// [`generate_code`] with a fixed creation timestamp
pub fn generate_code_at(
    name: &str,
    executables: &IndexMap<String, Script>,
    helpers: &[Script],
    created_ms: u128,
) -> Result<String, GenerateError> {
    validate_name(name)?;

    let mut methods = Vec::with_capacity(executables.len());
    for (method, script) in executables {
        script.parse().map_err(|e| GenerateError::NotAFunction {
            method: method.clone(),
            reason: e.to_string(),
        })?;
        methods.push((method.as_str(), script.source()));
    }

    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(helpers.len());
    for (index, helper) in helpers.iter().enumerate() {
        match helper.parse() {
            Ok(def) => match def.name {
                Some(helper_name) if seen.insert(helper_name.clone()) => {
                    kept.push(helper.source());
                }
                Some(helper_name) => {
                    warn!(worker = name, helper = %helper_name, "dropping duplicate helper");
                }
                None => warn!(worker = name, index, "dropping anonymous helper"),
            },
            Err(e) => warn!(worker = name, index, "dropping helper that is not a function: {}", e),
        }
    }

    debug!(
        worker = name,
        methods = methods.len(),
        helpers = kept.len(),
        "generated program"
    );

    Ok(template::render(&ProgramParts {
        name,
        created_ms,
        helpers: kept,
        methods,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{MethodInfo, Program};

    fn execs(entries: &[(&str, &str)]) -> IndexMap<String, Script> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Script::from(*v)))
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_order_and_arity() {
        let executables = execs(&[
            ("zeta", "fn(a, b, c) { done('zeta', a) }"),
            ("alpha", "fn() { done('alpha') }"),
            ("it's", "fn(x) { done(\"it's\", x) }"),
        ]);
        let code = generate_code("sample", &executables, &[]).unwrap();
        let program = Program::parse(&code).unwrap();
        assert_eq!(program.name(), Some("sample"));
        assert_eq!(
            program.methods(),
            vec![
                MethodInfo {
                    name: "zeta".to_string(),
                    arity: 3
                },
                MethodInfo {
                    name: "alpha".to_string(),
                    arity: 0
                },
                MethodInfo {
                    name: "it's".to_string(),
                    arity: 1
                },
            ]
        );
    }

    #[test]
    fn test_helpers_kept_in_order_and_bad_ones_dropped() {
        let helpers = vec![
            Script::from("fn b() { return 2; }"),
            Script::from("fn() { return 0; }"),
            Script::from("not a function"),
            Script::from("fn a() { return 1; }"),
            Script::from("fn b() { return 3; }"),
        ];
        let code = generate_code("w", &execs(&[("m", "fn() {}")]), &helpers).unwrap();
        let program = Program::parse(&code).unwrap();
        assert_eq!(program.helper_names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(code.contains("return 2;"));
        assert!(!code.contains("return 3;"));
    }

    #[test]
    fn test_rejects_non_function_executable() {
        let err = generate_code("w", &execs(&[("bad", "42")]), &[]).unwrap_err();
        assert!(matches!(err, GenerateError::NotAFunction { ref method, .. } if method == "bad"));
    }

    #[test]
    fn test_rejects_invalid_names() {
        for name in ["", "has space", "star*/"] {
            assert_eq!(
                generate_code(name, &IndexMap::new(), &[]),
                Err(GenerateError::InvalidName(name.to_string()))
            );
        }
        assert!(validate_name("image-1.v2_b").is_ok());
    }

    #[test]
    fn test_fixed_timestamp_is_deterministic() {
        let executables = execs(&[("m", "fn() {}")]);
        let a = generate_code_at("w", &executables, &[], 5).unwrap();
        let b = generate_code_at("w", &executables, &[], 5).unwrap();
        assert_eq!(a, b);
        assert!(a.contains(" * created: 5\n"));
    }

    #[test]
    fn test_empty_image_still_parses() {
        let code = generate_code("empty", &IndexMap::new(), &[]).unwrap();
        assert!(Program::parse(&code).unwrap().methods().is_empty());
    }
}
