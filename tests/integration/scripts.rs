//! Worker script programs run end to end through live workers

use dynamic_workers::manager::{ImageSpec, WorkerManager};
use dynamic_workers::util::config::WorkerConfig;
use dynamic_workers::WorkerState;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

/// Run one method on a fresh worker and return every message it posted
fn run(
    spec: ImageSpec,
    method: &str,
    args: Vec<Value>,
) -> (Vec<Value>, WorkerState) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let name = spec.name().to_string();

    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager
        .create_image(spec.on_message(move |payload| sink.lock().push(payload.clone())))
        .unwrap();
    manager.start(&name).unwrap();
    manager.exec(&name, method, Some(args)).unwrap();
    let state = manager.wait_idle(&name, WAIT).unwrap();
    let messages = seen.lock().clone();
    (messages, state)
}

#[test]
fn test_helpers_are_callable() {
    let spec = ImageSpec::new("math")
        .helper("fn square(x) { return x * x; }")
        .helper("fn sum_squares(items) { let t = 0; for i in items { t = t + square(i); } return t; }")
        .method("go", "fn(items) { done('go', sum_squares(items)) }");
    let (messages, state) = run(spec, "go", vec![json!([1, 2, 3])]);
    assert_eq!(state, WorkerState::Idle);
    assert_eq!(messages, vec![json!({"fn": "go", "response": [14]})]);
}

#[test]
fn test_progress_messages_then_final_reply() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager
        .create_image(
            ImageSpec::new("progress")
                .method(
                    "count",
                    r#"fn(n) {
                        let i = 0;
                        while i < n {
                            done('tick', i);
                            i = i + 1;
                        }
                        done('count', n, 'finished')
                    }"#,
                )
                .on_message(move |payload| sink.lock().push(payload.clone())),
        )
        .unwrap();
    manager.start("progress").unwrap();
    manager.exec("progress", "count", Some(vec![json!(3)])).unwrap();

    // Every done-shaped message counts as a reply, so the state may read
    // IDLE before the last one arrives.
    while seen.lock().len() < 4 {
        assert!(manager.wait("progress", WAIT).unwrap());
    }
    assert_eq!(
        *seen.lock(),
        vec![
            json!({"fn": "tick", "response": [0]}),
            json!({"fn": "tick", "response": [1]}),
            json!({"fn": "tick", "response": [2]}),
            json!({"fn": "count", "response": [3, "finished"]}),
        ]
    );
    assert_eq!(manager.get_state("progress"), Some(WorkerState::Idle));
}

#[test]
fn test_objects_and_strings() {
    let spec = ImageSpec::new("records").method(
        "summarise",
        r#"fn(people) {
            let names = [];
            let total = 0;
            for p in people {
                names = push(names, p.name);
                total = total + p.age;
            }
            done('summarise', { names: join(names, ', '), average: total / len(people) })
        }"#,
    );
    let people = json!([{"name": "ada", "age": 36}, {"name": "alan", "age": 41}]);
    let (messages, _) = run(spec, "summarise", vec![people]);
    assert_eq!(
        messages,
        vec![json!({"fn": "summarise", "response": [{"names": "ada, alan", "average": 38}]})]
    );
}

#[test]
fn test_self_identifies_worker() {
    let spec = ImageSpec::new("ident").method("who", "fn() { done('who', self.name) }");
    let (messages, _) = run(spec, "who", vec![]);
    assert_eq!(messages, vec![json!({"fn": "who", "response": ["ident"]})]);
}

#[test]
fn test_missing_arguments_are_null() {
    let spec = ImageSpec::new("args").method("pair", "fn(a, b) { done('pair', a, b) }");
    let (messages, _) = run(spec, "pair", vec![json!(1)]);
    assert_eq!(messages, vec![json!({"fn": "pair", "response": [1, null]})]);
}

#[test]
fn test_runaway_recursion_is_an_error() {
    let spec = ImageSpec::new("deep")
        .helper("fn down(n) { return down(n + 1); }")
        .method("go", "fn() { done('go', down(0)) }");
    let (messages, state) = run(spec, "go", vec![]);
    assert!(messages.is_empty());
    assert_eq!(state, WorkerState::Error);
}

#[test]
fn test_commented_method_does_not_break_the_next() {
    let spec = ImageSpec::new("commented")
        .method("a", "fn(x) { done('a', x) } // first")
        .method("b", "fn(x) { done('b', x) }");
    let (messages, state) = run(spec, "b", vec![json!(1)]);
    assert_eq!(state, WorkerState::Idle);
    assert_eq!(messages, vec![json!({"fn": "b", "response": [1]})]);
}
