//! Registry lifecycle: start, exec, shutdown and the failure paths

use dynamic_workers::host::ThreadSpawner;
use dynamic_workers::manager::{ImageSpec, WorkerManager};
use dynamic_workers::util::config::WorkerConfig;
use dynamic_workers::{WorkerError, WorkerEvent, WorkerFault, WorkerState};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn echo() -> ImageSpec {
    ImageSpec::new("echo").method("reply", "fn(x) { done('reply', x) }")
}

#[derive(Default)]
struct Recorder {
    messages: Mutex<Vec<Value>>,
    errors: Mutex<Vec<WorkerFault>>,
}

impl Recorder {
    fn bind(
        self: &Arc<Self>,
        spec: ImageSpec,
    ) -> ImageSpec {
        let on_message = self.clone();
        let on_error = self.clone();
        spec.on_message(move |payload| on_message.messages.lock().push(payload.clone()))
            .on_error(move |fault| on_error.errors.lock().push(fault.clone()))
    }
}

#[test]
fn test_echo_scenario() {
    let recorder = Arc::new(Recorder::default());
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager.create_image(recorder.bind(echo())).unwrap();

    manager.start("echo").unwrap();
    assert_eq!(manager.get_state("echo"), Some(WorkerState::Idle));

    manager.exec("echo", "reply", Some(vec![json!(42)])).unwrap();
    assert_eq!(manager.get_state("echo"), Some(WorkerState::Busy));

    assert_eq!(manager.wait_idle("echo", WAIT).unwrap(), WorkerState::Idle);
    assert_eq!(
        *recorder.messages.lock(),
        vec![json!({"fn": "reply", "response": [42]})]
    );
    assert!(recorder.errors.lock().is_empty());
}

#[test]
fn test_start_missing_reports_name() {
    let mut manager = WorkerManager::new(WorkerConfig::default());
    let err = manager.start("missing").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "\"missing\" was not found in available images");
    assert_eq!(manager.running().count(), 0);
}

#[test]
fn test_exec_on_stopped_worker() {
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager.create_image(echo()).unwrap();
    manager.start("echo").unwrap();
    manager.shutdown("echo");

    let err = manager.exec("echo", "reply", None).unwrap_err();
    assert_eq!(err, WorkerError::not_running("echo"));
    assert_eq!(err.to_string(), "\"echo\" is not a running worker");
    assert!(manager.has_image("echo"));
}

#[test]
fn test_shutdown_of_unknown_name_is_noop() {
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager.create_image(echo()).unwrap();
    assert!(!manager.shutdown("echo"));
    assert!(!manager.shutdown("never-registered"));
    assert_eq!(manager.image_names().collect::<Vec<_>>(), vec!["echo"]);
}

#[test]
fn test_double_start_releases_first_handle() {
    let config = WorkerConfig {
        max_workers: Some(1),
        ..WorkerConfig::default()
    };
    let mut manager = WorkerManager::new(config);
    manager.create_image(echo()).unwrap();

    // With a single slot the second start only succeeds if the first
    // context was terminated before spawning.
    manager.start("echo").unwrap();
    manager.start("echo").unwrap();
    assert_eq!(manager.blobs().live_count(), 1);
    assert_eq!(manager.get_state("echo"), Some(WorkerState::Idle));
}

#[test]
fn test_spawn_failure_is_reported() {
    let config = WorkerConfig {
        max_workers: Some(1),
        ..WorkerConfig::default()
    };
    let spawner = Arc::new(ThreadSpawner::new(&config));
    let mut manager = WorkerManager::with_spawner(config, spawner.clone());
    manager.create_image(echo()).unwrap();
    manager.create_image(ImageSpec::new("other")).unwrap();

    manager.start("echo").unwrap();
    let err = manager.start("other").unwrap_err();
    assert!(matches!(err, WorkerError::Spawn { ref name, .. } if name == "other"));
    assert_eq!(manager.get_state("other"), None);
    assert_eq!(manager.blobs().live_count(), 1);
    assert_eq!(spawner.active(), 1);

    manager.shutdown("echo");
    manager.start("other").unwrap();
    assert_eq!(spawner.active(), 1);
}

#[test]
fn test_worker_errors_reach_error_callback() {
    let recorder = Arc::new(Recorder::default());
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager
        .create_image(recorder.bind(
            ImageSpec::new("faulty")
                .method("divide", "fn(a, b) { done('divide', a / b) }")
                .method("leak", "fn() { done('leak', captured) }"),
        ))
        .unwrap();
    manager.start("faulty").unwrap();

    manager.exec("faulty", "nope", None).unwrap();
    assert_eq!(manager.wait_idle("faulty", WAIT).unwrap(), WorkerState::Error);

    // ERROR is terminal: later replies and errors do not move it
    manager.exec("faulty", "divide", Some(vec![json!(1), json!(0)])).unwrap();
    manager.exec("faulty", "leak", None).unwrap();
    manager.exec("faulty", "divide", Some(vec![json!(6), json!(3)])).unwrap();
    while recorder.messages.lock().is_empty() {
        assert!(manager.wait("faulty", WAIT).unwrap());
    }
    assert_eq!(manager.get_state("faulty"), Some(WorkerState::Error));

    let errors = recorder.errors.lock();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0], WorkerFault::in_method("unknown method 'nope'", "nope"));
    assert_eq!(errors[1].method.as_deref(), Some("divide"));
    assert_eq!(errors[1].message, "division by zero");
    assert_eq!(errors[2].message, "undefined variable 'captured'");
    assert_eq!(
        *recorder.messages.lock(),
        vec![json!({"fn": "divide", "response": [2]})]
    );
}

#[test]
fn test_replies_arrive_in_send_order() {
    let recorder = Arc::new(Recorder::default());
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager.create_image(recorder.bind(echo())).unwrap();
    manager.start("echo").unwrap();

    for i in 0..20 {
        manager.exec("echo", "reply", Some(vec![json!(i)])).unwrap();
    }
    while recorder.messages.lock().len() < 20 {
        assert!(manager.wait("echo", WAIT).unwrap());
    }
    let order: Vec<_> = recorder
        .messages
        .lock()
        .iter()
        .map(|m| m["response"][0].clone())
        .collect();
    assert_eq!(order, (0..20).map(|i| json!(i)).collect::<Vec<_>>());
}

#[test]
fn test_shutdown_interrupts_long_call() {
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager
        .create_image(
            ImageSpec::new("sleepy").method("nap", "fn() { while true { sleep(10); } }"),
        )
        .unwrap();
    manager.start("sleepy").unwrap();
    manager.exec("sleepy", "nap", None).unwrap();
    assert_eq!(manager.get_state("sleepy"), Some(WorkerState::Busy));

    assert!(manager.shutdown("sleepy"));
    assert_eq!(manager.get_state("sleepy"), None);
    assert_eq!(manager.blobs().live_count(), 0);
}

#[test]
fn test_handle_on_accepts_event_names() {
    let mut manager = WorkerManager::new(WorkerConfig::default());
    manager.create_image(echo()).unwrap();
    manager.start("echo").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let blobs = manager.blobs().clone();
    let mut handle = dynamic_workers::WorkerHandle::create(
        &blobs,
        &ThreadSpawner::default(),
        dynamic_workers::host::Blob::script(manager.image("echo").unwrap().code()),
        Default::default(),
    )
    .unwrap();
    handle
        .on("message", move |event| sink.lock().push(event.clone()))
        .unwrap();
    handle.exec("reply", Some(vec![json!("x")])).unwrap();
    assert_eq!(handle.wait_idle(WAIT), WorkerState::Idle);
    assert_eq!(
        *seen.lock(),
        vec![WorkerEvent::Message(json!({"fn": "reply", "response": ["x"]}))]
    );
    assert!(handle.on("close", |_| {}).is_err());
    handle.shutdown(None);
    assert_eq!(blobs.live_count(), 1);
}
