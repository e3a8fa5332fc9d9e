//! Unit tests for the debug API.

use crate::{ControlRequest, DebugServer, DebugShared, DebugSnapshot, MAX_PENDING_REQUESTS};
use diorama_globe::{DebugCommand, RenderPath, Tunable};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn start() -> (DebugServer, Arc<Mutex<DebugShared>>, String) {
    let shared = Arc::new(Mutex::new(DebugShared::default()));
    let mut server = DebugServer::new(0); // port 0 = OS assigns
    server.start(shared.clone()).unwrap();

    // Give server a moment to start
    thread::sleep(Duration::from_millis(100));

    let base = format!("http://localhost:{}", server.actual_port());
    (server, shared, base)
}

fn status_of(result: Result<ureq::Response, ureq::Error>) -> u16 {
    match result {
        Ok(resp) => resp.status(),
        Err(ureq::Error::Status(code, _)) => code,
        Err(e) => panic!("transport error: {e}"),
    }
}

#[test]
fn test_drain_empties_queue_in_order() {
    let mut shared = DebugShared::default();
    shared.push(ControlRequest::Command(DebugCommand::LogState));
    shared.push(ControlRequest::Quit);
    assert_eq!(
        shared.drain(),
        vec![
            ControlRequest::Command(DebugCommand::LogState),
            ControlRequest::Quit
        ]
    );
    assert!(shared.drain().is_empty());
}

#[test]
fn test_full_queue_drops_oldest_command() {
    let mut shared = DebugShared::default();
    shared.push(ControlRequest::Quit);
    shared.push(ControlRequest::Command(DebugCommand::ResetParameters));
    for _ in 0..MAX_PENDING_REQUESTS {
        shared.push(ControlRequest::Command(DebugCommand::LogState));
    }

    let drained = shared.drain();
    assert_eq!(drained.len(), MAX_PENDING_REQUESTS);
    assert_eq!(drained[0], ControlRequest::Quit);
    assert!(!drained.contains(&ControlRequest::Command(DebugCommand::ResetParameters)));
}

#[test]
fn test_health_responds_ok() {
    let (mut server, _shared, base) = start();

    let resp = ureq::get(&format!("{base}/health")).call().unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.into_json().unwrap();
    assert_eq!(body["status"], "ok");
    server.stop();
}

#[test]
fn test_state_returns_published_snapshot() {
    let (mut server, shared, base) = start();
    shared.lock().unwrap().publish(DebugSnapshot {
        frame: 120,
        fps: 59.9,
        window_width: 1280,
        window_height: 720,
        render_path: Some(RenderPath::Direct),
        ..DebugSnapshot::default()
    });

    let body: serde_json::Value = ureq::get(&format!("{base}/state"))
        .call()
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(body["frame"], 120);
    assert!((body["fps"].as_f64().unwrap() - 59.9).abs() < 0.01);
    assert_eq!(body["window_width"], 1280);
    assert_eq!(body["render_path"], "direct");
    assert!(body["viewer"].is_null());
    server.stop();
}

#[test]
fn test_param_is_queued() {
    let (mut server, shared, base) = start();

    let resp = ureq::post(&format!("{base}/param"))
        .set("Content-Type", "application/json")
        .send_string(r#"{"name": "aperture", "value": 5.0}"#);
    assert_eq!(status_of(resp), 202);

    assert_eq!(
        shared.lock().unwrap().drain(),
        vec![ControlRequest::Command(DebugCommand::SetParameter(
            Tunable::Aperture,
            5.0
        ))]
    );
    server.stop();
}

#[test]
fn test_bad_params_are_rejected() {
    let (mut server, shared, base) = start();

    for body in [
        r#"{"name": "exposure", "value": 1.0}"#,
        r#"{"name": "focus", "value": -3.0}"#,
        r#"{"name": "focus"}"#,
        "not json",
    ] {
        let resp = ureq::post(&format!("{base}/param")).send_string(body);
        assert_eq!(status_of(resp), 400, "{body}");
    }

    assert!(shared.lock().unwrap().drain().is_empty());
    server.stop();
}

#[test]
fn test_commands_and_quit_are_queued() {
    let (mut server, shared, base) = start();

    for body in [
        r#"{"command": "toggle_auto_focus"}"#,
        r#"{"command": "focus_object:2"}"#,
        r#"{"command": "quit"}"#,
    ] {
        let resp = ureq::post(&format!("{base}/command")).send_string(body);
        assert_eq!(status_of(resp), 202, "{body}");
    }
    let resp = ureq::post(&format!("{base}/command")).send_string(r#"{"command": "explode"}"#);
    assert_eq!(status_of(resp), 400);

    assert_eq!(
        shared.lock().unwrap().drain(),
        vec![
            ControlRequest::Command(DebugCommand::ToggleAutoFocus),
            ControlRequest::Command(DebugCommand::FocusOnTestObject(2)),
            ControlRequest::Quit,
        ]
    );
    server.stop();
}

#[test]
fn test_unknown_endpoint_returns_404() {
    let (mut server, _shared, base) = start();

    let resp = ureq::get(&format!("{base}/nonexistent")).call();
    assert_eq!(status_of(resp), 404);

    let resp = ureq::get(&format!("{base}/param")).call();
    assert_eq!(status_of(resp), 404);
    server.stop();
}
