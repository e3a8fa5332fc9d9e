//! HTTP debug server implementation.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use diorama_globe::{DebugCommand, Tunable};
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};

use crate::{ControlRequest, DebugShared};

#[derive(Debug, thiserror::Error)]
pub enum DebugServerError {
    #[error("Failed to bind to port {port}: {error}")]
    BindError { port: u16, error: String },
    #[error("Failed to spawn the server thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// HTTP server for the debug API, on a background thread.
pub struct DebugServer {
    port: u16,
    actual_port: Option<u16>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Deserialize)]
struct ParamBody {
    name: String,
    value: f32,
}

#[derive(Deserialize)]
struct CommandBody {
    command: String,
}

#[derive(Serialize)]
struct Accepted {
    accepted: bool,
}

#[derive(Serialize)]
struct Rejected {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: f64,
}

type JsonResponse = Response<Cursor<Vec<u8>>>;

fn json_response(status: u16, body: &impl Serialize) -> JsonResponse {
    let text = serde_json::to_string(body).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#));
    let mut response = Response::from_string(text).with_status_code(status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    response
}

fn reject(message: impl ToString) -> JsonResponse {
    json_response(
        400,
        &Rejected {
            error: message.to_string(),
        },
    )
}

/// Parse a `/param` body into a command. Errors are the 400 message.
fn parse_param(body: &str) -> Result<DebugCommand, String> {
    let param: ParamBody = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let tunable = param.name.parse::<Tunable>().map_err(|e| e.to_string())?;
    if !tunable.accepts(param.value) {
        return Err(format!("{} out of range for {}", param.value, tunable.name()));
    }
    Ok(DebugCommand::SetParameter(tunable, param.value))
}

/// Parse a `/command` body. `quit` closes the viewer.
fn parse_command(body: &str) -> Result<ControlRequest, String> {
    let command: CommandBody = serde_json::from_str(body).map_err(|e| e.to_string())?;
    if command.command == "quit" {
        return Ok(ControlRequest::Quit);
    }
    command
        .command
        .parse::<DebugCommand>()
        .map(ControlRequest::Command)
        .map_err(|e| e.to_string())
}

impl DebugServer {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            actual_port: None,
            handle: None,
        }
    }

    pub fn start(&mut self, shared: Arc<Mutex<DebugShared>>) -> Result<(), DebugServerError> {
        let server = Server::http(format!("127.0.0.1:{}", self.port)).map_err(|e| {
            DebugServerError::BindError {
                port: self.port,
                error: e.to_string(),
            }
        })?;

        let actual_port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(self.port);
        self.actual_port = Some(actual_port);

        let handle = thread::Builder::new()
            .name("debug-http".into())
            .spawn(move || Self::run_server(server, shared))
            .map_err(DebugServerError::Spawn)?;

        log::info!("Debug API listening on 127.0.0.1:{actual_port}");
        self.handle = Some(handle);
        Ok(())
    }

    /// Detach the server thread. tiny_http has no graceful shutdown, so the
    /// thread ends with the process.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            std::mem::forget(handle);
        }
    }

    pub fn actual_port(&self) -> u16 {
        self.actual_port.unwrap_or(self.port)
    }

    fn run_server(server: Server, shared: Arc<Mutex<DebugShared>>) {
        for request in server.incoming_requests() {
            if let Err(e) = Self::handle_request(request, &shared) {
                log::warn!("Debug server error: {e}");
            }
        }
    }

    fn handle_request(
        mut request: Request,
        shared: &Arc<Mutex<DebugShared>>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut body = String::new();
        if *request.method() == Method::Post {
            request.as_reader().read_to_string(&mut body)?;
        }

        let Ok(mut guard) = shared.lock() else {
            request.respond(
                Response::from_string("debug state unavailable").with_status_code(500),
            )?;
            return Ok(());
        };

        let response = match (request.method(), request.url()) {
            (&Method::Get, "/health") => json_response(
                200,
                &HealthResponse {
                    status: "ok",
                    uptime_seconds: guard.snapshot.uptime_seconds,
                },
            ),
            (&Method::Get, "/state") => json_response(200, &guard.snapshot),
            (&Method::Post, "/param") => match parse_param(&body) {
                Ok(command) => {
                    guard.push(ControlRequest::Command(command));
                    json_response(202, &Accepted { accepted: true })
                }
                Err(message) => reject(message),
            },
            (&Method::Post, "/command") => match parse_command(&body) {
                Ok(control) => {
                    guard.push(control);
                    json_response(202, &Accepted { accepted: true })
                }
                Err(message) => reject(message),
            },
            _ => Response::from_string("Not Found").with_status_code(404),
        };
        drop(guard);

        request.respond(response)?;
        Ok(())
    }
}

impl Drop for DebugServer {
    fn drop(&mut self) {
        self.stop();
    }
}
