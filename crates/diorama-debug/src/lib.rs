//! Localhost HTTP debug API for the diorama viewer.
//!
//! The server thread never touches viewer state. It answers reads from the
//! last published [`DebugSnapshot`] and queues [`ControlRequest`]s that the
//! main thread drains once per frame.

pub mod server;

pub use server::{DebugServer, DebugServerError};

#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use diorama_globe::{DebugCommand, RenderPath, RenderStats, StateReport};
use serde::Serialize;

/// Published by the main thread after every frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DebugSnapshot {
    pub frame: u64,
    pub fps: f64,
    pub uptime_seconds: f64,
    pub window_width: u32,
    pub window_height: u32,
    /// True until the globe textures have arrived.
    pub loading: bool,
    pub render_path: Option<RenderPath>,
    pub stats: RenderStats,
    /// Controller, focus and post-processing state; absent while loading.
    pub viewer: Option<StateReport>,
}

/// Work queued by the server for the main thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlRequest {
    Command(DebugCommand),
    Quit,
}

/// Requests kept while the main thread is not draining, e.g. when the
/// window is occluded and no redraws arrive.
pub const MAX_PENDING_REQUESTS: usize = 64;

/// State shared between the main thread and the server thread.
#[derive(Debug, Default)]
pub struct DebugShared {
    pub snapshot: DebugSnapshot,
    pending: VecDeque<ControlRequest>,
}

impl DebugShared {
    pub fn publish(&mut self, snapshot: DebugSnapshot) {
        self.snapshot = snapshot;
    }

    /// Queue a request. A full queue drops its oldest command; quit requests
    /// are never dropped.
    pub fn push(&mut self, request: ControlRequest) {
        if self.pending.len() >= MAX_PENDING_REQUESTS {
            let oldest_command = self
                .pending
                .iter()
                .position(|r| matches!(r, ControlRequest::Command(_)));
            match oldest_command {
                Some(index) => {
                    self.pending.remove(index);
                }
                None => return,
            }
            log::warn!("Debug request queue full, dropped the oldest command");
        }
        self.pending.push_back(request);
    }

    /// Take every queued request, oldest first.
    pub fn drain(&mut self) -> Vec<ControlRequest> {
        self.pending.drain(..).collect()
    }
}
