//! State-change notifications emitted by the controllers and debug commands.

use serde::Serialize;

/// Debug toggles that report their state to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugFlag {
    DebugMode,
    AutoFocus,
    TestObjects,
    FrameLog,
}

impl DebugFlag {
    /// Stable key used in logs and the debug API.
    pub fn key(self) -> &'static str {
        match self {
            Self::DebugMode => "debug",
            Self::AutoFocus => "autofocus",
            Self::TestObjects => "testobjects",
            Self::FrameLog => "framelog",
        }
    }
}

/// Queued by the core, drained by the application once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    AutoRotateChanged { enabled: bool },
    DebugStateChanged { flag: DebugFlag, value: bool },
}
