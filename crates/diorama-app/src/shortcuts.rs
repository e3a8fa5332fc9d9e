//! Keyboard shortcuts for the debug commands.

use diorama_globe::DebugCommand;
use winit::keyboard::KeyCode;

/// The command bound to `key`, if any.
///
/// Ctrl+D toggles debug mode at any time. Every other binding only fires in
/// debug mode, with or without Ctrl.
pub fn shortcut_for(key: KeyCode, ctrl: bool, debug_mode: bool) -> Option<DebugCommand> {
    if key == KeyCode::KeyD && ctrl {
        return Some(DebugCommand::ToggleDebugMode);
    }
    if !debug_mode {
        return None;
    }
    let command = match key {
        KeyCode::KeyR => DebugCommand::ResetParameters,
        KeyCode::KeyF => DebugCommand::ToggleAutoFocus,
        KeyCode::KeyT => DebugCommand::ToggleTestObjects,
        KeyCode::KeyD => DebugCommand::DumpDepthOfField,
        KeyCode::KeyS => DebugCommand::LogState,
        KeyCode::KeyL => DebugCommand::ToggleFrameLogging,
        KeyCode::KeyA => DebugCommand::ToggleAutoRotate,
        KeyCode::KeyC => DebugCommand::CycleColorMode,
        KeyCode::Digit1 => DebugCommand::FocusOnTestObject(0),
        KeyCode::Digit2 => DebugCommand::FocusOnGlobe,
        KeyCode::Digit3 => DebugCommand::FocusOnTestObject(3),
        _ => return None,
    };
    Some(command)
}
