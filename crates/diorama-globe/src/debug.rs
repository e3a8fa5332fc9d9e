//! Debug commands shared by the keyboard shortcuts and the HTTP debug API.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A live-tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tunable {
    Focus,
    Aperture,
    MaxBlur,
    Saturation,
    Displacement,
}

impl Tunable {
    pub const ALL: [Self; 5] = [
        Self::Focus,
        Self::Aperture,
        Self::MaxBlur,
        Self::Saturation,
        Self::Displacement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Aperture => "aperture",
            Self::MaxBlur => "maxblur",
            Self::Saturation => "saturation",
            Self::Displacement => "displacement",
        }
    }

    /// Whether `value` is finite and inside the parameter's valid range.
    pub fn accepts(self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Self::Aperture => value > 0.0,
            Self::Focus | Self::MaxBlur | Self::Saturation | Self::Displacement => value >= 0.0,
        }
    }
}

impl fmt::Display for Tunable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tunable {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| CommandParseError::UnknownTunable(s.to_string()))
    }
}

/// Every debug action the viewer understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DebugCommand {
    ToggleDebugMode,
    ResetParameters,
    ToggleAutoFocus,
    ToggleTestObjects,
    DumpDepthOfField,
    LogState,
    ToggleFrameLogging,
    ToggleAutoRotate,
    CycleColorMode,
    /// Focus on the test object with this index.
    FocusOnTestObject(usize),
    /// Focus on the globe's near surface.
    FocusOnGlobe,
    SetParameter(Tunable, f32),
}

/// Errors from parsing a command or tunable name.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandParseError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown parameter: {0}")]
    UnknownTunable(String),
    #[error("invalid test object index: {0}")]
    BadIndex(String),
}

impl FromStr for DebugCommand {
    type Err = CommandParseError;

    /// Parses snake_case names. `focus_object:<index>` selects a test object.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "toggle_debug_mode" => Self::ToggleDebugMode,
            "reset_parameters" => Self::ResetParameters,
            "toggle_auto_focus" => Self::ToggleAutoFocus,
            "toggle_test_objects" => Self::ToggleTestObjects,
            "dump_dof" => Self::DumpDepthOfField,
            "log_state" => Self::LogState,
            "toggle_frame_logging" => Self::ToggleFrameLogging,
            "toggle_auto_rotate" => Self::ToggleAutoRotate,
            "cycle_color_mode" => Self::CycleColorMode,
            "focus_globe" => Self::FocusOnGlobe,
            other => {
                let Some(index) = other.strip_prefix("focus_object:") else {
                    return Err(CommandParseError::UnknownCommand(other.to_string()));
                };
                let index = index
                    .parse()
                    .map_err(|_| CommandParseError::BadIndex(index.to_string()))?;
                Self::FocusOnTestObject(index)
            }
        };
        Ok(command)
    }
}

/// Debug toggles not owned by a controller or the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DebugFlags {
    pub debug_mode: bool,
    pub log_frame_info: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "toggle_auto_focus".parse::<DebugCommand>(),
            Ok(DebugCommand::ToggleAutoFocus)
        );
        assert_eq!(
            "dump_dof".parse::<DebugCommand>(),
            Ok(DebugCommand::DumpDepthOfField)
        );
        assert_eq!(
            "focus_object:3".parse::<DebugCommand>(),
            Ok(DebugCommand::FocusOnTestObject(3))
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(
            "explode".parse::<DebugCommand>(),
            Err(CommandParseError::UnknownCommand("explode".to_string()))
        );
        assert_eq!(
            "focus_object:x".parse::<DebugCommand>(),
            Err(CommandParseError::BadIndex("x".to_string()))
        );
        assert!("Focus".parse::<Tunable>().is_err());
    }

    #[test]
    fn test_tunable_names_round_trip() {
        for tunable in Tunable::ALL {
            assert_eq!(tunable.name().parse::<Tunable>(), Ok(tunable));
        }
    }

    #[test]
    fn test_tunable_ranges() {
        assert!(Tunable::Focus.accepts(0.0));
        assert!(!Tunable::Focus.accepts(-1.0));
        assert!(!Tunable::Aperture.accepts(0.0));
        assert!(Tunable::Aperture.accepts(0.1));
        assert!(Tunable::MaxBlur.accepts(0.0));
        assert!(!Tunable::Saturation.accepts(f32::NAN));
        assert!(!Tunable::Displacement.accepts(f32::INFINITY));
    }
}
