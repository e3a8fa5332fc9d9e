//! Pointer-driven auto-focus for the depth-of-field pass.

use serde::Serialize;

use crate::pointer::PointerSample;

/// Per-frame interpolation factor toward the target focus.
const FOCUS_SMOOTHING: f32 = 0.1;
/// World units of focus travel per unit of normalized pointer `y`.
const FOCUS_RANGE: f32 = 3.0;

/// Receives the smoothed focus distance every frame.
pub trait FocusSink {
    fn update_focus(&mut self, focus: f32);
}

/// Snapshot of the focus controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusState {
    pub current_focus: f32,
    pub target_focus: f32,
    pub enabled: bool,
}

/// Maps the pointer's vertical position to a focus distance and eases toward it.
#[derive(Debug, Clone)]
pub struct FocusController {
    current_focus: f32,
    target_focus: f32,
    base_distance: f32,
    pointer_y: f32,
    enabled: bool,
}

impl FocusController {
    /// `initial_focus` seeds the current value; `base_distance` is the camera's
    /// distance to the globe center along the view axis.
    pub fn new(initial_focus: f32, base_distance: f32) -> Self {
        Self {
            current_focus: initial_focus,
            target_focus: initial_focus,
            base_distance,
            pointer_y: 0.0,
            enabled: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flip auto-focus and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn on_pointer_move(&mut self, sample: PointerSample) {
        if self.enabled {
            self.pointer_y = sample.y;
        }
    }

    /// Advance one frame. Returns the focus pushed to the sink, if any.
    pub fn update(&mut self, sink: Option<&mut dyn FocusSink>) -> Option<f32> {
        if !self.enabled {
            return None;
        }
        let sink = sink?;
        self.target_focus = self.base_distance + self.pointer_y * FOCUS_RANGE;
        self.current_focus += (self.target_focus - self.current_focus) * FOCUS_SMOOTHING;
        sink.update_focus(self.current_focus);
        Some(self.current_focus)
    }

    pub fn current_focus(&self) -> f32 {
        self.current_focus
    }

    pub fn state(&self) -> FocusState {
        FocusState {
            current_focus: self.current_focus,
            target_focus: self.target_focus,
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        values: Vec<f32>,
    }

    impl FocusSink for RecordingSink {
        fn update_focus(&mut self, focus: f32) {
            self.values.push(focus);
        }
    }

    #[test]
    fn test_disabled_controller_holds_value() {
        let mut focus = FocusController::new(9.0, 9.0);
        let mut sink = RecordingSink::default();
        focus.on_pointer_move(PointerSample::new(0.0, 1.0));
        assert_eq!(focus.update(Some(&mut sink)), None);
        assert_eq!(focus.current_focus(), 9.0);
        assert!(sink.values.is_empty());
    }

    #[test]
    fn test_pointer_ignored_while_disabled() {
        let mut focus = FocusController::new(9.0, 9.0);
        focus.on_pointer_move(PointerSample::new(0.0, 1.0));
        focus.set_enabled(true);
        let mut sink = RecordingSink::default();
        focus.update(Some(&mut sink));
        // Pointer y was never recorded, so the target is the base distance.
        assert_eq!(focus.state().target_focus, 9.0);
    }

    #[test]
    fn test_missing_sink_skips_update() {
        let mut focus = FocusController::new(9.0, 9.0);
        focus.toggle();
        focus.on_pointer_move(PointerSample::new(0.0, 1.0));
        assert_eq!(focus.update(None), None);
        assert_eq!(focus.current_focus(), 9.0);
    }

    #[test]
    fn test_smoothing_converges_geometrically() {
        let c0 = 9.0f32;
        let mut focus = FocusController::new(c0, 9.0);
        assert!(focus.toggle());
        focus.on_pointer_move(PointerSample::new(0.3, -0.5));
        let target = 9.0 - 0.5 * 3.0;

        let mut sink = RecordingSink::default();
        for n in 1..=30 {
            focus.update(Some(&mut sink));
            let expected = target - (target - c0) * 0.9f32.powi(n);
            assert!(
                (focus.current_focus() - expected).abs() < 1e-4,
                "tick {n}: {} vs {expected}",
                focus.current_focus()
            );
        }
        assert_eq!(sink.values.len(), 30);
        assert_eq!(sink.values.last().copied(), Some(focus.current_focus()));
    }

    #[test]
    fn test_toggle_off_freezes_current_value() {
        let mut focus = FocusController::new(9.0, 9.0);
        focus.toggle();
        focus.on_pointer_move(PointerSample::new(0.0, 1.0));
        let mut sink = RecordingSink::default();
        focus.update(Some(&mut sink));
        let frozen = focus.current_focus();
        assert!(!focus.toggle());
        focus.update(Some(&mut sink));
        assert_eq!(focus.current_focus(), frozen);
        assert_eq!(sink.values.len(), 1);
    }
}
