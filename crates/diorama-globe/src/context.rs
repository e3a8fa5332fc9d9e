//! The application context: every piece of viewer state in one owner.

use diorama_config::Config;
use glam::Vec3;
use serde::Serialize;

use crate::camera::Camera;
use crate::debug::{DebugCommand, DebugFlags, Tunable};
use crate::events::{DebugFlag, Notification};
use crate::focus::{FocusController, FocusState};
use crate::hit_test::SphereHitTest;
use crate::interaction::{CursorHint, GlobeInteraction, RotationState};
use crate::pointer::PointerEvent;
use crate::post::{DofUniforms, EffectChain, PostParams, PostParamsUpdate, PostProcessing};
use crate::scene::{GlobeScene, SceneSummary, TEST_OBJECTS};

#[derive(Debug, Clone, Copy)]
struct ResetDefaults {
    post: PostParams,
    displacement: f32,
}

/// Serializable view of the whole viewer state.
#[derive(Debug, Clone, Serialize)]
pub struct StateReport {
    pub rotation: RotationState,
    pub wobble: f32,
    pub auto_rotate: bool,
    pub cursor: CursorHint,
    pub focus: FocusState,
    pub params: PostParams,
    /// Live DOF uniforms, absent when post-processing is degraded.
    pub dof: Option<DofUniforms>,
    pub degraded: bool,
    pub flags: DebugFlags,
    pub scene: SceneSummary,
    pub camera_position: [f32; 3],
}

/// Owns the camera, scene, controllers and post-processing pipeline.
///
/// Built once at startup. Pointer events and debug commands are applied
/// synchronously; the [`AnimationDriver`](crate::AnimationDriver) advances it
/// once per frame.
pub struct GlobeApp<C> {
    pub camera: Camera,
    pub scene: GlobeScene,
    pub interaction: GlobeInteraction,
    pub focus: FocusController,
    pub post: PostProcessing<C>,
    pub flags: DebugFlags,
    defaults: ResetDefaults,
    notifications: Vec<Notification>,
}

impl<C: EffectChain> GlobeApp<C> {
    pub fn new(config: &Config, width: u32, height: u32, post: PostProcessing<C>) -> Self {
        let camera = Camera::from_config(&config.camera, width, height);
        let params = PostParams::from_config(&config.post_processing);
        let focus = FocusController::new(params.focus, camera.position.z);

        let mut app = Self {
            camera,
            scene: GlobeScene::from_config(config),
            interaction: GlobeInteraction::from_config(&config.animation),
            focus,
            post,
            flags: DebugFlags {
                debug_mode: config.debug.start_in_debug_mode,
                log_frame_info: false,
            },
            defaults: ResetDefaults {
                post: params,
                displacement: config.earth.displacement_scale,
            },
            notifications: Vec::new(),
        };

        app.post.on_window_resize(width, height);
        app.post.set_parameters(&PostParamsUpdate::full(params));
        app.reset_parameters();
        app
    }

    /// Route a pointer event to the interaction and focus controllers.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let hit = SphereHitTest::new(&self.camera, Vec3::ZERO, self.scene.radius);
        match event {
            PointerEvent::Down(sample) => {
                self.interaction.pointer_down(sample, &hit);
            }
            PointerEvent::Move(sample) => {
                self.interaction.pointer_move(sample, &hit);
                self.focus.on_pointer_move(sample);
            }
            PointerEvent::Up | PointerEvent::Leave => self.interaction.pointer_up(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect_ratio(width, height);
        self.post.on_window_resize(width, height);
    }

    pub fn apply(&mut self, command: DebugCommand) {
        match command {
            DebugCommand::ToggleDebugMode => {
                self.flags.debug_mode = !self.flags.debug_mode;
                self.notify_flag(DebugFlag::DebugMode, self.flags.debug_mode);
            }
            DebugCommand::ResetParameters => self.reset_parameters(),
            DebugCommand::ToggleAutoFocus => {
                let enabled = self.focus.toggle();
                self.notify_flag(DebugFlag::AutoFocus, enabled);
            }
            DebugCommand::ToggleTestObjects => {
                self.scene.show_test_objects = !self.scene.show_test_objects;
                self.notify_flag(DebugFlag::TestObjects, self.scene.show_test_objects);
            }
            DebugCommand::DumpDepthOfField => {
                self.post.debug_dof();
            }
            DebugCommand::LogState => {
                tracing::info!(state = ?self.state_report(), "STATE");
            }
            DebugCommand::ToggleFrameLogging => {
                self.flags.log_frame_info = !self.flags.log_frame_info;
                self.notify_flag(DebugFlag::FrameLog, self.flags.log_frame_info);
            }
            DebugCommand::ToggleAutoRotate => {
                let enabled = !self.interaction.auto_rotate();
                self.interaction.set_auto_rotate(enabled);
            }
            DebugCommand::CycleColorMode => {
                if !self.scene.materials_ready {
                    return;
                }
                let mode = self.scene.terrain.debug_mode.next();
                self.scene.terrain.debug_mode = mode;
                tracing::info!("Color Debug Mode: {}", mode.label());
            }
            DebugCommand::FocusOnTestObject(index) => {
                if let Some(object) = TEST_OBJECTS.get(index) {
                    let distance = self.camera.distance_to(object.position);
                    self.set_parameter(Tunable::Focus, distance);
                }
            }
            DebugCommand::FocusOnGlobe => {
                let distance = self.camera.distance_to(Vec3::ZERO) - self.scene.radius;
                self.set_parameter(Tunable::Focus, distance);
            }
            DebugCommand::SetParameter(tunable, value) => {
                self.set_parameter(tunable, value);
            }
        }
    }

    /// Apply one tunable. Invalid values are logged and ignored.
    pub fn set_parameter(&mut self, tunable: Tunable, value: f32) -> bool {
        if !tunable.accepts(value) {
            tracing::warn!(parameter = %tunable, value, "ignoring out-of-range parameter");
            return false;
        }
        let update = PostParamsUpdate::default();
        match tunable {
            Tunable::Focus => self.post.set_parameters(&update.focus(value)),
            Tunable::Aperture => self.post.set_parameters(&update.aperture(value)),
            Tunable::MaxBlur => self.post.set_parameters(&update.maxblur(value)),
            Tunable::Saturation => self.post.set_parameters(&update.saturation(value)),
            Tunable::Displacement => self.scene.set_displacement_scale(value),
        }
        tracing::debug!(parameter = %tunable, value, "parameter updated");
        true
    }

    /// Restore the configured post-processing and displacement defaults.
    pub fn reset_parameters(&mut self) {
        let defaults = self.defaults;
        self.post
            .set_parameters(&PostParamsUpdate::full(defaults.post));
        self.scene.set_displacement_scale(defaults.displacement);
    }

    /// Called once the globe materials exist.
    pub fn mark_materials_ready(&mut self) {
        self.scene.materials_ready = true;
    }

    pub fn cursor(&self) -> CursorHint {
        self.interaction.cursor()
    }

    /// Drain notifications from the context and its controllers.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let mut out = self.interaction.take_notifications();
        out.append(&mut self.notifications);
        out
    }

    pub fn state_report(&self) -> StateReport {
        StateReport {
            rotation: self.interaction.state(),
            wobble: self.interaction.wobble(),
            auto_rotate: self.interaction.auto_rotate(),
            cursor: self.interaction.cursor(),
            focus: self.focus.state(),
            params: self.post.params(),
            dof: self.post.chain().map(|chain| *chain.dof()),
            degraded: self.post.is_degraded(),
            flags: self.flags,
            scene: self.scene.summary(),
            camera_position: self.camera.position.to_array(),
        }
    }

    /// Release the effect chain and drop pending work. Returns the chain.
    pub fn dispose(&mut self) -> Option<C> {
        self.interaction.clear_pending();
        self.notifications.clear();
        self.scene.materials_ready = false;
        self.post.dispose()
    }

    fn notify_flag(&mut self, flag: DebugFlag, value: bool) {
        tracing::info!(flag = flag.key(), value, "debug state changed");
        self.notifications
            .push(Notification::DebugStateChanged { flag, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::ColorDebugMode;
    use crate::pointer::PointerSample;
    use crate::post::APERTURE_UNIT_SCALE;
    use crate::post::tests::{MockChain, degraded, working};

    fn app() -> GlobeApp<MockChain> {
        GlobeApp::new(&Config::default(), 1280, 720, working())
    }

    #[test]
    fn test_startup_pushes_configured_parameters() {
        let app = app();
        let chain = app.post.chain().unwrap();
        assert_eq!(chain.dof.focus, 9.0);
        assert_eq!(chain.dof.aperture, 4.5 * APERTURE_UNIT_SCALE);
        assert_eq!(chain.grade.saturation, 1.3);
        assert!((chain.dof.aspect - 1280.0 / 720.0).abs() < 1e-6);
        assert_eq!(app.scene.displacement_scale(), 0.15);
    }

    #[test]
    fn test_drag_on_globe_rotates() {
        let mut app = app();
        app.handle_pointer(PointerEvent::Down(PointerSample::new(0.0, 0.0)));
        assert!(app.interaction.state().is_dragging);
        app.handle_pointer(PointerEvent::Move(PointerSample::new(0.2, 0.0)));
        app.handle_pointer(PointerEvent::Leave);
        assert!(!app.interaction.state().is_dragging);
        assert!(app.interaction.state().angle_y > 0.0);
        assert_eq!(
            app.take_notifications(),
            vec![Notification::AutoRotateChanged { enabled: false }]
        );
    }

    #[test]
    fn test_press_off_globe_does_not_drag() {
        let mut app = app();
        app.handle_pointer(PointerEvent::Down(PointerSample::new(0.95, 0.9)));
        assert!(!app.interaction.state().is_dragging);
    }

    #[test]
    fn test_toggles_emit_notifications() {
        let mut app = app();
        app.apply(DebugCommand::ToggleAutoFocus);
        app.apply(DebugCommand::ToggleTestObjects);
        app.apply(DebugCommand::ToggleFrameLogging);
        assert!(app.focus.enabled());
        assert!(app.scene.show_test_objects);
        assert!(app.flags.log_frame_info);
        let keys: Vec<_> = app
            .take_notifications()
            .into_iter()
            .map(|n| match n {
                Notification::DebugStateChanged { flag, value } => (flag.key(), value),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            keys,
            vec![("autofocus", true), ("testobjects", true), ("framelog", true)]
        );
    }

    #[test]
    fn test_toggle_auto_rotate() {
        let mut app = app();
        assert!(app.interaction.auto_rotate());
        app.apply(DebugCommand::ToggleAutoRotate);
        assert!(!app.interaction.auto_rotate());
        assert_eq!(
            app.take_notifications(),
            vec![Notification::AutoRotateChanged { enabled: false }]
        );
    }

    #[test]
    fn test_color_mode_waits_for_materials() {
        let mut app = app();
        app.apply(DebugCommand::CycleColorMode);
        assert_eq!(app.scene.terrain.debug_mode, ColorDebugMode::Normal);

        app.mark_materials_ready();
        app.apply(DebugCommand::CycleColorMode);
        assert_eq!(app.scene.terrain.debug_mode, ColorDebugMode::HeightMap);
    }

    #[test]
    fn test_focus_presets() {
        let mut app = app();
        app.apply(DebugCommand::FocusOnTestObject(0));
        let expected = Vec3::new(0.0, 0.0, 9.0).distance(Vec3::new(-3.0, 1.0, 4.0));
        assert!((app.post.params().focus - expected).abs() < 1e-5);
        assert!((expected - 5.91608).abs() < 1e-4);

        app.apply(DebugCommand::FocusOnGlobe);
        assert!((app.post.params().focus - 6.5).abs() < 1e-6);
        assert!((app.post.chain().unwrap().dof.focus - 6.5).abs() < 1e-6);

        app.apply(DebugCommand::FocusOnTestObject(3));
        assert!((app.post.params().focus - 19.33908).abs() < 1e-4);

        app.apply(DebugCommand::FocusOnTestObject(9));
        assert!((app.post.params().focus - 19.33908).abs() < 1e-4);
    }

    #[test]
    fn test_set_parameter_validates() {
        let mut app = app();
        assert!(!app.set_parameter(Tunable::Aperture, 0.0));
        assert!(!app.set_parameter(Tunable::Focus, f32::NAN));
        assert_eq!(app.post.params().aperture, 4.5);

        assert!(app.set_parameter(Tunable::Displacement, 0.3));
        assert_eq!(app.scene.clouds.displacement.get(), 0.3);
        assert_eq!(app.post.params(), PostParams::default());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut app = app();
        app.apply(DebugCommand::SetParameter(Tunable::Saturation, 0.2));
        app.apply(DebugCommand::SetParameter(Tunable::Displacement, 0.5));
        app.apply(DebugCommand::ResetParameters);
        assert_eq!(app.post.params(), PostParams::default());
        assert_eq!(app.post.chain().unwrap().grade.saturation, 1.3);
        assert_eq!(app.scene.displacement_scale(), 0.15);
    }

    #[test]
    fn test_degraded_app_still_accepts_commands() {
        let mut app = GlobeApp::new(&Config::default(), 800, 600, degraded());
        app.apply(DebugCommand::DumpDepthOfField);
        app.apply(DebugCommand::FocusOnGlobe);
        app.resize(1024, 768);
        assert_eq!(app.post.params().focus, 6.5);
        let report = app.state_report();
        assert!(report.degraded);
        assert!(report.dof.is_none());
    }

    #[test]
    fn test_dispose_releases_chain_and_pending_work() {
        let mut app = app();
        app.mark_materials_ready();
        app.apply(DebugCommand::ToggleAutoFocus);
        assert!(app.dispose().is_some());
        assert!(app.post.is_degraded());
        assert!(!app.scene.materials_ready);
        assert!(app.take_notifications().is_empty());
    }

    #[test]
    fn test_resize_updates_camera_aspect() {
        let mut app = app();
        app.resize(500, 1000);
        assert!((app.camera.aspect - 0.5).abs() < 1e-6);
        assert!((app.post.chain().unwrap().dof.aspect - 0.5).abs() < 1e-6);
    }
}
