//! Drag-to-rotate interaction with momentum, auto-rotation and wobble.
//!
//! The controller is a two-state machine (idle / dragging) driven by pointer
//! events and a per-frame [`GlobeInteraction::update`]. Re-enabling
//! auto-rotation after momentum settles is modelled as a scheduled token
//! carrying the drag epoch it was issued in; a drag starting before the token
//! fires bumps the epoch and the token becomes a no-op.

use std::f32::consts::PI;

use diorama_config::AnimationConfig;
use glam::{EulerRot, Quat};
use serde::Serialize;

use crate::events::Notification;
use crate::hit_test::GlobeHitTest;
use crate::pointer::PointerSample;

/// Weight of the previous velocity when blending in a new drag delta.
const VELOCITY_CARRY: f32 = 0.2;
/// Weight of the newest drag delta.
const VELOCITY_BLEND: f32 = 0.8;

/// Tuning for [`GlobeInteraction`].
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionSettings {
    pub drag_sensitivity: f32,
    pub rotation_damping: f32,
    pub momentum_threshold: f32,
    /// Radians added per frame while auto-rotating.
    pub rotation_speed: f32,
    pub wobble_speed: f32,
    pub wobble_amount: f32,
    /// Seconds between momentum settling and auto-rotate re-arming.
    pub rearm_delay: f64,
}

impl InteractionSettings {
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self {
            drag_sensitivity: config.drag_sensitivity,
            rotation_damping: config.rotation_damping,
            momentum_threshold: config.momentum_threshold,
            rotation_speed: config.rotation_speed,
            wobble_speed: config.wobble_speed,
            wobble_amount: config.wobble_amount,
            rearm_delay: config.auto_rotate_delay_secs,
        }
    }
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self::from_config(&AnimationConfig::default())
    }
}

/// Rotation owned by the interaction controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RotationState {
    pub angle_y: f32,
    pub angular_velocity: f32,
    pub is_dragging: bool,
}

/// Presentation hint for the pointer cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorHint {
    #[default]
    Default,
    Grab,
    Grabbing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RearmToken {
    fire_at: f64,
    epoch: u64,
}

/// Converts pointer drags into globe rotation.
#[derive(Debug)]
pub struct GlobeInteraction {
    settings: InteractionSettings,
    state: RotationState,
    wobble_z: f32,
    previous: PointerSample,
    auto_rotate: bool,
    drag_epoch: u64,
    pending_rearm: Option<RearmToken>,
    /// `elapsed` of the latest [`GlobeInteraction::update`].
    last_update: f64,
    cursor: CursorHint,
    notifications: Vec<Notification>,
}

impl GlobeInteraction {
    pub fn new(settings: InteractionSettings, auto_rotate: bool) -> Self {
        Self {
            settings,
            state: RotationState::default(),
            wobble_z: 0.0,
            previous: PointerSample::default(),
            auto_rotate,
            drag_epoch: 0,
            pending_rearm: None,
            last_update: 0.0,
            cursor: CursorHint::Default,
            notifications: Vec::new(),
        }
    }

    pub fn from_config(config: &AnimationConfig) -> Self {
        Self::new(InteractionSettings::from_config(config), config.auto_rotate)
    }

    /// Start a drag if the sample hits the globe. Returns whether it did.
    pub fn pointer_down(&mut self, sample: PointerSample, hit: &impl GlobeHitTest) -> bool {
        if !hit.hits_globe(sample) {
            return false;
        }
        self.state.is_dragging = true;
        self.state.angular_velocity = 0.0;
        self.drag_epoch += 1;
        self.cursor = CursorHint::Grabbing;
        self.auto_rotate = false;
        self.notifications
            .push(Notification::AutoRotateChanged { enabled: false });
        self.previous = sample;
        tracing::debug!(epoch = self.drag_epoch, "drag started");
        true
    }

    pub fn pointer_move(&mut self, sample: PointerSample, hit: &impl GlobeHitTest) {
        if !self.state.is_dragging {
            self.cursor = if hit.hits_globe(sample) {
                CursorHint::Grab
            } else {
                CursorHint::Default
            };
            return;
        }

        let delta = sample.x - self.previous.x;
        let rotation_delta = delta * PI * self.settings.drag_sensitivity;
        self.state.angle_y += rotation_delta;
        self.state.angular_velocity =
            self.state.angular_velocity * VELOCITY_CARRY + rotation_delta * VELOCITY_BLEND;
        self.previous = sample;
    }

    /// End a drag (pointer released or left the window). Momentum is kept
    /// unless it is already at or below the threshold, in which case the
    /// globe settles right away.
    pub fn pointer_up(&mut self) {
        if self.state.is_dragging {
            self.state.is_dragging = false;
            self.cursor = CursorHint::Grab;
            if self.state.angular_velocity.abs() <= self.settings.momentum_threshold {
                self.settle(self.last_update);
            }
        }
    }

    /// Zero the velocity and schedule auto-rotate to re-arm.
    fn settle(&mut self, now: f64) {
        self.state.angular_velocity = 0.0;
        self.pending_rearm = Some(RearmToken {
            fire_at: now + self.settings.rearm_delay,
            epoch: self.drag_epoch,
        });
    }

    /// Per-frame step. `elapsed` is seconds since the driver started.
    pub fn update(&mut self, elapsed: f64) {
        self.last_update = elapsed;
        if let Some(token) = self.pending_rearm
            && elapsed >= token.fire_at
        {
            self.pending_rearm = None;
            if token.epoch == self.drag_epoch && !self.state.is_dragging {
                self.auto_rotate = true;
                self.notifications
                    .push(Notification::AutoRotateChanged { enabled: true });
                tracing::debug!("auto-rotate re-armed");
            }
        }

        let threshold = self.settings.momentum_threshold;
        if !self.state.is_dragging {
            let velocity = self.state.angular_velocity;
            if velocity.abs() > threshold {
                self.state.angle_y += velocity;
                self.state.angular_velocity *= self.settings.rotation_damping;
                if self.state.angular_velocity.abs() < threshold {
                    self.settle(elapsed);
                }
            } else if velocity != 0.0 {
                self.settle(elapsed);
            }
        }

        if self.auto_rotate && !self.state.is_dragging {
            self.state.angle_y += self.settings.rotation_speed;
        }

        self.wobble_z = ((elapsed * f64::from(self.settings.wobble_speed)) as f32 * PI).sin()
            * self.settings.wobble_amount;
    }

    /// External auto-rotate toggle.
    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.auto_rotate = enabled;
        self.notifications
            .push(Notification::AutoRotateChanged { enabled });
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn wobble(&self) -> f32 {
        self.wobble_z
    }

    pub fn cursor(&self) -> CursorHint {
        self.cursor
    }

    pub fn drag_epoch(&self) -> u64 {
        self.drag_epoch
    }

    pub fn has_pending_rearm(&self) -> bool {
        self.pending_rearm.is_some()
    }

    /// Orientation of the globe group: yaw from drag/momentum, roll from wobble.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, 0.0, self.state.angle_y, self.wobble_z)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Drop scheduled work and queued notifications.
    pub fn clear_pending(&mut self) {
        self.pending_rearm = None;
        self.notifications.clear();
    }
}
