//! Diorama globe viewer application.
//!
//! Window creation, event routing, asset loading and the frame loop.

pub mod assets;
pub mod frame_clock;
pub mod platform;
pub mod shortcuts;
pub mod window;
