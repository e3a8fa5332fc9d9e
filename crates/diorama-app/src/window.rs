//! Window creation and event handling via winit.
//!
//! [`ViewerState`] implements winit's [`ApplicationHandler`]. The GPU side is
//! brought up on `resumed`; the globe textures arrive later from the
//! [`AssetLoader`] and until then every frame is cleared to black.

use std::sync::{Arc, Mutex};

use diorama_config::Config;
use diorama_debug::{ControlRequest, DebugServer, DebugShared, DebugSnapshot};
use diorama_globe::{
    AnimationDriver, CursorHint, GlobeApp, Notification, PointerEvent, PointerSample, PostParams,
    PostProcessing, RenderPath,
};
use diorama_render::{
    ChainSettings, DepthBuffer, GpuEffectChain, GpuFrame, RenderContext, SceneRenderer,
    StarField, SurfaceError, clear_frame, init_render_context_blocking,
};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::error::EventLoopError;
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{ModifiersState, PhysicalKey};
use winit::window::{CursorIcon, Fullscreen, Window, WindowAttributes, WindowId};

use crate::assets::AssetLoader;
use crate::frame_clock::FrameClock;
use crate::shortcuts::shortcut_for;

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            f64::from(config.window.width),
            f64::from(config.window.height),
        ))
        .with_fullscreen(
            config
                .window
                .fullscreen
                .then_some(Fullscreen::Borderless(None)),
        )
}

pub fn cursor_icon(hint: CursorHint) -> CursorIcon {
    match hint {
        CursorHint::Default => CursorIcon::Default,
        CursorHint::Grab => CursorIcon::Grab,
        CursorHint::Grabbing => CursorIcon::Grabbing,
    }
}

/// GPU resources owned by the window.
struct Graphics {
    gpu: RenderContext,
    /// Depth for frames drawn straight to the swapchain.
    direct_depth: DepthBuffer,
    /// Present once the globe textures are uploaded.
    scene: Option<SceneRenderer>,
}

/// Application state: the window, the GPU, the globe and the debug API.
pub struct ViewerState {
    config: Config,
    window: Option<Arc<Window>>,
    graphics: Option<Graphics>,
    app: Option<GlobeApp<GpuEffectChain>>,
    driver: AnimationDriver,
    clock: FrameClock,
    assets: Option<AssetLoader>,
    stars: StarField,
    debug_server: Option<DebugServer>,
    debug_shared: Arc<Mutex<DebugShared>>,
    modifiers: ModifiersState,
    cursor_position: Option<PhysicalPosition<f64>>,
    cursor: CursorHint,
    last_path: Option<RenderPath>,
}

impl ViewerState {
    pub fn new(config: Config) -> Self {
        let stars = StarField::generate(&config.stars);
        Self {
            config,
            window: None,
            graphics: None,
            app: None,
            driver: AnimationDriver::new(),
            clock: FrameClock::new(),
            assets: None,
            stars,
            debug_server: None,
            debug_shared: Arc::new(Mutex::new(DebugShared::default())),
            modifiers: ModifiersState::empty(),
            cursor_position: None,
            cursor: CursorHint::Default,
            last_path: None,
        }
    }

    /// Whether the globe textures have not been uploaded yet.
    pub fn is_loading(&self) -> bool {
        self.graphics.as_ref().is_none_or(|g| g.scene.is_none())
    }

    fn surface_size(&self) -> (u32, u32) {
        self.graphics
            .as_ref()
            .map(|g| g.gpu.size())
            .unwrap_or((self.config.window.width, self.config.window.height))
    }

    fn pointer_sample(&self, position: PhysicalPosition<f64>) -> PointerSample {
        let (width, height) = self.surface_size();
        PointerSample::from_pixels(position.x, position.y, width, height)
    }

    /// The app, once the globe is on screen. Input is dropped until then.
    fn interactive_app(&mut self) -> Option<&mut GlobeApp<GpuEffectChain>> {
        if self.is_loading() {
            return None;
        }
        self.app.as_mut()
    }

    fn send_pointer(&mut self, event: PointerEvent) {
        if let Some(app) = self.interactive_app() {
            app.handle_pointer(event);
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) {
        let window = match event_loop.create_window(window_attributes_from_config(&self.config)) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let gpu = match init_render_context_blocking(window.clone(), self.config.window.vsync) {
            Ok(gpu) => gpu,
            Err(e) => {
                error!("GPU initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };
        let (width, height) = gpu.size();
        info!(
            "Surface {}x{} ({:?}, scale {:.2})",
            width,
            height,
            gpu.surface_format,
            window.scale_factor()
        );

        let settings = ChainSettings::from_config(&self.config);
        let post = PostProcessing::new(PostParams::from_config(&self.config.post_processing), || {
            GpuEffectChain::new(
                &gpu.device,
                &gpu.adapter,
                gpu.surface_format,
                settings,
                width,
                height,
            )
        });
        self.app = Some(GlobeApp::new(&self.config, width, height, post));

        let direct_depth = DepthBuffer::new(&gpu.device, "direct-depth", width, height);
        self.graphics = Some(Graphics {
            gpu,
            direct_depth,
            scene: None,
        });
        self.assets = Some(AssetLoader::spawn(self.config.assets.texture_dir.clone()));

        if self.config.debug.debug_api {
            let mut server = DebugServer::new(self.config.debug.debug_port);
            match server.start(self.debug_shared.clone()) {
                Ok(()) => {
                    info!("Debug API started on port {}", server.actual_port());
                    self.debug_server = Some(server);
                }
                Err(e) => warn!("Failed to start debug server: {e}"),
            }
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(graphics) = &mut self.graphics {
            graphics.gpu.resize(width, height);
            graphics
                .direct_depth
                .resize(&graphics.gpu.device, width, height);
        }
        if let Some(app) = &mut self.app {
            app.resize(width, height);
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(server) = &mut self.debug_server {
            server.stop();
        }
        if let Some(app) = &mut self.app {
            drop(app.dispose());
        }
        event_loop.exit();
    }

    /// Apply requests queued by the debug API. Returns `true` on quit.
    fn drain_debug_requests(&mut self) -> bool {
        let requests = match self.debug_shared.lock() {
            Ok(mut shared) => shared.drain(),
            Err(_) => return false,
        };
        for request in requests {
            match request {
                ControlRequest::Quit => {
                    info!("Quit requested via debug API");
                    return true;
                }
                ControlRequest::Command(command) => {
                    if let Some(app) = &mut self.app {
                        app.apply(command);
                    }
                }
            }
        }
        false
    }

    /// Upload the textures once the loader delivers them.
    fn poll_assets(&mut self) -> Result<(), diorama_render::ShaderError> {
        let Some(textures) = self.assets.as_mut().and_then(AssetLoader::poll) else {
            return Ok(());
        };
        self.assets = None;
        let Some(graphics) = &mut self.graphics else {
            return Ok(());
        };
        let scene = SceneRenderer::new(
            &graphics.gpu.device,
            &graphics.gpu.queue,
            &textures,
            &self.config,
            &self.stars,
        )?;
        graphics.scene = Some(scene);
        if let Some(app) = &mut self.app {
            app.mark_materials_ready();
        }
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.drain_debug_requests() {
            self.shutdown(event_loop);
            return;
        }
        if let Err(e) = self.poll_assets() {
            error!("Scene setup failed: {e}");
            self.shutdown(event_loop);
            return;
        }

        let time = self.clock.tick();

        let (Some(graphics), Some(app)) = (&mut self.graphics, &mut self.app) else {
            return;
        };
        let Graphics {
            gpu,
            direct_depth,
            scene,
        } = graphics;

        let surface_texture = match gpu.get_current_texture() {
            Ok(texture) => texture,
            Err(SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                self.shutdown(event_loop);
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("Surface timeout, skipping frame");
                self.request_redraw();
                return;
            }
            Err(SurfaceError::Lost) => {
                warn!("Surface lost, skipping frame");
                self.request_redraw();
                return;
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });

        match scene {
            Some(scene) => {
                let mut frame = GpuFrame {
                    device: &gpu.device,
                    queue: &gpu.queue,
                    encoder: &mut encoder,
                    target: &view,
                    target_format: gpu.surface_format,
                    scene,
                    direct_depth,
                };
                let report = self.driver.tick(app, time, &mut frame);
                if self.last_path != Some(report.path) {
                    info!("Render path: {:?}", report.path);
                }
                self.last_path = Some(report.path);
            }
            None => clear_frame(&mut encoder, &view),
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        for notification in app.take_notifications() {
            log_notification(notification);
        }

        if self.debug_server.is_some() {
            self.publish_snapshot();
        }
        self.update_cursor();
        self.request_redraw();
    }

    fn publish_snapshot(&self) {
        let (window_width, window_height) = self.surface_size();
        let stats = self
            .graphics
            .as_ref()
            .and_then(|g| g.scene.as_ref())
            .map(SceneRenderer::stats)
            .unwrap_or_default();
        let snapshot = DebugSnapshot {
            frame: self.clock.frames(),
            fps: self.clock.fps(),
            uptime_seconds: self.clock.elapsed(),
            window_width,
            window_height,
            loading: self.is_loading(),
            render_path: self.last_path,
            stats,
            viewer: self.app.as_ref().map(GlobeApp::state_report),
        };
        if let Ok(mut shared) = self.debug_shared.lock() {
            shared.publish(snapshot);
        }
    }

    fn update_cursor(&mut self) {
        let Some(hint) = self.app.as_ref().map(GlobeApp::cursor) else {
            return;
        };
        if hint == self.cursor {
            return;
        }
        self.cursor = hint;
        if let Some(window) = &self.window {
            window.set_cursor(cursor_icon(hint));
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn log_notification(notification: Notification) {
    match notification {
        Notification::AutoRotateChanged { enabled } => {
            info!("Auto-rotate {}", if enabled { "enabled" } else { "disabled" });
        }
        Notification::DebugStateChanged { flag, value } => {
            info!("Debug state changed: {} = {}", flag.key(), value);
        }
    }
}

impl ApplicationHandler for ViewerState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            self.initialize(event_loop);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let ctrl = self.modifiers.control_key();
                if let Some(app) = self.interactive_app()
                    && let Some(command) = shortcut_for(code, ctrl, app.flags.debug_mode)
                {
                    app.apply(command);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = Some(position);
                let sample = self.pointer_sample(position);
                self.send_pointer(PointerEvent::Move(sample));
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    if let Some(position) = self.cursor_position {
                        let sample = self.pointer_sample(position);
                        self.send_pointer(PointerEvent::Down(sample));
                    }
                }
                ElementState::Released => self.send_pointer(PointerEvent::Up),
            },
            WindowEvent::CursorLeft { .. } => {
                self.cursor_position = None;
                self.send_pointer(PointerEvent::Leave);
            }
            WindowEvent::Touch(touch) => {
                let sample = self.pointer_sample(touch.location);
                match touch.phase {
                    TouchPhase::Started => self.send_pointer(PointerEvent::Down(sample)),
                    TouchPhase::Moved => self.send_pointer(PointerEvent::Move(sample)),
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.send_pointer(PointerEvent::Up)
                    }
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Creates an event loop and runs the viewer until the window closes.
pub fn run(config: Config) -> Result<(), EventLoopError> {
    let event_loop = EventLoop::new()?;
    let mut state = ViewerState::new(config);
    event_loop.run_app(&mut state)
}
