//! Adapter, device and swapchain for the viewer window.

use std::sync::Arc;
use winit::window::Window;

/// The viewer cannot start rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("window surface unavailable: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no GPU adapter can present to this window")]
    NoAdapter,

    #[error("GPU device refused: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("the surface reports no usable texture format")]
    NoSurfaceFormat,
}

/// Failure to acquire the next swapchain image.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// Lost and still unavailable after reconfiguring.
    #[error("surface lost")]
    Lost,

    #[error("out of memory")]
    OutOfMemory,

    /// Skip the frame.
    #[error("timeout")]
    Timeout,
}

/// Everything the renderer needs from the GPU, plus the configured surface.
pub struct RenderContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
}

impl RenderContext {
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let initial = window.inner_size();
        let surface = instance.create_surface(window)?;

        let adapter = pick_adapter(&instance, &surface).await?;
        let (device, queue) = open_device(&adapter).await?;

        let surface_config = surface_config_for(
            &surface.get_capabilities(&adapter),
            (initial.width, initial.height),
            vsync,
        )?;
        surface.configure(&device, &surface_config);
        log::info!(
            "Swapchain {}x{} {:?}, {:?}",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            surface_config.present_mode
        );

        Ok(Self {
            surface_format: surface_config.format,
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
        })
    }

    /// Reconfigure after a window resize. Zero dimensions are clamped to 1.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.reconfigure();
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Acquire the next frame. A lost or outdated surface is reconfigured and
    /// retried once.
    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, SurfaceError> {
        let first = match self.surface.get_current_texture() {
            Ok(texture) => return Ok(texture),
            Err(e) => e,
        };
        match first {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                log::warn!("Swapchain {first}, reconfiguring");
                self.reconfigure();
                self.surface
                    .get_current_texture()
                    .map_err(|_| SurfaceError::Lost)
            }
            wgpu::SurfaceError::Timeout => Err(SurfaceError::Timeout),
            wgpu::SurfaceError::OutOfMemory => Err(SurfaceError::OutOfMemory),
            wgpu::SurfaceError::Other => {
                log::error!("Swapchain acquire failed: {first}");
                Err(SurfaceError::Lost)
            }
        }
    }
}

async fn pick_adapter(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'static>,
) -> Result<wgpu::Adapter, RenderError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(surface),
        })
        .await
        .map_err(|_| RenderError::NoAdapter)?;
    let info = adapter.get_info();
    log::info!("GPU: {} on {:?} ({:?})", info.name, info.backend, info.device_type);
    Ok(adapter)
}

/// Default limits, except 2D textures may be as large as the adapter allows
/// so full-resolution Earth maps fit.
async fn open_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
    let required_limits = wgpu::Limits {
        max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
        ..wgpu::Limits::default()
    };
    let descriptor = wgpu::DeviceDescriptor {
        label: Some("diorama-device"),
        required_limits,
        ..Default::default()
    };
    Ok(adapter.request_device(&descriptor).await?)
}

fn surface_config_for(
    caps: &wgpu::SurfaceCapabilities,
    (width, height): (u32, u32),
    vsync: bool,
) -> Result<wgpu::SurfaceConfiguration, RenderError> {
    let format = select_surface_format(&caps.formats).ok_or(RenderError::NoSurfaceFormat)?;
    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: select_present_mode(&caps.present_modes, vsync),
        alpha_mode: caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: Vec::new(),
        desired_maximum_frame_latency: 2,
    })
}

/// Block on [`RenderContext::new`].
pub fn init_render_context_blocking(
    window: Arc<Window>,
    vsync: bool,
) -> Result<RenderContext, RenderError> {
    pollster::block_on(RenderContext::new(window, vsync))
}

/// Prefer an sRGB swapchain so the grade output is encoded by the hardware.
fn select_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    const PREFERRED: [wgpu::TextureFormat; 2] = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    PREFERRED
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.iter().copied().find(|f| f.is_srgb()))
        .or_else(|| formats.first().copied())
}

/// Fifo with vsync; otherwise the lowest-latency mode on offer.
fn select_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    fn caps(formats: Vec<TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn test_prefers_bgra_srgb() {
        let formats = [
            TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8UnormSrgb,
        ];
        assert_eq!(
            select_surface_format(&formats),
            Some(TextureFormat::Bgra8UnormSrgb)
        );
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [TextureFormat::Rgba16Float, TextureFormat::Bgra8Unorm];
        assert_eq!(
            select_surface_format(&formats),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(select_surface_format(&[]), None);
    }

    #[test]
    fn test_vsync_always_uses_fifo() {
        let modes = [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Fifo];
        assert_eq!(select_present_mode(&modes, true), wgpu::PresentMode::Fifo);
        assert_eq!(select_present_mode(&modes, false), wgpu::PresentMode::Mailbox);
        assert_eq!(
            select_present_mode(&[wgpu::PresentMode::Fifo], false),
            wgpu::PresentMode::Fifo
        );
    }

    #[test]
    fn test_surface_config_clamps_zero_size() {
        let config = surface_config_for(&caps(vec![TextureFormat::Bgra8UnormSrgb]), (0, 0), true)
            .unwrap();
        assert_eq!((config.width, config.height), (1, 1));
        assert_eq!(config.format, TextureFormat::Bgra8UnormSrgb);
        assert_eq!(config.alpha_mode, wgpu::CompositeAlphaMode::Opaque);
    }

    #[test]
    fn test_surface_without_formats_is_an_error() {
        let result = surface_config_for(&caps(Vec::new()), (800, 600), true);
        assert!(matches!(result, Err(RenderError::NoSurfaceFormat)));
    }
}
