//! Globe texture images: decoding, procedural placeholders and GPU upload.

use std::path::{Path, PathBuf};

/// Decoding or reading a texture file failed.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_fn(width, height, |_, _| rgba)
    }

    /// Build an image from a per-texel function of `(u, v)` in [0, 1).
    pub fn from_fn(width: u32, height: u32, f: impl Fn(f32, f32) -> [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let v = (y as f32 + 0.5) / height as f32;
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                rgba.extend_from_slice(&f(u, v));
            }
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    /// Downscale so neither side exceeds `max_dimension`, keeping the aspect.
    pub fn fit_within(self, max_dimension: u32) -> Self {
        let max_dimension = max_dimension.max(1);
        if self.width <= max_dimension && self.height <= max_dimension {
            return self;
        }
        let scale = max_dimension as f32 / self.width.max(self.height) as f32;
        let width = ((self.width as f32 * scale).round() as u32).clamp(1, max_dimension);
        let height = ((self.height as f32 * scale).round() as u32).clamp(1, max_dimension);
        let Some(buffer) = image::RgbaImage::from_raw(self.width, self.height, self.rgba) else {
            return Self::solid(width, height, [0, 0, 0, 255]);
        };
        log::info!(
            "Downscaling {}x{} texture to {width}x{height}",
            buffer.width(),
            buffer.height()
        );
        let resized =
            image::imageops::resize(&buffer, width, height, image::imageops::FilterType::Triangle);
        Self {
            width,
            height,
            rgba: resized.into_raw(),
        }
    }
}

/// Read and decode an image file into RGBA8.
pub fn load_texture_image(path: &Path) -> Result<TextureImage, TextureError> {
    let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    log::debug!(
        "Decoded {} ({}x{})",
        path.display(),
        rgba.width(),
        rgba.height()
    );
    Ok(TextureImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// The five maps the globe materials sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobeTextureKind {
    Day,
    Height,
    Specular,
    Clouds,
    Night,
}

impl GlobeTextureKind {
    pub const ALL: [Self; 5] = [
        Self::Day,
        Self::Height,
        Self::Specular,
        Self::Clouds,
        Self::Night,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Day => "earth_day.jpg",
            Self::Height => "earth_bump.jpg",
            Self::Specular => "earth_specular.jpg",
            Self::Clouds => "earth_clouds.jpg",
            Self::Night => "earth_night.jpg",
        }
    }

    /// Color maps are sRGB-encoded; data maps are sampled as linear values.
    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Day | Self::Clouds | Self::Night)
    }

    /// Stand-in texture used when the file cannot be loaded.
    pub fn placeholder(self) -> TextureImage {
        const W: u32 = 512;
        const H: u32 = 256;
        match self {
            Self::Day => TextureImage::from_fn(W, H, |u, v| {
                if is_polar(v) {
                    [235, 240, 245, 255]
                } else if land_mask(u, v) > 0.0 {
                    [70, 110, 50, 255]
                } else {
                    [15, 45, 110, 255]
                }
            }),
            Self::Height => TextureImage::from_fn(W, H, |u, v| {
                let h = (land_mask(u, v) * 0.6).clamp(0.0, 1.0);
                let g = (h * 255.0) as u8;
                [g, g, g, 255]
            }),
            Self::Specular => TextureImage::from_fn(W, H, |u, v| {
                let g = if land_mask(u, v) > 0.0 { 40 } else { 255 };
                [g, g, g, 255]
            }),
            Self::Clouds => TextureImage::from_fn(W, H, |u, v| {
                let swirl = (u * std::f32::consts::TAU * 3.0).sin();
                let band = ((v * 23.0 + swirl).sin() * 0.5 + 0.5).powi(4);
                let g = (band * 255.0) as u8;
                [g, g, g, 255]
            }),
            Self::Night => TextureImage::from_fn(W, H, |u, v| {
                let lit = land_mask(u, v) > 0.15 && ((u * 97.0).sin() * (v * 61.0).sin()) > 0.7;
                if lit {
                    [255, 200, 120, 255]
                } else {
                    [2, 2, 4, 255]
                }
            }),
        }
    }
}

fn is_polar(v: f32) -> bool {
    !(0.08..=0.92).contains(&v)
}

/// Positive over procedural "continents".
fn land_mask(u: f32, v: f32) -> f32 {
    use std::f32::consts::PI;
    let broad = (u * 6.0 * PI).sin() * (v * 4.0 * PI).cos();
    let detail = 0.5 * (u * 14.0 * PI + 1.3).sin() * (v * 9.0 * PI).sin();
    broad + detail - 0.3
}

/// Decoded images for every globe map.
#[derive(Debug, Clone)]
pub struct GlobeTextures {
    pub day: TextureImage,
    pub height: TextureImage,
    pub specular: TextureImage,
    pub clouds: TextureImage,
    pub night: TextureImage,
}

impl GlobeTextures {
    /// Build every map with `load`, stopping at the first error.
    pub fn try_from_fn<E>(
        mut load: impl FnMut(GlobeTextureKind) -> Result<TextureImage, E>,
    ) -> Result<Self, E> {
        Ok(Self {
            day: load(GlobeTextureKind::Day)?,
            height: load(GlobeTextureKind::Height)?,
            specular: load(GlobeTextureKind::Specular)?,
            clouds: load(GlobeTextureKind::Clouds)?,
            night: load(GlobeTextureKind::Night)?,
        })
    }

    pub fn placeholder() -> Self {
        match Self::try_from_fn(|kind| Ok::<_, std::convert::Infallible>(kind.placeholder())) {
            Ok(textures) => textures,
            Err(never) => match never {},
        }
    }

    pub fn get(&self, kind: GlobeTextureKind) -> &TextureImage {
        match kind {
            GlobeTextureKind::Day => &self.day,
            GlobeTextureKind::Height => &self.height,
            GlobeTextureKind::Specular => &self.specular,
            GlobeTextureKind::Clouds => &self.clouds,
            GlobeTextureKind::Night => &self.night,
        }
    }
}

/// An uploaded 2D texture.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &TextureImage,
        srgb: bool,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// A 1x1 white texture for materials without a map.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::upload(
            device,
            queue,
            "white-texture",
            &TextureImage::solid(1, 1, [255; 4]),
            false,
        )
    }
}
