//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Perspective camera.
    pub camera: CameraConfig,
    /// Globe geometry and surface displacement.
    pub earth: EarthConfig,
    /// Rotation, wobble and drag behavior.
    pub animation: AnimationConfig,
    /// Depth-of-field and color-grade parameters.
    pub post_processing: PostProcessingConfig,
    /// Sun, ambient, hemisphere and fog.
    pub lighting: LightingConfig,
    /// Background star field.
    pub stars: StarsConfig,
    /// Texture locations.
    pub assets: AssetConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Camera configuration. The camera always looks at the origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    /// Near clip plane distance.
    pub near: f32,
    /// Far clip plane distance.
    pub far: f32,
    /// World-space camera position.
    pub position: [f32; 3],
}

/// Globe geometry configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EarthConfig {
    /// Globe radius in world units.
    pub radius: f32,
    /// Width and height segments of the UV sphere.
    pub segments: u32,
    /// Height-map to surface offset multiplier, shared by terrain and clouds.
    pub displacement_scale: f32,
    /// Extra offset of the cloud shell above the displaced surface.
    pub cloud_altitude: f32,
    /// Cloud layer opacity.
    pub cloud_opacity: f32,
    /// Atmosphere shell radius as a multiple of the globe radius.
    pub atmosphere_scale: f32,
}

/// Animation configuration. Speeds are per frame unless noted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Whether idle auto-rotation starts enabled.
    pub auto_rotate: bool,
    /// Auto-rotation increment in radians per frame.
    pub rotation_speed: f32,
    /// Cloud layer spin in radians per frame.
    pub cloud_rotation_speed: f32,
    /// Wobble frequency factor (multiplied by elapsed seconds and pi).
    pub wobble_speed: f32,
    /// Wobble amplitude in radians.
    pub wobble_amount: f32,
    /// Drag-to-rotation multiplier.
    pub drag_sensitivity: f32,
    /// Momentum damping factor applied each frame.
    pub rotation_damping: f32,
    /// Velocity magnitude below which momentum is zeroed.
    pub momentum_threshold: f32,
    /// Seconds after momentum settles before auto-rotation re-arms.
    pub auto_rotate_delay_secs: f64,
}

/// Post-processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostProcessingConfig {
    /// Build the effect chain. When false the viewer renders directly.
    pub enabled: bool,
    /// Depth-of-field focus distance.
    pub focus: f32,
    /// Depth-of-field aperture in slider units.
    pub aperture: f32,
    /// Maximum blur extent.
    pub maxblur: f32,
    /// Color-grade saturation.
    pub saturation: f32,
}

/// Scene lighting configuration. Colors are `0xRRGGBB`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Sun position; the light shines from here toward the origin.
    pub sun_position: [f32; 3],
    /// Sun color.
    pub sun_color: u32,
    /// Sun intensity.
    pub sun_intensity: f32,
    /// White ambient intensity.
    pub ambient_intensity: f32,
    /// Hemisphere light sky color.
    pub hemisphere_sky: u32,
    /// Hemisphere light ground color.
    pub hemisphere_ground: u32,
    /// Hemisphere light intensity.
    pub hemisphere_intensity: f32,
    /// Exponential-squared fog color.
    pub fog_color: u32,
    /// Exponential-squared fog density.
    pub fog_density: f32,
}

/// Star field configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StarsConfig {
    /// Number of star points.
    pub count: u32,
    /// Inner shell radius.
    pub min_radius: f32,
    /// Outer shell radius.
    pub max_radius: f32,
    /// Seed for star placement.
    pub seed: u64,
}

/// Asset locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding the five globe textures.
    pub texture_dir: PathBuf,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Start the localhost debug HTTP API.
    pub debug_api: bool,
    /// Port for the debug HTTP API (0 picks an ephemeral port).
    pub debug_port: u16,
    /// Enable debug keyboard shortcuts from the first frame.
    pub start_in_debug_mode: bool,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Diorama Earth".to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 35.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 9.0],
        }
    }
}

impl Default for EarthConfig {
    fn default() -> Self {
        Self {
            radius: 2.5,
            segments: 256,
            displacement_scale: 0.15,
            cloud_altitude: 0.02,
            cloud_opacity: 0.4,
            atmosphere_scale: 1.05,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            rotation_speed: 0.00015,
            cloud_rotation_speed: 0.0002,
            wobble_speed: 0.0008,
            wobble_amount: 0.01,
            drag_sensitivity: 0.09,
            rotation_damping: 0.99,
            momentum_threshold: 0.0001,
            auto_rotate_delay_secs: 2.0,
        }
    }
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            focus: 9.0,
            aperture: 4.5,
            maxblur: 0.01,
            saturation: 1.3,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sun_position: [10.0, 5.0, 5.0],
            sun_color: 0xfff5e6,
            sun_intensity: 2.2,
            ambient_intensity: 0.5,
            hemisphere_sky: 0xa0c8f0,
            hemisphere_ground: 0x504040,
            hemisphere_intensity: 1.0,
            fog_color: 0x020308,
            fog_density: 0.08,
        }
    }
}

impl Default for StarsConfig {
    fn default() -> Self {
        Self {
            count: 8000,
            min_radius: 100.0,
            max_radius: 500.0,
            seed: 0x5EED_57A2,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            texture_dir: PathBuf::from("assets/textures"),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_api: false,
            debug_port: 9999,
            start_in_debug_mode: false,
        }
    }
}

/// Convert a `0xRRGGBB` color to `[r, g, b]` in `[0, 1]`.
pub fn rgb_from_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

impl LightingConfig {
    /// Sun color as `[r, g, b]`.
    pub fn sun_rgb(&self) -> [f32; 3] {
        rgb_from_hex(self.sun_color)
    }

    /// Hemisphere sky color as `[r, g, b]`.
    pub fn sky_rgb(&self) -> [f32; 3] {
        rgb_from_hex(self.hemisphere_sky)
    }

    /// Hemisphere ground color as `[r, g, b]`.
    pub fn ground_rgb(&self) -> [f32; 3] {
        rgb_from_hex(self.hemisphere_ground)
    }

    /// Fog color as `[r, g, b]`.
    pub fn fog_rgb(&self) -> [f32; 3] {
        rgb_from_hex(self.fog_color)
    }
}

// --- Load / Save / Reload ---

/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Read `config.ron` from `config_dir`. A missing file is created with
    /// the defaults.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Self::default();
            config.save(config_dir)?;
            log::info!("Wrote default viewer config to {}", path.display());
            return Ok(config);
        }
        let config = read_config(&path)?;
        log::info!("Viewer config read from {}", path.display());
        Ok(config)
    }

    /// Write pretty-printed RON, creating `config_dir` if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let write_error = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, text).map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("segments: 256"));
        assert!(ron_str.contains("debug_port: 9999"));
    }

    #[test]
    fn test_defaults_match_viewer_constants() {
        let config = Config::default();
        assert_eq!(config.earth.radius, 2.5);
        assert_eq!(config.earth.displacement_scale, 0.15);
        assert_eq!(config.camera.fov_deg, 35.0);
        assert_eq!(config.camera.position, [0.0, 0.0, 9.0]);
        assert_eq!(config.animation.rotation_damping, 0.99);
        assert_eq!(config.animation.momentum_threshold, 0.0001);
        assert_eq!(config.post_processing.focus, 9.0);
        assert_eq!(config.post_processing.aperture, 4.5);
        assert_eq!(config.post_processing.maxblur, 0.01);
        assert_eq!(config.post_processing.saturation, 1.3);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.assets.texture_dir = PathBuf::from("/tmp/textures");
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(window: (), camera: (), earth: (radius: 3.0))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.earth.radius, 3.0);
        assert_eq!(config.earth.segments, 256);
        assert_eq!(config.animation, AnimationConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_hex_colors_convert() {
        assert_eq!(rgb_from_hex(0xff0000), [1.0, 0.0, 0.0]);
        let sun = LightingConfig::default().sun_rgb();
        assert_eq!(sun[0], 1.0);
        assert!((sun[1] - 245.0 / 255.0).abs() < 1e-6);
        assert!((sun[2] - 230.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.window.width = 1920;
        config.post_processing.aperture = 6.0;
        config.debug.debug_api = true;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_unreadable_config_names_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        let ConfigError::Read { path, .. } = err else {
            panic!("expected a read error, got {err:?}");
        };
        assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
    }
}
