//! Background loading of the globe textures.

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError};
use diorama_render::{GlobeTextures, TextureError, load_texture_image};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load {name}: {source}")]
    Texture {
        name: &'static str,
        #[source]
        source: TextureError,
    },
}

/// Decode every globe map from `dir`, stopping at the first failure.
pub fn load_globe_textures(dir: &Path) -> Result<GlobeTextures, AssetError> {
    GlobeTextures::try_from_fn(|kind| {
        load_texture_image(&dir.join(kind.file_name())).map_err(|source| AssetError::Texture {
            name: kind.file_name(),
            source,
        })
    })
}

/// Loads the textures on a worker thread. The main thread polls once per
/// frame.
pub struct AssetLoader {
    receiver: Option<Receiver<Result<GlobeTextures, AssetError>>>,
}

impl AssetLoader {
    pub fn spawn(dir: PathBuf) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let spawned = thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                tracing::info!("Loading globe textures from {}", dir.display());
                let result = load_globe_textures(&dir);
                // The receiver is gone only if the app is shutting down.
                let _ = sender.send(result);
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn the asset loader: {e}");
        }
        Self {
            receiver: Some(receiver),
        }
    }

    /// The textures, once. A load failure yields the procedural placeholders.
    pub fn poll(&mut self) -> Option<GlobeTextures> {
        let receiver = self.receiver.as_ref()?;
        let textures = match receiver.try_recv() {
            Err(TryRecvError::Empty) => return None,
            Ok(Ok(textures)) => {
                tracing::info!("Globe textures loaded");
                textures
            }
            Ok(Err(e)) => {
                tracing::error!("{e}; using placeholder textures");
                GlobeTextures::placeholder()
            }
            Err(TryRecvError::Disconnected) => {
                tracing::error!("Asset loader exited early; using placeholder textures");
                GlobeTextures::placeholder()
            }
        };
        self.receiver = None;
        Some(textures)
    }

    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_render::GlobeTextureKind;
    use std::time::{Duration, Instant};

    fn write_textures(dir: &Path) {
        for kind in GlobeTextureKind::ALL {
            let pixel = if kind.is_srgb() { [200, 100, 50, 255] } else { [9; 4] };
            // Decoding sniffs the content, so PNG bytes behind a .jpg name load fine.
            let mut png = Vec::new();
            image::RgbaImage::from_pixel(2, 1, image::Rgba(pixel))
                .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
                .unwrap();
            std::fs::write(dir.join(kind.file_name()), png).unwrap();
        }
    }

    fn wait(loader: &mut AssetLoader) -> GlobeTextures {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(textures) = loader.poll() {
                return textures;
            }
            assert!(Instant::now() < deadline, "loader timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_loads_every_map() {
        let dir = tempfile::tempdir().unwrap();
        write_textures(dir.path());
        let textures = load_globe_textures(dir.path()).unwrap();
        assert_eq!((textures.day.width, textures.day.height), (2, 1));
        assert_eq!(&textures.day.rgba[..4], &[200, 100, 50, 255]);
        assert_eq!(&textures.height.rgba[..4], &[9; 4]);
    }

    #[test]
    fn test_missing_map_is_named() {
        let dir = tempfile::tempdir().unwrap();
        write_textures(dir.path());
        std::fs::remove_file(dir.path().join("earth_specular.jpg")).unwrap();

        let err = load_globe_textures(dir.path()).unwrap_err();
        let AssetError::Texture { name, .. } = &err;
        assert_eq!(*name, "earth_specular.jpg");
        assert!(err.to_string().contains("earth_specular.jpg"));
    }

    #[test]
    fn test_loader_delivers_once() {
        let dir = tempfile::tempdir().unwrap();
        write_textures(dir.path());
        let mut loader = AssetLoader::spawn(dir.path().to_path_buf());
        assert!(loader.is_pending());

        let textures = wait(&mut loader);
        assert_eq!(textures.clouds.width, 2);
        assert!(!loader.is_pending());
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_loader_falls_back_to_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AssetLoader::spawn(dir.path().join("missing"));
        let textures = wait(&mut loader);
        assert_eq!(textures.day, GlobeTextureKind::Day.placeholder());
    }
}
