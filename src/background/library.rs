use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of generated backgrounds when no assets are available
pub const PLACEHOLDER_COUNT: usize = 6;
const PLACEHOLDER_WIDTH: u32 = 640;
const PLACEHOLDER_HEIGHT: u32 = 480;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// A decoded background image
pub type BackgroundAsset = Arc<RgbaImage>;

/// Fixed, ordered set of background images, loaded before the pipeline starts
#[derive(Debug, Clone, Default)]
pub struct BackgroundLibrary {
    assets: Vec<BackgroundAsset>,
}

impl BackgroundLibrary {
    pub fn new(images: Vec<RgbaImage>) -> Self {
        Self {
            assets: images.into_iter().map(Arc::new).collect(),
        }
    }

    /// Decode every image in `paths`, in order
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let images = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                tracing::debug!("Loading background {}", path.display());
                image::open(path)
                    .map(|image| image.into_rgba8())
                    .with_context(|| format!("Failed to load background {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(images))
    }

    /// Load all images in `dir` sorted by file name
    ///
    /// Falls back to generated placeholders when the directory holds no images.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read background directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| has_image_extension(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            tracing::warn!(
                "No background images in {}, using placeholders",
                dir.display()
            );
            return Ok(Self::placeholders(PLACEHOLDER_COUNT));
        }

        let library = Self::load(&paths)?;
        tracing::info!("Loaded {} backgrounds from {}", library.len(), dir.display());
        Ok(library)
    }

    /// Generated vertical gradients, each with a different channel rotation
    pub fn placeholders(count: usize) -> Self {
        let images = (0..count).map(placeholder).collect();
        Self::new(images)
    }

    pub fn get(&self, index: usize) -> Option<&BackgroundAsset> {
        self.assets.get(index)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn placeholder(index: usize) -> RgbaImage {
    RgbaImage::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |_, y| {
        let rising = (255 * y / PLACEHOLDER_HEIGHT) as u8;
        let falling = (255 * (PLACEHOLDER_HEIGHT - y) / PLACEHOLDER_HEIGHT) as u8;
        let mut channels = [rising, falling, 128];
        channels.rotate_left(index % 3);
        if index >= 3 {
            channels.swap(0, 1);
        }
        let [r, g, b] = channels;
        Rgba([r, g, b, 255])
    })
}
