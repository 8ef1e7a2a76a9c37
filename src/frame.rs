use image::{DynamicImage, ImageBuffer, Luma, RgbImage, RgbaImage};

/// Foreground probability per pixel: 0.0 = background, 1.0 = foreground
pub type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A captured camera frame
///
/// RGB captures are widened to RGBA on entry so every downstream stage sees a
/// single layout. Frames are read-only once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::new(DynamicImage::ImageRgb8(image).into_rgba8())
    }
}

/// Final output of one pipeline cycle; always fully opaque
#[derive(Debug, Clone, PartialEq)]
pub struct CompositedFrame {
    image: RgbaImage,
}

impl CompositedFrame {
    pub(crate) fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Build a mask filled with a single probability
pub fn uniform_mask(width: u32, height: u32, value: f32) -> Mask {
    Mask::from_pixel(width, height, Luma([value]))
}
