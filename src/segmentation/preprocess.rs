use crate::frame::{Frame, Mask};
use anyhow::{anyhow, Result};
use image::{imageops, Luma};
use ndarray::Array4;

/// Preprocessor for converting frames to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess a frame into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Convert colour channels to float in [0, 1] (alpha is dropped)
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, frame: &Frame) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let image = frame.image();
        let resized;
        let source = if image.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            image
        };

        let (width, height) = source.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in source.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for channel in 0..3 {
                tensor[[0, channel, y, x]] = f32::from(pixel[channel]) / 255.0;
            }
        }

        tensor
    }
}

/// Wrap a row-major matte as a mask
pub fn mask_from_matte(matte: Vec<f32>, width: u32, height: u32) -> Result<Mask> {
    let len = matte.len();
    Mask::from_raw(width, height, matte)
        .ok_or_else(|| anyhow!("Matte of {} values does not fit {}x{}", len, width, height))
}

/// Resample a mask to frame dimensions, keeping values in [0, 1]
pub fn resample_mask(mask: &Mask, width: u32, height: u32) -> Mask {
    if mask.dimensions() == (width, height) {
        return mask.clone();
    }

    let _span = tracing::debug_span!("resample_mask").entered();
    let mut resized = imageops::resize(mask, width, height, imageops::FilterType::Triangle);
    for Luma([value]) in resized.pixels_mut() {
        *value = value.clamp(0.0, 1.0);
    }
    resized
}
