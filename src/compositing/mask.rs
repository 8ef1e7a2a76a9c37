use crate::device::DeviceClass;
use crate::frame::Mask;
use image::Luma;

/// Cleans raw segmentation masks before compositing
///
/// On desktop-class devices the mask is eroded by intersecting it with copies
/// of itself offset horizontally in both directions and sampled from below.
/// The upper silhouette edge (head and shoulders) is left in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskProcessor {
    shift: u32,
    threshold: Option<f32>,
}

impl Default for MaskProcessor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EROSION_PX, None)
    }
}

impl MaskProcessor {
    pub fn new(shift: u32, threshold: Option<f32>) -> Self {
        Self { shift, threshold }
    }

    /// Produce a cleaned copy of `mask`; the input is never modified
    pub fn clean(&self, mask: &Mask, device_class: DeviceClass) -> Mask {
        let _span = tracing::debug_span!("clean_mask").entered();

        let mut cleaned = if device_class.erodes_mask() {
            erode(mask, self.shift)
        } else {
            mask.clone()
        };

        if let Some(threshold) = self.threshold {
            for Luma([value]) in cleaned.pixels_mut() {
                *value = if *value > threshold { 1.0 } else { 0.0 };
            }
        }

        cleaned
    }
}

/// Offsets `(dx, dy)`: each output pixel is multiplied by the mask value at
/// `(x - dx, y - dy)`.
fn erosion_offsets(shift: i64) -> [(i64, i64); 3] {
    [(shift, 0), (-shift, 0), (0, -shift)]
}

fn erode(mask: &Mask, shift: u32) -> Mask {
    if shift == 0 {
        return mask.clone();
    }

    let (width, height) = mask.dimensions();
    let offsets = erosion_offsets(i64::from(shift));

    Mask::from_fn(width, height, |x, y| {
        let alpha = offsets
            .iter()
            .fold(mask.get_pixel(x, y)[0], |alpha, &(dx, dy)| {
                alpha * sample(mask, i64::from(x) - dx, i64::from(y) - dy)
            });
        Luma([alpha])
    })
}

/// Out-of-canvas samples are fully transparent
#[inline]
fn sample(mask: &Mask, x: i64, y: i64) -> f32 {
    if x < 0 || y < 0 || x >= i64::from(mask.width()) || y >= i64::from(mask.height()) {
        return 0.0;
    }
    mask.get_pixel(x as u32, y as u32)[0]
}
