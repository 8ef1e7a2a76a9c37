use super::library::BackgroundLibrary;
use crate::compositing::box_blur;
use crate::selection::BackgroundSelection;
use image::{imageops, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;

/// Pixel content to place behind the subject for one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBackground {
    /// Show the camera feed directly behind the subject
    None,
    /// Blur the live frame by `radius` (the compositor does the blurring)
    Blur { radius: u32 },
    /// A library image already fitted to the target size (and blurred, when
    /// blur is on)
    Image(Arc<RgbaImage>),
}

impl ResolvedBackground {
    pub fn has_effect(&self) -> bool {
        match self {
            ResolvedBackground::None => false,
            ResolvedBackground::Blur { radius } => *radius > 0,
            ResolvedBackground::Image(_) => true,
        }
    }
}

/// Source rectangle of a cover-fit crop, in asset pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Largest centred region of a `src_width x src_height` image with the
/// target's aspect ratio
///
/// Wider sources lose their sides, taller ones their top and bottom.
pub fn cover_crop(src_width: u32, src_height: u32, target_width: u32, target_height: u32) -> CropRect {
    let (sw, sh) = (f64::from(src_width), f64::from(src_height));
    let (tw, th) = (f64::from(target_width), f64::from(target_height));

    // Compare aspects by cross-multiplying so equal ratios stay exact
    if u64::from(src_width) * u64::from(target_height) > u64::from(src_height) * u64::from(target_width) {
        let width = sh * tw / th;
        CropRect {
            x: (sw - width) / 2.0,
            y: 0.0,
            width,
            height: sh,
        }
    } else {
        let height = sw * th / tw;
        CropRect {
            x: 0.0,
            y: (sh - height) / 2.0,
            width: sw,
            height,
        }
    }
}

/// Cover-fit `asset` into exactly `target_width x target_height`
///
/// An empty asset has nothing to crop and yields a transparent image.
pub fn fit_cover(asset: &RgbaImage, target_width: u32, target_height: u32) -> RgbaImage {
    let (src_width, src_height) = asset.dimensions();
    if src_width == 0 || src_height == 0 {
        return RgbaImage::new(target_width, target_height);
    }
    let rect = cover_crop(src_width, src_height, target_width, target_height);

    let x = (rect.x.round() as u32).min(src_width - 1);
    let y = (rect.y.round() as u32).min(src_height - 1);
    let width = (rect.width.round() as u32).clamp(1, src_width - x);
    let height = (rect.height.round() as u32).clamp(1, src_height - y);

    let cropped = imageops::crop_imm(asset, x, y, width, height).to_image();
    if cropped.dimensions() == (target_width, target_height) {
        return cropped;
    }
    imageops::resize(&cropped, target_width, target_height, imageops::FilterType::Triangle)
}

/// Turns the current selection into a background layer
///
/// Fitted images are cached per (index, blur radius) for the current target
/// size; a size change clears the cache.
#[derive(Debug, Default)]
pub struct BackgroundResolver {
    target: (u32, u32),
    fitted: HashMap<(usize, u32), Arc<RgbaImage>>,
}

impl BackgroundResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        selection: BackgroundSelection,
        target_width: u32,
        target_height: u32,
        library: &BackgroundLibrary,
    ) -> ResolvedBackground {
        self.resolve_with_blur(selection, 0, target_width, target_height, library)
    }

    /// Like [`resolve`](Self::resolve), blurring an `Image` selection by
    /// `image_blur` (0 keeps it sharp)
    ///
    /// `Blur` and `None` selections ignore `image_blur`.
    pub fn resolve_with_blur(
        &mut self,
        selection: BackgroundSelection,
        image_blur: u32,
        target_width: u32,
        target_height: u32,
        library: &BackgroundLibrary,
    ) -> ResolvedBackground {
        match selection {
            BackgroundSelection::None => ResolvedBackground::None,
            BackgroundSelection::Blur(radius) => ResolvedBackground::Blur { radius },
            BackgroundSelection::Image(index) => {
                self.fitted_image(index, image_blur, target_width, target_height, library)
            }
        }
    }

    fn fitted_image(
        &mut self,
        index: usize,
        blur: u32,
        target_width: u32,
        target_height: u32,
        library: &BackgroundLibrary,
    ) -> ResolvedBackground {
        let Some(asset) = library.get(index) else {
            tracing::warn!(
                "Background index {} out of range ({} available), showing camera feed",
                index,
                library.len()
            );
            return ResolvedBackground::None;
        };
        if asset.width() == 0 || asset.height() == 0 || target_width == 0 || target_height == 0 {
            tracing::warn!("Background {} cannot be fitted to {}x{}", index, target_width, target_height);
            return ResolvedBackground::None;
        }

        if self.target != (target_width, target_height) {
            self.fitted.clear();
            self.target = (target_width, target_height);
        }

        if let Some(cached) = self.fitted.get(&(index, blur)) {
            return ResolvedBackground::Image(Arc::clone(cached));
        }

        let sharp = Arc::clone(self.fitted.entry((index, 0)).or_insert_with(|| {
            let _span = tracing::debug_span!("fit_background", index).entered();
            Arc::new(fit_cover(asset, target_width, target_height))
        }));
        if blur == 0 {
            return ResolvedBackground::Image(sharp);
        }

        let blurred = Arc::new(box_blur(&sharp, blur));
        self.fitted.insert((index, blur), Arc::clone(&blurred));
        ResolvedBackground::Image(blurred)
    }
}
