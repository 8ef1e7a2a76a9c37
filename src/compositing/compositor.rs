use super::blur::box_blur;
use crate::background::ResolvedBackground;
use crate::frame::{CompositedFrame, Frame, Mask};
use image::{Luma, Rgba, RgbaImage};
use imageproc::map::map_colors2;
use std::borrow::Cow;

/// Two-layer compositor
///
/// The background layer is the fitted image, the blurred frame, or the frame
/// itself. The foreground layer is the frame with its alpha multiplied by the
/// mask ("destination-in"). The foreground is then blended over the
/// background and the result made opaque.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compositor;

impl Compositor {
    pub fn new() -> Self {
        Self
    }

    /// Compose one output frame
    ///
    /// A missing mask yields the raw frame. Without an effect the mask is
    /// not applied. Frame, mask and background must share dimensions; a
    /// mismatch is a caller bug and panics.
    pub fn compose(
        &self,
        frame: &Frame,
        mask: Option<&Mask>,
        background: &ResolvedBackground,
    ) -> CompositedFrame {
        let _span = tracing::debug_span!("compose").entered();

        let Some(mask) = mask else {
            return CompositedFrame::new(opaque(frame.image()));
        };

        if !background.has_effect() {
            // Full-opacity frame over the unmodified frame layer
            let background_layer = background_layer(frame, background);
            return CompositedFrame::new(blend_over(&opaque(frame.image()), &background_layer));
        }

        assert_eq!(
            mask.dimensions(),
            frame.dimensions(),
            "mask must be resampled to the frame size before compositing"
        );

        let background_layer = background_layer(frame, background);
        assert_eq!(
            background_layer.dimensions(),
            frame.dimensions(),
            "background must be fitted to the frame size before compositing"
        );

        let foreground_layer = mask_foreground(frame.image(), mask);
        CompositedFrame::new(blend_over(&foreground_layer, &background_layer))
    }
}

fn background_layer<'a>(frame: &'a Frame, background: &'a ResolvedBackground) -> Cow<'a, RgbaImage> {
    match background {
        ResolvedBackground::Image(image) => Cow::Borrowed(image.as_ref()),
        ResolvedBackground::Blur { radius } if *radius > 0 => {
            Cow::Owned(box_blur(frame.image(), *radius))
        }
        _ => Cow::Borrowed(frame.image()),
    }
}

/// Destination-in: keep colour, scale alpha by the mask
fn mask_foreground(frame: &RgbaImage, mask: &Mask) -> RgbaImage {
    map_colors2(frame, mask, |Rgba([r, g, b, a]), Luma([coverage])| {
        let alpha = f32::from(a) * coverage.clamp(0.0, 1.0);
        Rgba([r, g, b, alpha.round() as u8])
    })
}

/// `out = fg * a + bg * (1 - a)`, alpha forced opaque
fn blend_over(foreground: &RgbaImage, background: &RgbaImage) -> RgbaImage {
    map_colors2(foreground, background, |Rgba([fr, fg, fb, fa]), Rgba([br, bg, bb, _])| {
        let alpha = f32::from(fa) / 255.0;
        let mix = |f: u8, b: u8| (f32::from(f) * alpha + f32::from(b) * (1.0 - alpha)).round() as u8;
        Rgba([mix(fr, br), mix(fg, bg), mix(fb, bb), u8::MAX])
    })
}

fn opaque(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel[3] = u8::MAX;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::uniform_mask;
    use std::sync::Arc;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        Frame::new(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 30) as u8, (y * 30) as u8, 77, 255])
        }))
    }

    fn solid(width: u32, height: u32, colour: [u8; 3]) -> ResolvedBackground {
        let [r, g, b] = colour;
        ResolvedBackground::Image(Arc::new(RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]))))
    }

    #[test]
    fn no_effect_reproduces_frame() {
        let frame = gradient_frame(6, 5);
        let mask = uniform_mask(6, 5, 0.0);

        let out = Compositor::new().compose(&frame, Some(&mask), &ResolvedBackground::None);

        assert_eq!(out.image(), frame.image());
    }

    #[test]
    fn no_effect_shows_transparent_pixels_opaque() {
        let frame = Frame::new(RgbaImage::from_fn(3, 2, |x, _| Rgba([40, 50, 60, (x * 100) as u8])));
        let mask = uniform_mask(3, 2, 0.0);

        for background in [ResolvedBackground::None, ResolvedBackground::Blur { radius: 0 }] {
            let out = Compositor::new().compose(&frame, Some(&mask), &background);
            assert!(out.image().pixels().all(|p| *p == Rgba([40, 50, 60, 255])));
        }
    }

    #[test]
    fn missing_mask_falls_back_to_raw_frame() {
        let frame = gradient_frame(6, 5);
        let out = Compositor::new().compose(&frame, None, &solid(6, 5, [0, 0, 255]));

        assert_eq!(out.dimensions(), (6, 5));
        assert_eq!(out.image(), frame.image());
    }

    #[test]
    fn full_mask_keeps_subject_and_empty_mask_shows_background() {
        let frame = gradient_frame(4, 4);
        let mask = Mask::from_fn(4, 4, |x, _| Luma([if x < 2 { 1.0 } else { 0.0 }]));

        let out = Compositor::new().compose(&frame, Some(&mask), &solid(4, 4, [9, 8, 7]));

        assert_eq!(out.image().get_pixel(1, 3), frame.image().get_pixel(1, 3));
        assert_eq!(out.image().get_pixel(3, 3), &Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn half_mask_blends_evenly() {
        let frame = Frame::new(RgbaImage::from_pixel(2, 2, Rgba([200, 100, 0, 255])));
        let mask = uniform_mask(2, 2, 0.5);

        let out = Compositor::new().compose(&frame, Some(&mask), &solid(2, 2, [0, 0, 200]));

        // alpha rounds to 128/255
        assert_eq!(out.image().get_pixel(0, 0), &Rgba([100, 50, 100, 255]));
    }

    #[test]
    fn frame_alpha_scales_coverage() {
        let frame = Frame::new(RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 0])));
        let mask = uniform_mask(1, 1, 1.0);

        let out = Compositor::new().compose(&frame, Some(&mask), &solid(1, 1, [10, 20, 30]));

        assert_eq!(out.image().get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn blur_applies_to_background_only() {
        let frame = Frame::new(RgbaImage::from_fn(12, 12, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }));
        let mask = Mask::from_fn(12, 12, |x, _| Luma([if x < 6 { 1.0 } else { 0.0 }]));

        let out = Compositor::new().compose(&frame, Some(&mask), &ResolvedBackground::Blur { radius: 2 });

        for y in 0..12 {
            for x in 0..6 {
                assert_eq!(out.image().get_pixel(x, y), frame.image().get_pixel(x, y));
            }
        }
        assert_ne!(out.image().get_pixel(9, 6), frame.image().get_pixel(9, 6));
    }

    #[test]
    #[should_panic(expected = "mask must be resampled")]
    fn mismatched_mask_is_a_contract_violation() {
        let frame = gradient_frame(4, 4);
        let mask = uniform_mask(2, 2, 1.0);
        Compositor::new().compose(&frame, Some(&mask), &ResolvedBackground::Blur { radius: 1 });
    }
}
