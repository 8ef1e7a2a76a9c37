use image::RgbaImage;

const CHANNELS: usize = 4;

/// Separable box blur of the colour channels; alpha is carried over as-is
///
/// Each pass keeps a running window sum, so cost does not grow with the
/// radius. Samples past the border clamp to the edge pixel.
pub fn box_blur(image: &RgbaImage, radius: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return image.clone();
    }

    let _span = tracing::debug_span!("box_blur", radius).entered();

    let (w, h) = (width as usize, height as usize);
    let radius = radius as usize;
    let row_stride = w * CHANNELS;

    let mut horizontal = image.as_raw().clone();
    blur_lines(image.as_raw(), &mut horizontal, h, w, row_stride, CHANNELS, radius);

    let mut vertical = horizontal.clone();
    blur_lines(&horizontal, &mut vertical, w, h, CHANNELS, row_stride, radius);

    // Dimensions are unchanged, so the buffer always fits
    RgbaImage::from_raw(width, height, vertical).unwrap_or_else(|| image.clone())
}

/// Blur `lines` independent lines of `len` pixels each
///
/// `line_step` is the byte distance between line starts and `pixel_step` the
/// distance between neighbouring pixels along a line.
fn blur_lines(
    src: &[u8],
    dst: &mut [u8],
    lines: usize,
    len: usize,
    line_step: usize,
    pixel_step: usize,
    radius: usize,
) {
    let window = (2 * radius + 1) as u32;
    let last = len - 1;

    for line in 0..lines {
        let base = line * line_step;
        for channel in 0..3 {
            let at = |k: usize| u32::from(src[base + k * pixel_step + channel]);

            let mut sum: u32 = (0..=2 * radius)
                .map(|i| at(i.saturating_sub(radius).min(last)))
                .sum();

            for k in 0..len {
                dst[base + k * pixel_step + channel] = ((sum + window / 2) / window) as u8;

                let incoming = (k + radius + 1).min(last);
                let outgoing = k.saturating_sub(radius);
                sum = sum + at(incoming) - at(outgoing);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checkerboard(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn zero_radius_is_identity() {
        let image = checkerboard(8, 6);
        assert_eq!(box_blur(&image, 0), image);
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let image = RgbaImage::from_pixel(10, 7, Rgba([40, 80, 120, 255]));
        assert_eq!(box_blur(&image, 3), image);
    }

    #[test]
    fn checkerboard_is_smoothed() {
        let image = checkerboard(16, 16);
        let blurred = box_blur(&image, 2);

        assert_eq!(blurred.dimensions(), image.dimensions());
        assert_ne!(blurred, image);

        let centre = blurred.get_pixel(8, 8);
        assert!(centre[0] > 60 && centre[0] < 200, "got {:?}", centre);
    }

    #[test]
    fn alpha_is_preserved() {
        let image = RgbaImage::from_fn(6, 6, |x, _| Rgba([x as u8 * 40, 0, 0, x as u8 * 10]));
        let blurred = box_blur(&image, 2);

        for (original, result) in image.pixels().zip(blurred.pixels()) {
            assert_eq!(original[3], result[3]);
        }
    }

    #[test]
    fn radius_larger_than_image_is_handled() {
        let image = checkerboard(3, 2);
        let blurred = box_blur(&image, 50);
        assert_eq!(blurred.dimensions(), (3, 2));
    }
}
