use super::OutputSink;
use crate::frame::CompositedFrame;
use anyhow::{Context, Result};
use image::{imageops, RgbaImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Presentation surface writing YUYV frames to a v4l2loopback device
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Announce the format so consumers see YUYV at our resolution
        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;
        let format = Format::new(width, height, FourCC::new(b"YUYV"));
        let applied = Output::set_format(&device, &format)
            .context("Failed to set v4l2loopback output format")?;
        tracing::debug!("Loopback format: {}", applied);

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width,
            height,
        })
    }
}

/// Pack RGBA pixels as YUV 4:2:2 (YUYV), averaging chroma per pixel pair
fn rgba_to_yuyv(image: &RgbaImage) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let first = image.get_pixel(x, y);
            let second = if x + 1 < width {
                image.get_pixel(x + 1, y)
            } else {
                first
            };

            let (y1, u1, v1) = rgb_to_yuv(first[0], first[1], first[2]);
            let (y2, u2, v2) = rgb_to_yuv(second[0], second[1], second[2]);

            let u = ((u16::from(u1) + u16::from(u2)) / 2) as u8;
            let v = ((u16::from(v1) + u16::from(v2)) / 2) as u8;

            yuyv.extend_from_slice(&[y1, u, y2, v]);
        }
    }

    yuyv
}

fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &CompositedFrame) -> Result<()> {
        let yuyv = if frame.dimensions() != (self.width, self.height) {
            let resized = imageops::resize(
                frame.image(),
                self.width,
                self.height,
                imageops::FilterType::Triangle,
            );
            rgba_to_yuyv(&resized)
        } else {
            rgba_to_yuyv(frame.image())
        };

        self.file
            .write_all(&yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
