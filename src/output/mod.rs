mod loopback;

pub use loopback::V4L2Output;

use crate::frame::CompositedFrame;
use anyhow::Result;

/// Trait for output destinations
///
/// Frames arrive at a variable rate, one per presented cycle.
pub trait OutputSink {
    /// Write a frame to the output
    fn write_frame(&mut self, frame: &CompositedFrame) -> Result<()>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}
