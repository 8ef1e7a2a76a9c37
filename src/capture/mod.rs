mod v4l_capture;

pub use v4l_capture::WebcamCapture;

use crate::frame::Frame;
use anyhow::Result;

/// Trait for camera capture sources
pub trait FrameSource {
    /// Latest frame, if one arrived since the previous call
    ///
    /// Never blocks. `Ok(None)` is a transient gap; `Err` means the source
    /// is gone for good.
    fn current_frame(&mut self) -> Result<Option<Frame>>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
