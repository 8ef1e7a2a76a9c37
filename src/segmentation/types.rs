use crate::frame::{Frame, Mask};
use anyhow::Result;

/// Model size/quality tier, chosen once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelQuality {
    /// Small input resolution for lower-powered hardware
    Lightweight,
    HighQuality,
}

impl ModelQuality {
    /// Model input (width, height)
    pub fn input_size(self) -> (u32, u32) {
        match self {
            ModelQuality::Lightweight => (256, 256),
            ModelQuality::HighQuality => (512, 512),
        }
    }
}

/// Trait for segmentation models
/// Allows swapping between different backends (RVM, MODNet, MediaPipe, etc.)
///
/// Implementations block for the duration of one inference; the
/// `SegmentationEngine` moves them onto the blocking pool.
pub trait SegmentationModel: Send {
    /// Estimate foreground probability for every pixel of `frame`
    ///
    /// The returned mask may be at model resolution; the pipeline resamples
    /// it to the frame size before use.
    fn segment(&mut self, frame: &Frame) -> Result<Mask>;

    /// Reset internal state (for models with temporal/recurrent components)
    ///
    /// Call this when:
    /// - Switching cameras
    /// - Starting a new video session
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless models
    }

    /// Get the model's preferred input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}
