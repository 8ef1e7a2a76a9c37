use crate::device::DeviceClass;

/// Box blur radius matching a 55x55 kernel
pub const DEFAULT_BLUR_RADIUS: u32 = 27;

/// Inward shrink applied to the mask on desktop-class devices
pub const DEFAULT_EROSION_PX: u32 = 2;

pub const DEFAULT_FPS: u32 = 30;

/// Session-constant pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub device_class: DeviceClass,
    /// Target presentation rate
    pub fps: u32,
    pub blur_radius: u32,
    pub erosion_px: u32,
    /// Optional hard cut-off turning the soft mask into a binary one
    pub threshold: Option<f32>,
    /// Flip captured frames horizontally (selfie view)
    pub mirror: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device_class: DeviceClass::Desktop,
            fps: DEFAULT_FPS,
            blur_radius: DEFAULT_BLUR_RADIUS,
            erosion_px: DEFAULT_EROSION_PX,
            threshold: None,
            mirror: false,
        }
    }
}
