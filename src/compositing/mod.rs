mod blur;
mod compositor;
mod mask;

pub use blur::box_blur;
pub use compositor::Compositor;
pub use mask::MaskProcessor;
