//! Real-time background replacement and blur for a live camera feed
//!
//! A segmentation model estimates per-pixel foreground probability; the mask
//! is cleaned, a background is resolved from the user's selection, and the
//! subject is composited over it once per presented frame.

pub mod background;
pub mod capture;
pub mod compositing;
pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod frame;
pub mod output;
pub mod scheduler;
pub mod segmentation;
pub mod selection;

pub use background::{BackgroundLibrary, BackgroundResolver, ResolvedBackground};
pub use compositing::{Compositor, MaskProcessor};
pub use config::PipelineConfig;
pub use device::DeviceClass;
pub use error::{PipelineError, SelectionError};
pub use frame::{CompositedFrame, Frame, Mask};
pub use scheduler::{FrameScheduler, RunSummary, SchedulerState, TickOutcome};
pub use selection::{BackgroundSelection, SelectionControl, SelectionReader, SelectionSnapshot};
