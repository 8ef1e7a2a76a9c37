mod engine;
mod preprocess;
mod rvm;
pub mod types;

pub use engine::{MaskResult, SegmentationEngine};
pub use preprocess::{mask_from_matte, resample_mask, Preprocessor};
pub use rvm::RobustVideoMatting;
pub use types::{ModelQuality, SegmentationModel};

use crate::error::PipelineError;
use std::path::Path;

/// Load the default segmentation model (RVM) at the given quality
pub fn create_default_model<P: AsRef<Path>>(
    model_path: P,
    quality: ModelQuality,
) -> Result<Box<dyn SegmentationModel>, PipelineError> {
    let model = RobustVideoMatting::new(model_path, quality).map_err(|err| {
        PipelineError::ModelUnavailable {
            reason: format!("{:#}", err),
        }
    })?;
    Ok(Box::new(model))
}
