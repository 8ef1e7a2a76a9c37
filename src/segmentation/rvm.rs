use super::preprocess::{mask_from_matte, Preprocessor};
use super::types::{ModelQuality, SegmentationModel};
use crate::frame::{Frame, Mask};
use anyhow::{Context, Result};
use ndarray::{Array1, Array4, Ix4};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use std::path::Path;

/// RobustVideoMatting segmentation model
///
/// This model uses recurrent connections to maintain temporal consistency.
/// Hidden states (r1-r4) are carried between frames for smooth results.
pub struct RobustVideoMatting {
    session: Session,
    preprocessor: Preprocessor,
    width: u32,
    height: u32,

    // Recurrent hidden states, fed back in on the next frame
    recurrent: Option<[Array4<f32>; 4]>,

    downsample_ratio: f32,
}

impl RobustVideoMatting {
    /// Load an RVM ONNX export sized for `quality`
    ///
    /// The downsample ratio of 0.25 keeps hidden states at a quarter of the
    /// input resolution.
    pub fn new<P: AsRef<Path>>(model_path: P, quality: ModelQuality) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading RVM model from {} ({:?})", path.display(), quality);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("RVM model loaded successfully");

        let (width, height) = quality.input_size();

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height),
            width,
            height,
            recurrent: None,
            downsample_ratio: 0.25,
        })
    }

    /// RVM accepts 1x1x1x1 zero tensors as the initial recurrent state
    fn initial_state() -> [Array4<f32>; 4] {
        std::array::from_fn(|_| Array4::zeros((1, 1, 1, 1)))
    }
}

impl SegmentationModel for RobustVideoMatting {
    fn segment(&mut self, frame: &Frame) -> Result<Mask> {
        let _span = tracing::debug_span!("rvm_segment").entered();

        let input_tensor = self.preprocessor.preprocess(frame);
        let recurrent = self.recurrent.take().unwrap_or_else(Self::initial_state);
        let ratio = Array1::from_elem(1, self.downsample_ratio);

        // RVM expects: src, r1i, r2i, r3i, r4i, downsample_ratio
        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![
                TensorRef::from_array_view(&input_tensor)?,
                TensorRef::from_array_view(&recurrent[0])?,
                TensorRef::from_array_view(&recurrent[1])?,
                TensorRef::from_array_view(&recurrent[2])?,
                TensorRef::from_array_view(&recurrent[3])?,
                TensorRef::from_array_view(&ratio)?
            ])
            .context("Failed to run inference")?;
        drop(_infer_span);

        // Outputs: fgr, pha, r1o, r2o, r3o, r4o
        let mut next_state = Vec::with_capacity(4);
        for index in 2..6 {
            let state = outputs[index]
                .try_extract_array::<f32>()?
                .to_owned()
                .into_dimensionality::<Ix4>()?;
            next_state.push(state);
        }
        self.recurrent = next_state.try_into().ok();

        // Alpha matte, shape [1, 1, H, W]
        let pha = outputs[1].try_extract_array::<f32>()?;
        let shape = pha.shape();
        let (matte_height, matte_width) = (shape[2] as u32, shape[3] as u32);
        let matte: Vec<f32> = pha.iter().map(|value| value.clamp(0.0, 1.0)).collect();

        mask_from_matte(matte, matte_width, matte_height)
    }

    fn reset_state(&mut self) {
        tracing::info!("Resetting RVM hidden states");
        self.recurrent = None;
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
