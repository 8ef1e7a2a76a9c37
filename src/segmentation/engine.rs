use super::types::SegmentationModel;
use crate::error::PipelineError;
use crate::frame::{Frame, Mask};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot::{self, error::TryRecvError};

/// A mask together with the sequence number of the frame it was computed from
#[derive(Debug, Clone)]
pub struct MaskResult {
    pub mask: Mask,
    pub frame_seq: u64,
    /// Time spent inside the model
    pub latency: Duration,
}

struct Completion {
    model: Box<dyn SegmentationModel>,
    result: anyhow::Result<Mask>,
    latency: Duration,
}

struct Pending {
    frame_seq: u64,
    rx: oneshot::Receiver<Completion>,
}

/// Asynchronous single-slot wrapper around a blocking segmentation model
///
/// Submitting a frame moves the model onto the blocking pool; it comes back
/// with the result. While a request is in flight the engine holds no model,
/// so a second request cannot be issued.
pub struct SegmentationEngine {
    model: Option<Box<dyn SegmentationModel>>,
    pending: Option<Pending>,
    requests: u64,
}

impl SegmentationEngine {
    pub fn new(model: Box<dyn SegmentationModel>) -> Self {
        let (width, height) = model.input_size();
        tracing::info!("Segmentation model input: {}x{}", width, height);
        Self {
            model: Some(model),
            pending: None,
            requests: 0,
        }
    }

    /// A request is in flight
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// False once the model is lost (worker died or the engine was abandoned)
    pub fn is_available(&self) -> bool {
        self.model.is_some() || self.pending.is_some()
    }

    /// Total requests issued so far
    pub fn requests_issued(&self) -> u64 {
        self.requests
    }

    /// Submit `frame` unless a request is already in flight
    ///
    /// Must be called from within a Tokio runtime. Returns whether a request
    /// was issued.
    pub fn request_mask(&mut self, frame: Arc<Frame>, frame_seq: u64) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let Some(mut model) = self.model.take() else {
            return false;
        };

        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let result = model.segment(&frame);
            let completion = Completion {
                model,
                result,
                latency: started.elapsed(),
            };
            // The receiver is gone when the request was abandoned
            if tx.send(completion).is_err() {
                tracing::debug!("Discarding mask for abandoned frame {}", frame_seq);
            }
        });

        self.pending = Some(Pending { frame_seq, rx });
        self.requests += 1;
        tracing::debug!("Requested mask for frame {}", frame_seq);
        true
    }

    /// Collect a finished request without waiting
    ///
    /// `Ok(None)` covers "nothing in flight", "not finished yet" and a failed
    /// inference (logged, model returned to the slot).
    pub fn poll_mask(&mut self) -> Result<Option<MaskResult>, PipelineError> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(None);
        };

        match pending.rx.try_recv() {
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => {
                self.pending = None;
                Err(PipelineError::ModelUnavailable {
                    reason: "segmentation worker terminated".into(),
                })
            }
            Ok(completion) => {
                let frame_seq = pending.frame_seq;
                self.pending = None;
                Ok(self.complete(completion, frame_seq))
            }
        }
    }

    /// Wait for the in-flight request, if any
    pub async fn wait_mask(&mut self) -> Result<Option<MaskResult>, PipelineError> {
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };

        match pending.rx.await {
            Ok(completion) => Ok(self.complete(completion, pending.frame_seq)),
            Err(_) => Err(PipelineError::ModelUnavailable {
                reason: "segmentation worker terminated".into(),
            }),
        }
    }

    /// Drop the in-flight request; its result is discarded when it arrives
    ///
    /// The model goes down with it, so the engine cannot be used afterwards.
    pub fn abandon(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!("Abandoning mask request for frame {}", pending.frame_seq);
        }
    }

    fn complete(&mut self, completion: Completion, frame_seq: u64) -> Option<MaskResult> {
        let Completion {
            mut model,
            result,
            latency,
        } = completion;
        let mask = match result {
            Ok(mask) => Some(MaskResult {
                mask,
                frame_seq,
                latency,
            }),
            Err(err) => {
                tracing::warn!("Segmentation failed for frame {}: {:#}", frame_seq, err);
                // Recurrent state from a failed run is not trusted
                model.reset_state();
                None
            }
        };
        self.model = Some(model);
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::uniform_mask;
    use anyhow::bail;
    use image::RgbaImage;

    struct ConstantModel;

    impl SegmentationModel for ConstantModel {
        fn segment(&mut self, frame: &Frame) -> anyhow::Result<Mask> {
            Ok(uniform_mask(frame.width(), frame.height(), 1.0))
        }

        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }
    }

    struct FailingModel;

    impl SegmentationModel for FailingModel {
        fn segment(&mut self, _frame: &Frame) -> anyhow::Result<Mask> {
            bail!("inference exploded")
        }

        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }
    }

    /// Fails every other call and counts state resets
    struct FlakyModel {
        calls: u32,
        resets: Arc<std::sync::atomic::AtomicU32>,
    }

    impl SegmentationModel for FlakyModel {
        fn segment(&mut self, frame: &Frame) -> anyhow::Result<Mask> {
            self.calls += 1;
            if self.calls % 2 == 1 {
                bail!("dropped frame");
            }
            Ok(uniform_mask(frame.width(), frame.height(), 0.5))
        }

        fn reset_state(&mut self) {
            self.resets.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }

        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }
    }

    struct SleepyModel;

    impl SegmentationModel for SleepyModel {
        fn segment(&mut self, frame: &Frame) -> anyhow::Result<Mask> {
            std::thread::sleep(Duration::from_millis(15));
            Ok(uniform_mask(frame.width(), frame.height(), 1.0))
        }

        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }
    }

    struct PanickingModel;

    impl SegmentationModel for PanickingModel {
        fn segment(&mut self, _frame: &Frame) -> anyhow::Result<Mask> {
            panic!("model crashed")
        }

        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }
    }

    fn frame() -> Arc<Frame> {
        Arc::new(Frame::new(RgbaImage::new(4, 3)))
    }

    #[tokio::test]
    async fn second_request_is_refused_while_busy() {
        let mut engine = SegmentationEngine::new(Box::new(ConstantModel));

        assert!(engine.request_mask(frame(), 1));
        assert!(engine.is_busy());
        assert!(!engine.request_mask(frame(), 2));
        assert_eq!(engine.requests_issued(), 1);

        let result = engine.wait_mask().await.unwrap().unwrap();
        assert_eq!(result.frame_seq, 1);
        assert_eq!(result.mask.dimensions(), (4, 3));

        assert!(!engine.is_busy());
        assert!(engine.request_mask(frame(), 3));
    }

    #[tokio::test]
    async fn failed_inference_returns_the_model() {
        let mut engine = SegmentationEngine::new(Box::new(FailingModel));

        engine.request_mask(frame(), 1);
        assert!(engine.wait_mask().await.unwrap().is_none());
        assert!(engine.request_mask(frame(), 2));
    }

    #[tokio::test]
    async fn failure_resets_recurrent_state() {
        let resets = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let mut engine = SegmentationEngine::new(Box::new(FlakyModel {
            calls: 0,
            resets: Arc::clone(&resets),
        }));

        engine.request_mask(frame(), 1);
        assert!(engine.wait_mask().await.unwrap().is_none());
        engine.request_mask(frame(), 2);
        assert!(engine.wait_mask().await.unwrap().is_some());

        assert_eq!(resets.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inference_time_is_reported() {
        let mut engine = SegmentationEngine::new(Box::new(SleepyModel));

        engine.request_mask(frame(), 1);
        let result = engine.wait_mask().await.unwrap().unwrap();

        assert!(result.latency >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn crashed_worker_is_reported() {
        let mut engine = SegmentationEngine::new(Box::new(PanickingModel));

        engine.request_mask(frame(), 1);
        let err = engine.wait_mask().await.unwrap_err();

        assert!(matches!(err, PipelineError::ModelUnavailable { .. }));
        assert!(!engine.is_available());
    }

    #[tokio::test]
    async fn abandoned_result_is_dropped() {
        let mut engine = SegmentationEngine::new(Box::new(ConstantModel));

        engine.request_mask(frame(), 1);
        engine.abandon();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(engine.poll_mask().unwrap().is_none());
        assert!(!engine.is_busy());
    }

    #[tokio::test]
    async fn idle_engine_polls_nothing() {
        let mut engine = SegmentationEngine::new(Box::new(ConstantModel));
        assert!(engine.poll_mask().unwrap().is_none());
        assert!(engine.wait_mask().await.unwrap().is_none());
    }
}
