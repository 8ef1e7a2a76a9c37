//! Continuous capture → segment → composite → present pump
//!
//! Capture and presentation run on a fixed cadence. Segmentation runs as at
//! most one outstanding request; frames that arrive while it is in flight
//! are presented raw. A finished mask is applied to whichever frame is
//! current when it is collected, which may be newer than the frame it was
//! computed from.

use crate::background::{BackgroundLibrary, BackgroundResolver};
use crate::capture::FrameSource;
use crate::compositing::{Compositor, MaskProcessor};
use crate::config::PipelineConfig;
use crate::device::DeviceClass;
use crate::error::PipelineError;
use crate::frame::{CompositedFrame, Frame};
use crate::output::OutputSink;
use crate::segmentation::{resample_mask, MaskResult, SegmentationEngine};
use crate::selection::SelectionReader;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

/// Presented frames between timing reports
const STATS_INTERVAL: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Capturing,
    AwaitingMask,
    Compositing,
    Presented,
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No new frame was available; nothing presented
    NoFrame,
    /// A frame was presented; `mask_seq` names the frame the applied mask
    /// was computed from, if one was applied
    Presented { frame_seq: u64, mask_seq: Option<u64> },
}

/// Counters reported when the pipeline stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_presented: u64,
    pub frames_masked: u64,
    pub ticks_skipped: u64,
    pub masks_requested: u64,
}

#[derive(Debug, Default)]
struct Timings {
    frames: u64,
    capture: Duration,
    composite: Duration,
    present: Duration,
    // Inference runs off the presentation path, so it has its own count
    masks: u64,
    segment: Duration,
    window_start: Option<Instant>,
}

fn avg_ms(total: Duration, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total.as_secs_f64() * 1000.0 / count as f64
}

impl Timings {
    fn record_mask(&mut self, latency: Duration) {
        self.masks += 1;
        self.segment += latency;
    }

    fn report(&mut self) {
        let avg_capture_ms = avg_ms(self.capture, self.frames);
        let avg_segment_ms = avg_ms(self.segment, self.masks);
        let avg_composite_ms = avg_ms(self.composite, self.frames);
        let avg_present_ms = avg_ms(self.present, self.frames);
        let total_ms = avg_capture_ms + avg_composite_ms + avg_present_ms;

        let now = Instant::now();
        let fps = self
            .window_start
            .replace(now)
            .map(|start| STATS_INTERVAL as f64 / now.duration_since(start).as_secs_f64())
            .unwrap_or(0.0);

        tracing::info!(
            "Frame {}: capture={:.1}ms, segment={:.1}ms, composite={:.1}ms, output={:.1}ms, total={:.1}ms, {:.1} fps",
            self.frames,
            avg_capture_ms,
            avg_segment_ms,
            avg_composite_ms,
            avg_present_ms,
            total_ms,
            fps
        );
    }
}

pub struct FrameScheduler<S, O> {
    source: S,
    output: O,
    engine: SegmentationEngine,
    processor: MaskProcessor,
    resolver: BackgroundResolver,
    compositor: Compositor,
    library: Arc<BackgroundLibrary>,
    selection: SelectionReader,
    device_class: DeviceClass,
    fps: u32,
    state: SchedulerState,
    frame_seq: u64,
    summary: RunSummary,
    timings: Timings,
}

impl<S, O> FrameScheduler<S, O>
where
    S: FrameSource,
    O: OutputSink,
{
    pub fn new(
        source: S,
        output: O,
        engine: SegmentationEngine,
        library: Arc<BackgroundLibrary>,
        selection: SelectionReader,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            source,
            output,
            engine,
            processor: MaskProcessor::new(config.erosion_px, config.threshold),
            resolver: BackgroundResolver::new(),
            compositor: Compositor::new(),
            library,
            selection,
            device_class: config.device_class,
            fps: config.fps.max(1),
            state: SchedulerState::Idle,
            frame_seq: 0,
            summary: RunSummary::default(),
            timings: Timings::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn engine(&self) -> &SegmentationEngine {
        &self.engine
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            masks_requested: self.engine.requests_issued(),
            ..self.summary
        }
    }

    /// Run one cycle
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn tick(&mut self) -> Result<TickOutcome, PipelineError> {
        if self.state == SchedulerState::Stopped {
            return Ok(TickOutcome::NoFrame);
        }

        self.state = SchedulerState::Capturing;
        let capture_start = Instant::now();
        let frame = self
            .source
            .current_frame()
            .map_err(PipelineError::Acquisition)?;
        let capture_time = capture_start.elapsed();

        let Some(frame) = frame else {
            self.summary.ticks_skipped += 1;
            if self.engine.is_busy() {
                self.state = SchedulerState::AwaitingMask;
            }
            return Ok(TickOutcome::NoFrame);
        };

        self.frame_seq += 1;
        let frame_seq = self.frame_seq;
        let frame = Arc::new(frame);

        // Collect before submitting so a finished request frees the slot
        let mask = self.engine.poll_mask()?;
        if !self.engine.is_busy() {
            self.engine.request_mask(Arc::clone(&frame), frame_seq);
        }

        self.state = if mask.is_some() {
            SchedulerState::Compositing
        } else {
            SchedulerState::AwaitingMask
        };
        let composite_start = Instant::now();
        let composited = self.composite(&frame, frame_seq, mask.as_ref());
        let composite_time = composite_start.elapsed();

        let present_start = Instant::now();
        self.output
            .write_frame(&composited)
            .map_err(PipelineError::Presentation)?;
        let present_time = present_start.elapsed();
        self.state = SchedulerState::Presented;

        let mask_seq = mask.as_ref().map(|result| result.frame_seq);
        let mask_latency = mask.map(|result| result.latency);
        self.summary.frames_presented += 1;
        if mask_seq.is_some() {
            self.summary.frames_masked += 1;
        }

        self.timings.window_start.get_or_insert(capture_start);
        self.timings.frames += 1;
        self.timings.capture += capture_time;
        self.timings.composite += composite_time;
        self.timings.present += present_time;
        if let Some(latency) = mask_latency {
            self.timings.record_mask(latency);
        }
        if self.timings.frames % STATS_INTERVAL == 0 {
            self.timings.report();
        }

        Ok(TickOutcome::Presented {
            frame_seq,
            mask_seq,
        })
    }

    fn composite(&mut self, frame: &Frame, frame_seq: u64, mask: Option<&MaskResult>) -> CompositedFrame {
        let snapshot = self.selection.snapshot();
        let selection = snapshot.selection();
        let (width, height) = frame.dimensions();

        let cleaned = mask
            .filter(|_| selection.has_effect())
            .map(|result| {
                if result.frame_seq != frame_seq {
                    tracing::debug!(
                        "Applying mask from frame {} to frame {}",
                        result.frame_seq,
                        frame_seq
                    );
                }
                let resampled = resample_mask(&result.mask, width, height);
                self.processor.clean(&resampled, self.device_class)
            });

        let background = self.resolver.resolve_with_blur(
            selection,
            snapshot.image_blur(),
            width,
            height,
            &self.library,
        );
        self.compositor.compose(frame, cleaned.as_ref(), &background)
    }

    /// Pump until `stop` fires (or its sender is dropped) or a fatal error
    ///
    /// On exit any pending mask request is abandoned and the frame source is
    /// dropped, releasing the capture device.
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> Result<RunSummary, PipelineError> {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.fps));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Starting main pipeline loop at {} fps", self.fps);

        let result = loop {
            tokio::select! {
                _ = &mut stop => {
                    tracing::info!("Stop requested");
                    break Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        tracing::error!("Pipeline failed: {}", err);
                        break Err(err);
                    }
                }
            }
        };

        let summary = self.shutdown();
        result.map(|()| summary)
    }

    fn shutdown(mut self) -> RunSummary {
        self.engine.abandon();
        self.state = SchedulerState::Stopped;
        let summary = self.summary();
        drop(self.source);

        tracing::info!(
            "Pipeline stopped: {} frames presented, {} masked, {} masks requested",
            summary.frames_presented,
            summary.frames_masked,
            summary.masks_requested
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_average_counts_masks_not_frames() {
        let mut timings = Timings {
            frames: 30,
            ..Timings::default()
        };
        timings.record_mask(Duration::from_millis(40));
        timings.record_mask(Duration::from_millis(60));

        assert_eq!(timings.masks, 2);
        assert!((avg_ms(timings.segment, timings.masks) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_averages_are_zero() {
        assert_eq!(avg_ms(Duration::from_millis(5), 0), 0.0);
    }
}
