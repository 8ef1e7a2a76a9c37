use super::FrameSource;
use crate::error::PipelineError;
use crate::frame::Frame;
use anyhow::{anyhow, Context, Result};
use image::imageops;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use tokio::sync::watch;

/// Webcam source backed by a dedicated capture thread
///
/// The thread owns the camera and publishes only the most recent frame, so
/// polling never blocks and never queues. Dropping the capture stops the
/// thread and releases the device.
pub struct WebcamCapture {
    latest: watch::Receiver<Option<Frame>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    pub fn new(
        device_index: u32,
        width: u32,
        height: u32,
        fps: u32,
        mirror: bool,
    ) -> Result<Self, PipelineError> {
        tracing::info!(
            "Initializing webcam {} at {}x{}",
            device_index,
            width,
            height
        );

        let (frame_tx, latest) = watch::channel(None);
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("webcam-capture".into())
                .spawn(move || {
                    let mut camera = match open_camera(device_index, width, height, fps) {
                        Ok(camera) => camera,
                        Err(err) => {
                            let _ = ready_tx.send(Err(err));
                            return;
                        }
                    };
                    let resolution = camera.resolution();
                    let _ = ready_tx.send(Ok((resolution.width(), resolution.height())));
                    capture_loop(&mut camera, &frame_tx, &stop, mirror);
                    if let Err(err) = camera.stop_stream() {
                        tracing::warn!("Failed to stop camera stream: {}", err);
                    }
                    tracing::info!("Webcam released");
                })
                .context("Failed to spawn capture thread")
                .map_err(PipelineError::Acquisition)?
        };

        let (width, height) = ready_rx
            .recv()
            .map_err(|_| anyhow!("Capture thread exited during startup"))
            .and_then(|ready| ready)
            .map_err(PipelineError::Acquisition)?;

        tracing::info!("Webcam initialized successfully ({}x{})", width, height);

        Ok(Self {
            latest,
            stop,
            worker: Some(worker),
            width,
            height,
        })
    }
}

fn open_camera(device_index: u32, width: u32, height: u32, fps: u32) -> Result<Camera> {
    let index = CameraIndex::Index(device_index);
    let format = CameraFormat::new_from(width, height, FrameFormat::MJPEG, fps);
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

    let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

    camera
        .open_stream()
        .context("Failed to open camera stream")?;

    Ok(camera)
}

fn capture_loop(
    camera: &mut Camera,
    frame_tx: &watch::Sender<Option<Frame>>,
    stop: &AtomicBool,
    mirror: bool,
) {
    while !stop.load(Ordering::Relaxed) {
        let decoded = camera
            .frame()
            .context("Failed to capture frame")
            .and_then(|frame| {
                frame
                    .decode_image::<RgbFormat>()
                    .context("Failed to decode frame")
            });

        match decoded {
            Ok(mut image) => {
                if mirror {
                    imageops::flip_horizontal_in_place(&mut image);
                }
                frame_tx.send_replace(Some(Frame::from(image)));
            }
            Err(err) => {
                tracing::error!("Camera stopped delivering frames: {:#}", err);
                return;
            }
        }
    }
}

impl FrameSource for WebcamCapture {
    fn current_frame(&mut self) -> Result<Option<Frame>> {
        let fresh = self
            .latest
            .has_changed()
            .map_err(|_| anyhow!("Camera stream ended"))?;
        if !fresh {
            return Ok(None);
        }
        Ok(self.latest.borrow_and_update().clone())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Capture thread panicked");
            }
        }
    }
}
