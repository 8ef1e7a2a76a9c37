use anyhow::{Context, Result};
use backdrop::capture::{FrameSource, WebcamCapture};
use backdrop::output::V4L2Output;
use backdrop::segmentation::{self, SegmentationEngine};
use backdrop::{
    config, BackgroundLibrary, DeviceClass, FrameScheduler, PipelineConfig, SelectionControl,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceClassArg {
    /// Derive from the output resolution
    Auto,
    Mobile,
    Desktop,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Capture resolution width
    #[arg(long, default_value_t = 1280)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 720)]
    capture_height: u32,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = config::DEFAULT_FPS)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to segmentation model (ONNX file)
    #[arg(long)]
    model: PathBuf,

    /// Directory of background images (placeholders are generated otherwise)
    #[arg(long)]
    backgrounds: Option<PathBuf>,

    /// Background image selected at startup
    #[arg(long)]
    background: Option<usize>,

    /// Blur the background at startup
    #[arg(long)]
    blur: bool,

    /// Background blur radius in pixels
    #[arg(long, default_value_t = config::DEFAULT_BLUR_RADIUS)]
    blur_radius: u32,

    /// Mask erosion in pixels (desktop class only)
    #[arg(long, default_value_t = config::DEFAULT_EROSION_PX)]
    erosion: u32,

    /// Turn the soft mask into a hard one at this probability
    #[arg(long)]
    threshold: Option<f32>,

    /// Device class governing model size and mask erosion
    #[arg(long, value_enum, default_value_t = DeviceClassArg::Auto)]
    device_class: DeviceClassArg,

    /// Mirror the camera image (selfie view)
    #[arg(long)]
    mirror: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let device_class = match self.device_class {
            DeviceClassArg::Auto => DeviceClass::from_display(self.output_width, self.output_height),
            DeviceClassArg::Mobile => DeviceClass::Mobile,
            DeviceClassArg::Desktop => DeviceClass::Desktop,
        };

        PipelineConfig {
            device_class,
            fps: self.fps,
            blur_radius: self.blur_radius,
            erosion_px: self.erosion,
            threshold: self.threshold,
            mirror: self.mirror,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.pipeline_config();

    tracing::info!("Backdrop starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Output: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", config.fps);
    tracing::info!("Device class: {:?}", config.device_class);

    let library = match &args.backgrounds {
        Some(dir) => BackgroundLibrary::load_dir(dir)?,
        None => BackgroundLibrary::placeholders(backdrop::background::PLACEHOLDER_COUNT),
    };
    let library = Arc::new(library);
    tracing::info!("Loaded {} background images", library.len());

    let (control, selection) = SelectionControl::new(library.len(), config.blur_radius);
    control.set_background(args.background)?;
    control.set_blur(args.blur);

    let model = segmentation::create_default_model(&args.model, config.device_class.model_quality())?;
    let engine = SegmentationEngine::new(model);

    let capture = WebcamCapture::new(
        args.input_device,
        args.capture_width,
        args.capture_height,
        config.fps,
        config.mirror,
    )?;
    tracing::info!("Capturing at {:?}", capture.resolution());

    let output = V4L2Output::new(&args.output_device, args.output_width, args.output_height)
        .context("Failed to initialize v4l2loopback output")?;

    let scheduler = FrameScheduler::new(capture, output, engine, library, selection, &config);

    let (stop_tx, stop_rx) = oneshot::channel();
    tokio::spawn(async move {
        let quit = tokio::select! {
            quit = backdrop::control::read_stdin(control) => quit,
            _ = tokio::signal::ctrl_c() => true,
        };
        if quit {
            let _ = stop_tx.send(());
        } else {
            // stdin closed; keep running until Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            let _ = stop_tx.send(());
        }
    });

    tracing::info!("Type `bg <n>`, `bg none`, `blur on|off`, `status` or `quit`; Ctrl+C stops");
    let summary = scheduler.run(stop_rx).await?;
    tracing::info!("Presented {} frames", summary.frames_presented);

    Ok(())
}
