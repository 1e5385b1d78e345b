use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use follow_crop::{
    config::{DEFAULT_CONFIDENCE, DEFAULT_OVERLAP},
    dets::{RecordingDetector, ReplayDetector},
    Config, CropSize, CropWindow, Detector, FrameRange, FrameSource, Pipeline, Thresholds,
    VideoFileSink, VideoFileSource, YoloDetector, YoloDetectorConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Crop a video to a fixed-size window that follows one detected object
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Source video
    #[arg(short, long)]
    input: PathBuf,

    /// Cropped output video
    #[arg(short, long)]
    output: PathBuf,

    /// YOLO ONNX model
    #[arg(short, long, required_unless_present = "detections", conflicts_with = "detections")]
    model: Option<PathBuf>,

    /// Replay detections from a .dets file instead of running a model
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Also write every detection set to this .dets file
    #[arg(long)]
    dump_detections: Option<PathBuf>,

    /// Initial window as left,top,right,bottom (default: whole frame)
    #[arg(long)]
    seed: Option<CropWindow>,

    /// Output size as WIDTHxHEIGHT (default: size of the seed window)
    #[arg(long)]
    crop_size: Option<CropSize>,

    /// First frame to process, 1-based
    #[arg(long, default_value_t = 1)]
    start_frame: u64,

    /// Last frame to process, inclusive
    #[arg(long)]
    end_frame: Option<u64>,

    /// Detector confidence threshold
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// Detector overlap (IoU) threshold for non-maximum suppression
    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    overlap: f32,

    /// Keep only these class ids, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    classes: Vec<i32>,

    /// Model input size as WIDTHxHEIGHT
    #[arg(long, default_value = "640x640")]
    input_size: CropSize,

    /// Output codec
    #[arg(long, default_value = "MPEG")]
    fourcc: String,
}

impl Args {
    fn config(&self) -> anyhow::Result<Config> {
        let fourcc: [u8; 4] = self
            .fourcc
            .as_bytes()
            .try_into()
            .map_err(|_| anyhow::anyhow!("fourcc {:?} must be 4 characters", self.fourcc))?;

        Ok(Config {
            input: self.input.clone(),
            output: self.output.clone(),
            seed: self.seed,
            crop_size: self.crop_size,
            range: FrameRange {
                start: self.start_frame,
                end: self.end_frame,
            },
            thresholds: Thresholds {
                confidence: self.confidence,
                overlap: self.overlap,
            },
            fourcc,
        })
    }

    fn detector(&self) -> anyhow::Result<Box<dyn Detector>> {
        let detector: Box<dyn Detector> = match (&self.model, &self.detections) {
            (_, Some(dets)) => Box::new(
                ReplayDetector::open(dets)
                    .with_context(|| format!("opening detections {:?}", dets))?,
            ),
            (Some(model), None) => {
                let model = model
                    .to_str()
                    .with_context(|| format!("model path {:?} is not valid UTF-8", model))?;
                let mut config = YoloDetectorConfig::new(self.classes.clone());
                config.input_size = self.input_size.as_tuple();

                Box::new(YoloDetector::new(model, config)?)
            }
            (None, None) => anyhow::bail!("either --model or --detections is required"),
        };

        Ok(match &self.dump_detections {
            Some(path) => Box::new(RecordingDetector::create(detector, path)?),
            None => detector,
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("follow_crop=info")),
        )
        .init();

    let args = Args::parse();
    let config = args.config()?;
    config.validate()?;

    let source = VideoFileSource::open(&config.input)?;
    let meta = source.meta();
    let plan = config.plan(&meta)?;
    info!(
        "crop {} seeded at {} in {}x{} frames",
        plan.crop_size, plan.seed, meta.width, meta.height
    );

    let detector = args.detector()?;
    let sink = VideoFileSink::create(
        &config.output,
        config.fourcc,
        meta.fps,
        plan.crop_size.as_tuple(),
    )?;

    let stats = Pipeline::new(source, detector, sink, plan, config.range, config.thresholds).run()?;
    info!("wrote {} frames to {:?}", stats.frames_written, config.output);

    Ok(())
}
