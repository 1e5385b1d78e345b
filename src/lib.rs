pub mod bbox;
pub mod config;
pub mod detection;
pub mod detector;
pub mod dets;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod pipeline;
pub mod tracker;
pub mod video;

pub use config::{Config, CropPlan, CropSize, FrameRange, Thresholds};
pub use detection::Detection;
pub use detector::{Detector, YoloDetector, YoloDetectorConfig};
pub use error::{Error, Result};
pub use frame::Frame;
pub use geometry::CropWindow;
pub use pipeline::{Pipeline, RunStats};
pub use tracker::{CropTracker, TrackUpdate};
pub use video::{FrameSink, FrameSource, VideoFileSink, VideoFileSource, VideoMeta};
