use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("OpenCV Error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("input file {0:?} does not exist")]
    InputNotFound(PathBuf),

    #[error("unable to open video {0:?}")]
    VideoOpen(PathBuf),

    #[error("crop size {crop_w}x{crop_h} exceeds frame size {frame_w}x{frame_h}")]
    CropExceedsFrame {
        crop_w: u32,
        crop_h: u32,
        frame_w: u32,
        frame_h: u32,
    },

    #[error("frame size {actual_w}x{actual_h} does not match expected {expected_w}x{expected_h}")]
    FrameSizeMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed detections at line {line}: {reason}")]
    DetsFormat { line: usize, reason: String },

    #[error("unexpected model output shape {0:?}")]
    ModelOutput(Vec<usize>),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
