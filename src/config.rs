use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::geometry::CropWindow;
use crate::video::VideoMeta;

pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_OVERLAP: f32 = 0.1;

/// Detector thresholds forwarded on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub confidence: f32,
    /// IoU above which same-class boxes are suppressed.
    pub overlap: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Skipping,
    Processing,
    Finished,
}

/// Inclusive range of 1-based frame indices to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            start: 1,
            end: None,
        }
    }
}

impl FrameRange {
    pub fn state(&self, idx: u64) -> FrameState {
        match self.end {
            Some(end) if idx > end => FrameState::Finished,
            _ if idx < self.start => FrameState::Skipping,
            _ => FrameState::Processing,
        }
    }
}

/// `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSize {
    pub width: u32,
    pub height: u32,
}

impl CropSize {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn as_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Display for CropSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for CropSize {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| Error::config(format!("size {:?}: expected WIDTHxHEIGHT", s)))?;

        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| Error::config(format!("size {:?}: {}", s, e)))
        };

        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

/// Everything a run needs, fixed before the first frame is read.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub seed: Option<CropWindow>,
    pub crop_size: Option<CropSize>,
    pub range: FrameRange,
    pub thresholds: Thresholds,
    pub fourcc: [u8; 4],
}

impl Config {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(input: P, output: Q) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            seed: None,
            crop_size: None,
            range: FrameRange::default(),
            thresholds: Thresholds::default(),
            fourcc: *b"MPEG",
        }
    }

    /// Checks that don't need the video to be opened.
    pub fn validate(&self) -> Result<()> {
        if !self.input.is_file() {
            return Err(Error::InputNotFound(self.input.clone()));
        }

        if let Some(size) = &self.crop_size {
            if size.width == 0 || size.height == 0 {
                return Err(Error::config(format!("crop size {} is empty", size)));
            }
        }

        if let Some(seed) = &self.seed {
            if seed.is_empty() {
                return Err(Error::config(format!("seed window {} is empty", seed)));
            }
        }

        if self.range.start == 0 {
            return Err(Error::config("frame indices start at 1"));
        }

        if let Some(end) = self.range.end {
            if end < self.range.start {
                return Err(Error::config(format!(
                    "end frame {} is before start frame {}",
                    end, self.range.start
                )));
            }
        }

        let Thresholds {
            confidence,
            overlap,
        } = self.thresholds;

        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::config(format!(
                "confidence threshold {} is outside [0, 1]",
                confidence
            )));
        }

        if !(0.0..=1.0).contains(&overlap) {
            return Err(Error::config(format!(
                "overlap threshold {} is outside [0, 1]",
                overlap
            )));
        }

        if !self.fourcc.iter().all(u8::is_ascii_graphic) {
            return Err(Error::config("fourcc must be four printable characters"));
        }

        Ok(())
    }

    /// Resolves seed and crop size against the opened video.
    pub fn plan(&self, meta: &VideoMeta) -> Result<CropPlan> {
        let frame_size = (meta.width, meta.height);

        let seed = match &self.seed {
            Some(seed) => seed.clip_to(meta.width, meta.height),
            None => CropWindow::full(meta.width, meta.height),
        };

        if seed.is_empty() {
            return Err(Error::config(format!(
                "seed window lies outside the {}x{} frame",
                meta.width, meta.height
            )));
        }

        let crop_size = match self.crop_size {
            Some(size) => size,
            None => CropSize::new(seed.width() as u32, seed.height() as u32),
        };

        if crop_size.width > meta.width || crop_size.height > meta.height {
            return Err(Error::CropExceedsFrame {
                crop_w: crop_size.width,
                crop_h: crop_size.height,
                frame_w: meta.width,
                frame_h: meta.height,
            });
        }

        Ok(CropPlan {
            frame_size,
            crop_size,
            seed,
        })
    }
}

/// Validated geometry of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropPlan {
    pub frame_size: (u32, u32),
    pub crop_size: CropSize,
    pub seed: CropWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(width: u32, height: u32) -> VideoMeta {
        VideoMeta {
            fps: 25.0,
            width,
            height,
            total_frames: None,
        }
    }

    fn existing_input() -> Config {
        Config::new("Cargo.toml", "out.avi")
    }

    #[test]
    fn range_states() {
        let range = FrameRange {
            start: 10,
            end: Some(20),
        };

        assert_eq!(range.state(1), FrameState::Skipping);
        assert_eq!(range.state(9), FrameState::Skipping);
        assert_eq!(range.state(10), FrameState::Processing);
        assert_eq!(range.state(20), FrameState::Processing);
        assert_eq!(range.state(21), FrameState::Finished);

        assert_eq!(FrameRange::default().state(1_000_000), FrameState::Processing);
    }

    #[test]
    fn parses_crop_size() {
        assert_eq!("400x300".parse::<CropSize>().unwrap(), CropSize::new(400, 300));
        assert_eq!("64X48".parse::<CropSize>().unwrap(), CropSize::new(64, 48));
        assert!("400".parse::<CropSize>().is_err());
        assert!("-1x3".parse::<CropSize>().is_err());
    }

    #[test]
    fn missing_input_fails_fast() {
        let config = Config::new("does/not/exist.mp4", "out.avi");
        assert!(matches!(config.validate(), Err(Error::InputNotFound(_))));
    }

    #[test]
    fn validates_thresholds_and_range() {
        let mut config = existing_input();
        assert!(config.validate().is_ok());

        config.thresholds.confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = existing_input();
        config.range = FrameRange {
            start: 5,
            end: Some(4),
        };
        assert!(config.validate().is_err());

        let mut config = existing_input();
        config.crop_size = Some(CropSize::new(0, 10));
        assert!(config.validate().is_err());
    }

    #[test]
    fn crop_wider_than_frame_is_rejected() {
        let mut config = existing_input();
        config.crop_size = Some(CropSize::new(2000, 400));

        match config.plan(&meta(1920, 1080)) {
            Err(Error::CropExceedsFrame { crop_w, frame_w, .. }) => {
                assert_eq!((crop_w, frame_w), (2000, 1920));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn defaults_to_full_frame_seed() {
        let plan = existing_input().plan(&meta(640, 480)).unwrap();

        assert_eq!(plan.seed, CropWindow::full(640, 480));
        assert_eq!(plan.crop_size, CropSize::new(640, 480));
    }

    #[test]
    fn seed_is_clipped_and_sets_crop_size() {
        let mut config = existing_input();
        config.seed = Some(CropWindow::new(-50, 100, 500, 600));

        let plan = config.plan(&meta(640, 480)).unwrap();

        assert_eq!(plan.seed, CropWindow::new(0, 100, 500, 480));
        assert_eq!(plan.crop_size, CropSize::new(500, 380));
    }

    #[test]
    fn explicit_crop_size_wins_over_seed() {
        let mut config = existing_input();
        config.seed = Some(CropWindow::new(0, 0, 400, 400));
        config.crop_size = Some(CropSize::new(320, 240));

        let plan = config.plan(&meta(1920, 1080)).unwrap();
        assert_eq!(plan.crop_size, CropSize::new(320, 240));
    }
}
