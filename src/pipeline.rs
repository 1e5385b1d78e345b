use std::time::{Duration, Instant};

use opencv::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{CropPlan, FrameRange, FrameState, Thresholds};
use crate::detector::Detector;
use crate::error::{Error, Result};
use crate::tracker::{CropTracker, TrackUpdate};
use crate::video::{self, FrameSink, FrameSource};

const PROGRESS_EVERY: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub frames_read: u64,
    pub frames_skipped: u64,
    pub frames_written: u64,
    /// Processed frames where the previous window was held.
    pub frames_without_detections: u64,
}

/// source -> detector -> tracker -> sink, one frame at a time.
pub struct Pipeline<S, D, W> {
    source: S,
    detector: D,
    sink: W,
    plan: CropPlan,
    range: FrameRange,
    thresholds: Thresholds,
    tracker: CropTracker,
}

impl<S, D, W> Pipeline<S, D, W>
where
    S: FrameSource,
    D: Detector,
    W: FrameSink,
{
    pub fn new(
        source: S,
        detector: D,
        sink: W,
        plan: CropPlan,
        range: FrameRange,
        thresholds: Thresholds,
    ) -> Self {
        let tracker = CropTracker::new(&plan.seed, plan.crop_size.as_tuple(), plan.frame_size);
        debug!("seed {} -> initial window {}", plan.seed, tracker.window());

        Self {
            source,
            detector,
            sink,
            plan,
            range,
            thresholds,
            tracker,
        }
    }

    /// Runs until the stream ends or the frame range is exhausted. Source and
    /// sink are dropped (and so released) whatever the outcome.
    pub fn run(mut self) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let total = self.source.meta().total_frames;
        let mut last_report = Instant::now();
        let mut frame_idx = 0u64;

        loop {
            frame_idx += 1;

            match self.range.state(frame_idx) {
                FrameState::Finished => {
                    info!("reached end frame {}", frame_idx - 1);
                    break;
                }
                FrameState::Skipping => {
                    if !self.source.skip_frame()? {
                        info!("video finished while skipping at frame {}", frame_idx);
                        break;
                    }
                    stats.frames_read += 1;
                    stats.frames_skipped += 1;
                    continue;
                }
                FrameState::Processing => {}
            }

            let frame = match self.source.next_frame()? {
                Some(frame) => frame,
                None => {
                    info!("video finished after {} frames", frame_idx - 1);
                    break;
                }
            };
            stats.frames_read += 1;

            let (fw, fh) = self.plan.frame_size;
            let actual = (frame.cols() as u32, frame.rows() as u32);
            if actual != (fw, fh) {
                return Err(Error::FrameSizeMismatch {
                    expected_w: fw,
                    expected_h: fh,
                    actual_w: actual.0,
                    actual_h: actual.1,
                });
            }

            let detections = self
                .detector
                .detect(&frame, frame_idx, &self.thresholds)?;

            let update = self.tracker.update(&detections);
            match update {
                TrackUpdate::Selected { index, window } => debug!(
                    "frame {}: {} detections, picked #{} -> {}",
                    frame_idx,
                    detections.len(),
                    index,
                    window
                ),
                TrackUpdate::Held(window) => {
                    stats.frames_without_detections += 1;
                    warn!("frame {}: nothing detected, holding {}", frame_idx, window);
                }
            }

            let cropped = video::crop_frame(&frame, &update.window())?;
            self.sink.write_frame(&cropped)?;
            stats.frames_written += 1;

            if last_report.elapsed() >= PROGRESS_EVERY {
                match total {
                    Some(total) => info!("progress {}/{}", frame_idx, total),
                    None => info!("progress {}", frame_idx),
                }
                last_report = Instant::now();
            }
        }

        self.sink.finish()?;

        info!(
            "done: {} read, {} skipped, {} written, {} without detections",
            stats.frames_read,
            stats.frames_skipped,
            stats.frames_written,
            stats.frames_without_detections
        );

        Ok(stats)
    }
}
