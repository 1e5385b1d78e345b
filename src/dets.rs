//! Line-oriented detection dumps (`.dets`), one `"<frame>: <json>"` line per
//! frame. Lets a run be repeated without the model.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use opencv::core::Mat;
use tracing::{debug, info};

use crate::config::Thresholds;
use crate::detection::Detection;
use crate::detector::Detector;
use crate::error::Error;
use crate::frame::Frame;

/// Serves detections recorded earlier. Frames without a line yield no
/// detections.
pub struct ReplayDetector<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    pending: Option<Frame>,
    exhausted: bool,
}

impl ReplayDetector<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!("replaying detections from {:?}", path);

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayDetector<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
            exhausted: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<Frame>, Error> {
        while !self.exhausted {
            let line = match self.lines.next() {
                Some(line) => line?,
                None => {
                    self.exhausted = true;
                    break;
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Frame::parse_line(&line, self.line_no).map(Some);
        }

        Ok(None)
    }

    /// Detections recorded for `frame_idx`. Indices must be requested in
    /// increasing order.
    pub fn frame(&mut self, frame_idx: u64) -> Result<Vec<Detection>, Error> {
        loop {
            let record = match self.pending.take() {
                Some(record) => record,
                None => match self.next_record()? {
                    Some(record) => record,
                    None => return Ok(Vec::new()),
                },
            };

            if record.index < frame_idx {
                continue;
            }

            if record.index == frame_idx {
                return Ok(record.detections);
            }

            self.pending = Some(record);
            return Ok(Vec::new());
        }
    }
}

impl<R: BufRead> Detector for ReplayDetector<R> {
    fn detect(
        &mut self,
        _frame: &Mat,
        frame_idx: u64,
        _thresholds: &Thresholds,
    ) -> Result<Vec<Detection>, Error> {
        self.frame(frame_idx)
    }
}

/// Passes detections through while dumping them.
pub struct RecordingDetector<D, W: Write> {
    inner: D,
    out: W,
}

impl<D: Detector> RecordingDetector<D, BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(inner: D, path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("dumping detections to {:?}", path);

        Ok(Self::new(inner, BufWriter::new(file)))
    }
}

impl<D: Detector, W: Write> RecordingDetector<D, W> {
    pub fn new(inner: D, out: W) -> Self {
        Self { inner, out }
    }

    pub fn into_inner(self) -> (D, W) {
        (self.inner, self.out)
    }
}

impl<D: Detector, W: Write> Detector for RecordingDetector<D, W> {
    fn detect(
        &mut self,
        frame: &Mat,
        frame_idx: u64,
        thresholds: &Thresholds,
    ) -> Result<Vec<Detection>, Error> {
        let detections = self.inner.detect(frame, frame_idx, thresholds)?;
        let record = Frame::new(frame_idx, detections);

        writeln!(self.out, "{}", record.to_line()?)?;
        self.out.flush()?;
        debug!("recorded {} detections for frame {}", record.len(), frame_idx);

        Ok(record.detections)
    }
}
