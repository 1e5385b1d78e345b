use std::path::{Path, PathBuf};

use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio,
};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::geometry::CropWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Not every container reports it.
    pub total_frames: Option<u64>,
}

pub trait FrameSource {
    fn meta(&self) -> VideoMeta;

    /// `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Mat>>;

    /// Advances past one frame without handing it out. Returns `false` at
    /// end of stream.
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.next_frame()?.is_some())
    }
}

pub trait FrameSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()>;

    /// Flushes and closes the sink. Called once on the success path; Drop
    /// covers the others.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn meta(&self) -> VideoMeta {
        (**self).meta()
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        (**self).next_frame()
    }

    fn skip_frame(&mut self) -> Result<bool> {
        (**self).skip_frame()
    }
}

impl<W: FrameSink + ?Sized> FrameSink for Box<W> {
    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Copies the window out of the frame into its own continuous Mat.
pub fn crop_frame(frame: &Mat, window: &CropWindow) -> Result<Mat> {
    let roi = Mat::roi(frame, window.as_rect())?;
    Ok(roi.try_clone()?)
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::config(format!("path {:?} is not valid UTF-8", path)))
}

pub struct VideoFileSource {
    cap: videoio::VideoCapture,
    meta: VideoMeta,
    path: PathBuf,
}

impl VideoFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }

        let cap = videoio::VideoCapture::from_file(path_str(path)?, videoio::CAP_ANY)?;
        if !cap.is_opened()? {
            return Err(Error::VideoOpen(path.to_path_buf()));
        }

        let fps = cap.get(videoio::CAP_PROP_FPS)?;
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let total = cap.get(videoio::CAP_PROP_FRAME_COUNT)?;

        let meta = VideoMeta {
            fps,
            width,
            height,
            total_frames: if total > 0.0 { Some(total as u64) } else { None },
        };

        info!(
            "opened {:?}: {}x{} @ {:.2} fps, {:?} frames",
            path, width, height, fps, meta.total_frames
        );

        Ok(Self {
            cap,
            meta,
            path: path.to_path_buf(),
        })
    }

    pub fn release(&mut self) -> Result<()> {
        if self.cap.is_opened()? {
            self.cap.release()?;
        }

        Ok(())
    }
}

impl FrameSource for VideoFileSource {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.cap.read(&mut frame)? || frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.cap.grab()?)
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("releasing {:?} failed: {}", self.path, err);
        }
    }
}

/// Writes frames of one fixed size.
pub struct VideoFileSink {
    writer: Option<videoio::VideoWriter>,
    size: (u32, u32),
    out_file: PathBuf,
    written: u64,
}

impl VideoFileSink {
    pub fn create<P: AsRef<Path>>(
        out_file: P,
        fourcc: [u8; 4],
        fps: f64,
        size: (u32, u32),
    ) -> Result<Self> {
        let out_file = out_file.as_ref();
        let code = videoio::VideoWriter::fourcc(
            fourcc[0] as _,
            fourcc[1] as _,
            fourcc[2] as _,
            fourcc[3] as _,
        )?;

        let writer = videoio::VideoWriter::new(
            path_str(out_file)?,
            code,
            fps,
            core::Size::new(size.0 as i32, size.1 as i32),
            true,
        )?;

        if !writer.is_opened()? {
            return Err(Error::VideoOpen(out_file.to_path_buf()));
        }

        info!(
            "writing {:?}: {}x{} @ {:.2} fps, fourcc {}",
            out_file,
            size.0,
            size.1,
            fps,
            String::from_utf8_lossy(&fourcc)
        );

        Ok(Self {
            writer: Some(writer),
            size,
            out_file: out_file.to_path_buf(),
            written: 0,
        })
    }

    pub fn release(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.release()?;
            info!("closed {:?} after {} frames", self.out_file, self.written);
        }

        Ok(())
    }
}

impl FrameSink for VideoFileSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        let actual = (frame.cols() as u32, frame.rows() as u32);
        if actual != self.size {
            return Err(Error::FrameSizeMismatch {
                expected_w: self.size.0,
                expected_h: self.size.1,
                actual_w: actual.0,
                actual_h: actual.1,
            });
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::VideoOpen(self.out_file.clone()))?;

        writer.write(frame)?;
        self.written += 1;

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.release()
    }
}

impl Drop for VideoFileSink {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("releasing {:?} failed: {}", self.out_file, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_frame_extracts_window() -> Result<()> {
        let mut frame = Mat::new_rows_cols_with_default(
            120,
            160,
            core::CV_8UC3,
            core::Scalar::all(0.0),
        )?;
        *frame.at_2d_mut::<core::Vec3b>(30, 40)? = core::VecN([255, 128, 7]);

        let cropped = crop_frame(&frame, &CropWindow::new(40, 30, 90, 70))?;

        assert_eq!((cropped.cols(), cropped.rows()), (50, 40));
        assert!(cropped.is_continuous());
        assert_eq!(cropped.at_2d::<core::Vec3b>(0, 0)?.0, [255, 128, 7]);
        assert_eq!(cropped.at_2d::<core::Vec3b>(1, 1)?.0, [0, 0, 0]);

        Ok(())
    }

    #[test]
    fn missing_file_is_reported() {
        match VideoFileSource::open("no/such/video.mp4") {
            Err(Error::InputNotFound(path)) => assert_eq!(path, PathBuf::from("no/such/video.mp4")),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("opened a missing file"),
        }
    }
}
