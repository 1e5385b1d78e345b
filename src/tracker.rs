use crate::bbox::{BBox, Ltrb};
use crate::geometry::{self, CropWindow};
use crate::Detection;

/// Outcome of feeding one frame's detections to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackUpdate {
    /// A detection was selected and the window moved onto it.
    Selected { index: usize, window: CropWindow },
    /// Nothing was detected, the previous window is kept.
    Held(CropWindow),
}

impl TrackUpdate {
    #[inline]
    pub fn window(&self) -> CropWindow {
        match *self {
            TrackUpdate::Selected { window, .. } | TrackUpdate::Held(window) => window,
        }
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        matches!(self, TrackUpdate::Held(_))
    }
}

/// Follows a single object across frames with a fixed-size crop window.
#[derive(Debug, Clone)]
pub struct CropTracker {
    crop_size: (u32, u32),
    frame_size: (u32, u32),
    last_box: BBox<Ltrb>,
    window: CropWindow,
}

impl CropTracker {
    /// `seed` is the reference box for the first frame; the initial window
    /// is centered on it.
    pub fn new(seed: &CropWindow, crop_size: (u32, u32), frame_size: (u32, u32)) -> Self {
        let last_box = seed.as_bbox();
        let window = geometry::clamp(
            &geometry::crop_window(&last_box, crop_size.0, crop_size.1),
            frame_size.0,
            frame_size.1,
        );

        Self {
            crop_size,
            frame_size,
            last_box,
            window,
        }
    }

    #[inline]
    pub fn window(&self) -> CropWindow {
        self.window
    }

    #[inline]
    pub fn last_box(&self) -> &BBox<Ltrb> {
        &self.last_box
    }

    pub fn update(&mut self, detections: &[Detection]) -> TrackUpdate {
        let boxes: Vec<BBox<Ltrb>> = detections.iter().map(|d| d.ltrb().snapped()).collect();
        let reference = self.last_box.center();

        let (index, selected) = match geometry::nearest(&boxes, &reference) {
            Some(found) => found,
            None => return TrackUpdate::Held(self.window),
        };

        let (cw, ch) = self.crop_size;
        let (fw, fh) = self.frame_size;

        self.last_box = *selected;
        self.window = geometry::clamp(&geometry::crop_window(selected, cw, ch), fw, fh);

        TrackUpdate::Selected {
            index,
            window: self.window,
        }
    }
}
