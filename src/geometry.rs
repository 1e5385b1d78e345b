use std::fmt;
use std::str::FromStr;

use nalgebra as na;
use opencv::core;

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;

/// Integer pixel rectangle extracted from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl CropWindow {
    #[inline]
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The whole frame.
    #[inline]
    pub fn full(frame_w: u32, frame_h: u32) -> Self {
        Self::new(0, 0, frame_w as i32, frame_h as i32)
    }

    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    #[inline]
    pub fn as_bbox(&self) -> BBox<Ltrb> {
        BBox::ltrb(
            self.left as f32,
            self.top as f32,
            self.right as f32,
            self.bottom as f32,
        )
    }

    #[inline]
    pub fn as_rect(&self) -> core::Rect {
        core::Rect::new(self.left, self.top, self.width(), self.height())
    }

    #[inline]
    pub fn is_inside(&self, frame_w: u32, frame_h: u32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right <= frame_w as i32
            && self.bottom <= frame_h as i32
    }

    /// Clips every edge to the frame on its own. The result can be smaller
    /// than the input; only used to sanitise user supplied seed windows.
    pub fn clip_to(&self, frame_w: u32, frame_h: u32) -> Self {
        let (fw, fh) = (frame_w as i32, frame_h as i32);

        Self::new(
            self.left.clamp(0, fw),
            self.top.clamp(0, fh),
            self.right.clamp(0, fw),
            self.bottom.clamp(0, fh),
        )
    }
}

impl fmt::Display for CropWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Parses `left,top,right,bottom`.
impl FromStr for CropWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::config(format!("window {:?}: {}", s, e)))?;

        match parts[..] {
            [l, t, r, b] => Ok(Self::new(l, t, r, b)),
            _ => Err(Error::config(format!(
                "window {:?}: expected left,top,right,bottom",
                s
            ))),
        }
    }
}

/// Picks the box whose center is closest to `reference`.
///
/// Ties keep the first box in iteration order. Returns `None` for an empty
/// candidate set.
pub fn nearest<'a, I>(boxes: I, reference: &na::Point2<f32>) -> Option<(usize, &'a BBox<Ltrb>)>
where
    I: IntoIterator<Item = &'a BBox<Ltrb>>,
{
    let mut best: Option<(usize, &'a BBox<Ltrb>, f32)> = None;

    for (idx, bbox) in boxes.into_iter().enumerate() {
        let dist = na::distance(&bbox.center(), reference);

        match best {
            Some((_, _, best_dist)) if dist >= best_dist => {}
            _ => best = Some((idx, bbox, dist)),
        }
    }

    best.map(|(idx, bbox, _)| (idx, bbox))
}

/// Window of exactly `width` x `height` centered on the box.
pub fn crop_window(bbox: &BBox<Ltrb>, width: u32, height: u32) -> CropWindow {
    let center = bbox.center();
    let left = center.x.floor() as i32 - (width / 2) as i32;
    let top = center.y.floor() as i32 - (height / 2) as i32;

    CropWindow::new(left, top, left + width as i32, top + height as i32)
}

/// Shifts the window back inside `[0, frame_w] x [0, frame_h]` keeping its
/// size. The window must not be larger than the frame.
pub fn clamp(window: &CropWindow, frame_w: u32, frame_h: u32) -> CropWindow {
    let (w, h) = (window.width(), window.height());
    debug_assert!(w <= frame_w as i32 && h <= frame_h as i32);

    let left = window.left.min(frame_w as i32 - w).max(0);
    let top = window.top.min(frame_h as i32 - h).max(0);

    CropWindow::new(left, top, left + w, top + h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(l: f32, t: f32, r: f32, bt: f32) -> BBox<Ltrb> {
        BBox::ltrb(l, t, r, bt)
    }

    #[test]
    fn nearest_of_empty_is_none() {
        let boxes: Vec<BBox<Ltrb>> = vec![];
        assert!(nearest(&boxes, &na::Point2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn nearest_of_singleton_is_that_box() {
        let boxes = vec![b(1000.0, 1000.0, 1010.0, 1010.0)];
        let (idx, found) = nearest(&boxes, &na::Point2::new(0.0, 0.0)).unwrap();

        assert_eq!(idx, 0);
        assert_eq!(found, &boxes[0]);
    }

    #[test]
    fn nearest_picks_minimum_distance() {
        let boxes = vec![
            b(0.0, 0.0, 10.0, 10.0),
            b(90.0, 90.0, 110.0, 110.0),
            b(300.0, 300.0, 310.0, 310.0),
        ];
        let (idx, _) = nearest(&boxes, &na::Point2::new(95.0, 105.0)).unwrap();

        assert_eq!(idx, 1);
    }

    #[test]
    fn nearest_tie_keeps_first() {
        // both centers are 10px away from (50, 50)
        let boxes = vec![
            b(35.0, 45.0, 45.0, 55.0),
            b(55.0, 45.0, 65.0, 55.0),
            b(45.0, 55.0, 55.0, 65.0),
        ];
        let (idx, _) = nearest(&boxes, &na::Point2::new(50.0, 50.0)).unwrap();

        assert_eq!(idx, 0);
    }

    #[test]
    fn crop_window_has_requested_size() {
        for (w, h) in [(400, 400), (401, 299), (1, 1), (640, 360)] {
            for bbox in [
                b(180.0, 200.0, 260.0, 300.0),
                b(0.0, 0.0, 3.0, 3.0),
                b(1915.5, 1070.25, 1919.0, 1079.0),
            ] {
                let win = crop_window(&bbox, w, h);
                assert_eq!(win.width(), w as i32);
                assert_eq!(win.height(), h as i32);
            }
        }
    }

    #[test]
    fn crop_window_is_centered() {
        let win = crop_window(&b(180.0, 200.0, 260.0, 300.0), 400, 400);
        assert_eq!(win, CropWindow::new(20, 50, 420, 450));
    }

    #[test]
    fn clamp_keeps_inside_windows() {
        let win = CropWindow::new(20, 50, 420, 450);
        assert_eq!(clamp(&win, 1920, 1080), win);
    }

    #[test]
    fn clamp_shifts_back_from_every_edge() {
        let (fw, fh) = (1920, 1080);

        assert_eq!(
            clamp(&CropWindow::new(-30, -5, 370, 395), fw, fh),
            CropWindow::new(0, 0, 400, 400)
        );
        assert_eq!(
            clamp(&CropWindow::new(1700, 900, 2100, 1300), fw, fh),
            CropWindow::new(1520, 680, 1920, 1080)
        );
    }

    #[test]
    fn clamp_preserves_size_inside_frame() {
        let (fw, fh) = (640u32, 480u32);
        let (w, h) = (200u32, 150u32);

        for x in (-400..1000).step_by(37) {
            for y in (-300..800).step_by(41) {
                let bbox = b(x as f32, y as f32, x as f32 + 20.0, y as f32 + 30.0);
                let win = clamp(&crop_window(&bbox, w, h), fw, fh);

                assert!(win.is_inside(fw, fh), "{} outside", win);
                assert_eq!(win.width(), w as i32);
                assert_eq!(win.height(), h as i32);
            }
        }
    }

    #[test]
    fn clamp_of_frame_sized_window_is_full_frame() {
        let win = CropWindow::new(-10, 7, 630, 487);
        assert_eq!(clamp(&win, 640, 480), CropWindow::full(640, 480));
    }

    #[test]
    fn clip_to_truncates_edges() {
        let win = CropWindow::new(-10, 100, 700, 500).clip_to(640, 480);
        assert_eq!(win, CropWindow::new(0, 100, 640, 480));
    }

    #[test]
    fn parses_window() {
        let win: CropWindow = "0, 0, 400,400".parse().unwrap();
        assert_eq!(win, CropWindow::new(0, 0, 400, 400));

        assert!("0,0,400".parse::<CropWindow>().is_err());
        assert!("a,b,c,d".parse::<CropWindow>().is_err());
    }
}
