use crate::config::Thresholds;
use crate::detection::Detection;
use crate::error::Error;

use ndarray::prelude::*;
use opencv::{core, dnn, prelude::*};
use tracing::info;

pub trait Detector {
    /// Boxes found in `frame`, the `frame_idx`-th frame of the stream.
    fn detect(
        &mut self,
        frame: &core::Mat,
        frame_idx: u64,
        thresholds: &Thresholds,
    ) -> Result<Vec<Detection>, Error>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(
        &mut self,
        frame: &core::Mat,
        frame_idx: u64,
        thresholds: &Thresholds,
    ) -> Result<Vec<Detection>, Error> {
        (**self).detect(frame, frame_idx, thresholds)
    }
}

pub struct YoloDetectorConfig {
    pub input_size: (u32, u32),
    /// Keep only these class ids, all classes when empty.
    pub classes: Vec<i32>,
}

impl YoloDetectorConfig {
    pub fn new(classes: Vec<i32>) -> Self {
        Self {
            input_size: (640, 640),
            classes,
        }
    }
}

/// YOLOv8 style ONNX model run through OpenCV dnn.
pub struct YoloDetector {
    net: dnn::Net,
    config: YoloDetectorConfig,
}

impl YoloDetector {
    pub fn new(model_src: &str, config: YoloDetectorConfig) -> Result<Self, Error> {
        let net = dnn::read_net_from_onnx(model_src)?;
        info!(
            "loaded model {:?}, input {}x{}",
            model_src, config.input_size.0, config.input_size.1
        );

        Ok(Self { net, config })
    }
}

impl Detector for YoloDetector {
    fn detect(
        &mut self,
        frame: &core::Mat,
        _frame_idx: u64,
        thresholds: &Thresholds,
    ) -> Result<Vec<Detection>, Error> {
        let (in_w, in_h) = self.config.input_size;

        let blob = dnn::blob_from_image(
            frame,
            1.0 / 255.0,
            core::Size::new(in_w as _, in_h as _),
            core::Scalar::new(0., 0., 0., 0.),
            true,
            false,
            core::CV_32F,
        )?;

        self.net
            .set_input(&blob, "", 1.0, core::Scalar::default())?;
        let output = self.net.forward_single("")?;

        let dims: Vec<usize> = output.mat_size().iter().map(|&d| d as usize).collect();
        let data = output.data_typed::<f32>()?;

        let preds = match dims[..] {
            [1, a, b] => {
                let view = ArrayView2::from_shape((a, b), data)
                    .map_err(|_| Error::ModelOutput(dims.clone()))?;

                // YOLOv8 exports [1, 4 + classes, anchors]
                if a < b {
                    view.reversed_axes()
                } else {
                    view
                }
            }
            _ => return Err(Error::ModelOutput(dims.clone())),
        };

        let scale = (
            frame.cols() as f32 / in_w as f32,
            frame.rows() as f32 / in_h as f32,
        );

        postprocess(preds, scale, &self.config.classes, thresholds)
    }
}

/// Turns raw predictions (one row per anchor: `cx, cy, w, h, class scores..`
/// in model input pixels) into frame-space detections.
pub fn postprocess(
    preds: ArrayView2<'_, f32>,
    scale: (f32, f32),
    classes: &[i32],
    thresholds: &Thresholds,
) -> Result<Vec<Detection>, Error> {
    let pred_size = preds.ncols();
    if pred_size < 5 {
        return Err(Error::ModelOutput(preds.shape().to_vec()));
    }

    let (sx, sy) = scale;
    let nclasses = pred_size - 4;

    // The bounding boxes grouped by (maximum) class index.
    let mut bboxes: Vec<Vec<Detection>> = (0..nclasses).map(|_| vec![]).collect();

    for row in preds.outer_iter() {
        let mut class_index = -1;
        let mut confidence = 0.0;

        for (idx, val) in row.iter().skip(4).copied().enumerate() {
            if val > confidence {
                class_index = idx as i32;
                confidence = val;
            }
        }

        if class_index < 0 || confidence <= thresholds.confidence {
            continue;
        }

        if !classes.is_empty() && !classes.contains(&class_index) {
            continue;
        }

        bboxes[class_index as usize].push(Detection {
            x: row[0] * sx,
            y: row[1] * sy,
            w: row[2] * sx,
            h: row[3] * sy,
            confidence,
            class: class_index,
        });
    }

    let mut results = Vec::new();

    for mut dets in bboxes.into_iter() {
        if dets.is_empty() {
            continue;
        }

        if dets.len() == 1 {
            results.append(&mut dets);
            continue;
        }

        let indices = non_maximum_supression(&mut dets, thresholds.overlap);

        results.extend(
            dets.drain(..)
                .enumerate()
                .filter_map(|(idx, item)| indices.contains(&idx).then(|| item)),
        );
    }

    Ok(results)
}

/// Sorts `dets` by confidence and returns the indices that survive.
pub fn non_maximum_supression(dets: &mut [Detection], iou_threshold: f32) -> Vec<usize> {
    dets.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut retain: Vec<Option<usize>> = (0..dets.len()).map(Some).collect();
    for idx in 0..dets.len().saturating_sub(1) {
        if retain[idx].is_some() {
            for r in retain[idx + 1..].iter_mut() {
                if let Some(other) = *r {
                    if dets[idx].iou(&dets[other]) > iou_threshold {
                        *r = None;
                    }
                }
            }
        }
    }

    retain.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> Detection {
        Detection {
            x,
            y,
            w,
            h,
            confidence,
            class: 0,
        }
    }

    #[test]
    fn nms_drops_overlapping_weaker_boxes() {
        let mut dets = vec![
            det(100.0, 100.0, 50.0, 50.0, 0.6),
            det(102.0, 101.0, 50.0, 50.0, 0.9),
            det(400.0, 400.0, 50.0, 50.0, 0.7),
        ];

        let keep = non_maximum_supression(&mut dets, 0.1);
        let kept: Vec<f32> = keep.iter().map(|&i| dets[i].confidence).collect();

        assert_eq!(kept, vec![0.9, 0.7]);
    }

    #[test]
    fn nms_of_single_box_keeps_it() {
        let mut dets = vec![det(1.0, 1.0, 2.0, 2.0, 0.5)];
        assert_eq!(non_maximum_supression(&mut dets, 0.1), vec![0]);
    }

    #[test]
    fn postprocess_filters_and_scales() {
        #[rustfmt::skip]
        let preds = array![
            // cx, cy, w, h, person, car
            [320.0, 320.0, 64.0, 32.0, 0.90, 0.10],
            [321.0, 321.0, 64.0, 32.0, 0.80, 0.05],
            [100.0, 100.0, 10.0, 10.0, 0.20, 0.30],
            [500.0, 200.0, 20.0, 40.0, 0.10, 0.70],
        ];

        let thresholds = Thresholds {
            confidence: 0.5,
            overlap: 0.1,
        };
        let dets = postprocess(preds.view(), (3.0, 1.6875), &[], &thresholds).unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class, 0);
        assert_eq!((dets[0].x, dets[0].w), (960.0, 192.0));
        assert_eq!((dets[0].y, dets[0].h), (540.0, 54.0));
        assert_eq!(dets[1].class, 1);
        assert_eq!(dets[1].confidence, 0.70);
    }

    #[test]
    fn postprocess_honours_class_filter() {
        let preds = array![
            [10.0, 10.0, 4.0, 4.0, 0.9, 0.0],
            [50.0, 50.0, 4.0, 4.0, 0.0, 0.9],
        ];
        let dets = postprocess(preds.view(), (1.0, 1.0), &[1], &Thresholds::default()).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class, 1);
    }

    #[test]
    fn postprocess_rejects_short_rows() {
        let preds = array![[1.0, 2.0, 3.0, 4.0]];
        assert!(postprocess(preds.view(), (1.0, 1.0), &[], &Thresholds::default()).is_err());
    }
}
