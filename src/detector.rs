use crate::detection::Detection;
use crate::error::Error;

use ndarray::prelude::*;
use opencv::{core, dnn, prelude::*};

/// COCO class count, matching the yolov8n export the tool ships with.
const NUM_CLASSES: usize = 80;
const PRED_SIZE: usize = 4 + NUM_CLASSES;

/// Seam between the annotation loop and whatever produces detections.
pub trait Detect {
    fn detect(&mut self, frame: &core::Mat) -> Result<Vec<Detection>, Error>;
}

pub struct YoloDetectorConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub classes: Vec<i32>,
    pub input_size: (i32, i32),
}

impl YoloDetectorConfig {
    pub fn new(confidence_threshold: f32, classes: Vec<i32>) -> Self {
        Self {
            confidence_threshold,
            iou_threshold: 0.7,
            classes,
            input_size: (640, 640),
        }
    }
}

pub struct YoloDetector {
    net: dnn::Net,
    out_names: core::Vector<String>,
    config: YoloDetectorConfig,
}

impl YoloDetector {
    pub fn new(model_src: &str, config: YoloDetectorConfig) -> Result<Self, Error> {
        let net = dnn::read_net_from_onnx(model_src)?;
        let out_names = net.get_unconnected_out_layers_names()?;

        Ok(Self {
            net,
            out_names,
            config,
        })
    }
}

impl Detect for YoloDetector {
    fn detect(&mut self, frame: &core::Mat) -> Result<Vec<Detection>, Error> {
        let (fw, fh) = (frame.cols(), frame.rows());
        let (in_w, in_h) = self.config.input_size;

        let blob = dnn::blob_from_image(
            frame,
            1.0 / 255.0,
            core::Size::new(in_w, in_h),
            core::Scalar::new(0., 0., 0., 0.),
            true,
            false,
            core::CV_32F,
        )?;

        self.net.set_input(&blob, "", 1.0, core::Scalar::default())?;

        let mut outs = core::Vector::<core::Mat>::new();
        self.net.forward(&mut outs, &self.out_names)?;

        let preds = outs.get(0)?.try_into_typed::<f32>()?;
        let data = preds.data_typed()?;
        if data.is_empty() || data.len() % PRED_SIZE != 0 {
            return Err(Error::Model(format!(
                "prediction tensor of {} values is not a multiple of {}",
                data.len(),
                PRED_SIZE
            )));
        }

        let view = aview1(data)
            .into_shape((data.len() / PRED_SIZE, PRED_SIZE))
            .map_err(|err| Error::Model(err.to_string()))?;

        Ok(postprocess(&self.config, view, fw, fh))
    }
}

/// Extract the bounding boxes for which confidence is above the threshold,
/// then suppress overlapping boxes per class.
fn postprocess(
    config: &YoloDetectorConfig,
    preds: ArrayView2<'_, f32>,
    frame_width: i32,
    frame_height: i32,
) -> Vec<Detection> {
    let mut results = Vec::new();

    // The bounding boxes grouped by (maximum) class index.
    let mut bboxes: Vec<Vec<Detection>> = (0..NUM_CLASSES).map(|_| vec![]).collect();

    for pred in preds.outer_iter() {
        let pred = match pred.as_slice() {
            Some(pred) => pred,
            None => continue,
        };

        let (x, y, w, h) = match &pred[0..4] {
            [center_x, center_y, width, height] => (
                center_x * frame_width as f32,
                center_y * frame_height as f32,
                width * frame_width as f32,
                height * frame_height as f32,
            ),

            _ => unreachable!(),
        };

        let classes = &pred[4..];

        let mut class_index = -1;
        let mut confidence = 0.0;

        for (idx, val) in classes.iter().copied().enumerate() {
            if val > confidence {
                class_index = idx as i32;
                confidence = val;
            }
        }

        if class_index < 0 || confidence <= config.confidence_threshold {
            continue;
        }

        if !config.classes.is_empty() && !config.classes.contains(&class_index) {
            continue;
        }

        if w * h > ((frame_width / 2) * (frame_height / 2)) as f32 {
            continue;
        }

        bboxes[class_index as usize].push(Detection {
            x,
            y,
            w,
            h,
            confidence,
            class: class_index,
        });
    }

    for mut dets in bboxes.into_iter() {
        if dets.is_empty() {
            continue;
        }

        if dets.len() == 1 {
            results.append(&mut dets);
            continue;
        }

        let indices = non_maximum_supression(config.iou_threshold, &mut dets);

        results.extend(dets.drain(..).enumerate().filter_map(|(idx, item)| {
            if indices.contains(&(idx as i32)) {
                Some(item)
            } else {
                None
            }
        }));
    }

    results
}

fn non_maximum_supression(iou_threshold: f32, dets: &mut [Detection]) -> Vec<i32> {
    dets.sort_unstable_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

    let mut retain: Vec<_> = (0..dets.len() as i32).collect();
    for idx in 0..dets.len() - 1 {
        if retain[idx] != -1 {
            for r in retain[idx + 1..].iter_mut() {
                if *r != -1 {
                    let iou = dets[idx].iou(&dets[*r as usize]);
                    if iou > iou_threshold {
                        *r = -1;
                    }
                }
            }
        }
    }

    retain.retain(|&x| x > -1);
    retain
}
