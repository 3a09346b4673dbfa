//! Steps through the videos stored in `pigeon_vids` and writes labels in
//! YOLO format to `yolo_labels`. Press `y` to save a datapoint, any other
//! key skips it. The annotation can be stopped at any time; the next run
//! continues from the last annotated frame.

use vidlabel::{Annotator, AnnotatorConfig, Error, HighguiReview, YoloDetector, YoloDetectorConfig};

const DATA_PATH: &str = "pigeon_vids";
const LABEL_PATH: &str = "yolo_labels";
const FRAME_SKIP: u64 = 8;

const MODEL_PATH: &str = "yolov8n.onnx";
const CONFIDENCE_THRESHOLD: f32 = 0.1;
const IOU_THRESHOLD: f32 = 0.7;
// Class 14 is "bird" in the COCO dataset.
const CLASSES: [i32; 1] = [14];

fn main() -> Result<(), Error> {
    env_logger::init();

    let mut args = std::env::args();
    let _ = args.next();
    let model = args.next().unwrap_or_else(|| MODEL_PATH.to_string());

    let mut detector_config = YoloDetectorConfig::new(CONFIDENCE_THRESHOLD, CLASSES.to_vec());
    detector_config.iou_threshold = IOU_THRESHOLD;
    let detector = YoloDetector::new(&model, detector_config)?;

    let config = AnnotatorConfig {
        data_dir: DATA_PATH.into(),
        label_dir: LABEL_PATH.into(),
        frame_skip: FRAME_SKIP,
    };

    let mut annotator = Annotator::new(config, detector, HighguiReview::new())?;
    annotator.run()
}
