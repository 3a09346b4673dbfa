pub mod annotator;
pub mod bbox;
pub mod detection;
pub mod detector;
pub mod error;
pub mod labels;
pub mod progress;
pub mod review;
pub mod video;

pub use annotator::{Annotator, AnnotatorConfig, Cursor};
pub use detection::Detection;
pub use detector::{Detect, YoloDetector, YoloDetectorConfig};
pub use error::Error;
pub use progress::{resolve, Progress};
pub use review::{HighguiReview, Review, Verdict};
pub use video::{Frames, VideoFile};
