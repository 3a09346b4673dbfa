use crate::error::Error;

use opencv::{core, prelude::*, videoio};
use std::path::Path;

/// A seekable source of frames for one video. End of stream and decode
/// failures are both reported as `None`; the annotation loop treats them
/// the same way as running past the frame count.
pub trait Frames {
    fn total_frames(&self) -> u64;
    fn seek(&mut self, frame: u64) -> Result<(), Error>;
    fn read(&mut self) -> Result<Option<core::Mat>, Error>;
}

pub struct VideoFile {
    cap: videoio::VideoCapture,
    total_frames: u64,
}

impl VideoFile {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let cap = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;
        if !videoio::VideoCapture::is_opened(&cap)? {
            return Err(Error::VideoOpen(path.display().to_string()));
        }

        let total_frames = cap.get(videoio::CAP_PROP_FRAME_COUNT)? as u64;

        Ok(Self { cap, total_frames })
    }
}

impl Frames for VideoFile {
    #[inline]
    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn seek(&mut self, frame: u64) -> Result<(), Error> {
        self.cap.set(videoio::CAP_PROP_POS_FRAMES, frame as f64)?;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<core::Mat>, Error> {
        let mut frame = core::Mat::default();

        // A failed grab is an end-of-video signal, not an error.
        match self.cap.read(&mut frame) {
            Ok(true) => {}
            _ => return Ok(None),
        }

        if frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }
}
