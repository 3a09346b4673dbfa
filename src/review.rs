use crate::detection::Detection;
use crate::error::Error;
use crate::labels;

use log::{info, warn};
use opencv::{core, highgui, imgcodecs, imgproc, prelude::*};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub enum Verdict {
    Keep,
    Discard,
}

/// Seam between the review loop and the human. Shows one detection crop
/// and blocks until a decision comes back.
pub trait Review {
    fn judge(&mut self, crop: &core::Mat) -> Result<Verdict, Error>;
}

/// Interactive reviewer over an OpenCV window. The crop is shown resized,
/// `y` keeps the detection, any other key discards it.
pub struct HighguiReview {
    window: String,
    accept_key: i32,
    display_size: core::Size,
}

impl HighguiReview {
    pub fn new() -> Self {
        Self {
            window: "Detection".into(),
            accept_key: 'y' as i32,
            display_size: core::Size::new(400, 400),
        }
    }
}

impl Default for HighguiReview {
    fn default() -> Self {
        Self::new()
    }
}

impl Review for HighguiReview {
    fn judge(&mut self, crop: &core::Mat) -> Result<Verdict, Error> {
        let mut shown = core::Mat::default();
        imgproc::resize(
            crop,
            &mut shown,
            self.display_size,
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        highgui::imshow(&self.window, &shown)?;
        let key = highgui::wait_key(0)?;
        highgui::destroy_all_windows()?;

        Ok(if key == self.accept_key {
            Verdict::Keep
        } else {
            Verdict::Discard
        })
    }
}

/// Walks a frame's detections past the reviewer one crop at a time,
/// appending a label line for each accepted one. When nothing was
/// accepted the label file is removed again so no empty annotation is
/// left on disk; otherwise the full frame image is saved next to it.
/// Returns whether the frame was kept.
pub fn review_frame<R: Review>(
    frame: &core::Mat,
    detections: &[Detection],
    reviewer: &mut R,
    label_dir: &Path,
    video_name: &str,
    frame_idx: u64,
) -> Result<bool, Error> {
    let (frame_w, frame_h) = (frame.cols(), frame.rows());
    let label_path = labels::label_file(label_dir, video_name, frame_idx);

    let mut label_file = File::create(&label_path)?;
    let mut kept = 0usize;

    for det in detections {
        let Some(rect) = crop_rect(det, frame_w, frame_h) else {
            warn!("skipping degenerate box on {video_name} frame {frame_idx}");
            continue;
        };

        let crop = core::Mat::roi(frame, rect)?;

        if let Verdict::Keep = reviewer.judge(&crop)? {
            writeln!(
                label_file,
                "{}",
                labels::format_line(det, frame_w as f32, frame_h as f32)
            )?;
            kept += 1;
            info!("datapoint {kept} accepted");
        }
    }

    drop(label_file);

    if kept == 0 {
        fs::remove_file(&label_path)?;
        return Ok(false);
    }

    let image_path = labels::image_file(label_dir, video_name, frame_idx);
    imgcodecs::imwrite(
        &image_path.to_string_lossy(),
        frame,
        &core::Vector::new(),
    )?;

    Ok(true)
}

/// Absolute pixel rect of the detection, clamped to the frame bounds.
fn crop_rect(det: &Detection, frame_w: i32, frame_h: i32) -> Option<core::Rect> {
    if frame_w < 2 || frame_h < 2 {
        return None;
    }

    let abs = det.abs_box();
    let x1 = (abs.left() as i32).clamp(0, frame_w - 1);
    let y1 = (abs.top() as i32).clamp(0, frame_h - 1);
    let x2 = (abs.right() as i32).clamp(x1 + 1, frame_w);
    let y2 = (abs.bottom() as i32).clamp(y1 + 1, frame_h);

    Some(core::Rect::new(x1, y1, x2 - x1, y2 - y1))
}
