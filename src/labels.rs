//! Filename convention and line format for the label artifacts.
//!
//! An accepted frame leaves two files behind: `<stem>_<frame>.txt` with one
//! line per kept detection and `<stem>_<frame>.jpg` with the full frame.
//! The image file is what marks a frame as annotated; the resolver in
//! [`crate::progress`] rebuilds all progress state from these names.

use crate::detection::Detection;
use crate::error::Error;

use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGE_EXT: &str = ".jpg";
pub const LABEL_EXT: &str = ".txt";

/// Video filename without its extension: everything before the first `.`.
#[inline]
pub fn video_stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Video stem of a label artifact: everything before the first `_`.
#[inline]
pub fn label_stem(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// Frame number of a label artifact, the segment between the first `_`
/// and the following `.`. `None` when the name does not follow the
/// convention.
pub fn frame_number(name: &str) -> Option<u64> {
    let (_, rest) = name.split_once('_')?;
    rest.split('.').next()?.parse().ok()
}

pub fn artifact_stem(video_name: &str, frame: u64) -> String {
    format!("{}_{}", video_stem(video_name), frame)
}

pub fn label_file(dir: &Path, video_name: &str, frame: u64) -> PathBuf {
    dir.join(format!("{}{}", artifact_stem(video_name, frame), LABEL_EXT))
}

pub fn image_file(dir: &Path, video_name: &str, frame: u64) -> PathBuf {
    dir.join(format!("{}{}", artifact_stem(video_name, frame), IMAGE_EXT))
}

/// One label line: `<class> <cx> <cy> <w> <h>`, box coordinates
/// normalized to the frame dimensions.
pub fn format_line(det: &Detection, frame_w: f32, frame_h: f32) -> String {
    let norm = det.normalized(frame_w, frame_h);
    format!(
        "{} {} {} {} {}",
        det.class,
        norm.cx(),
        norm.cy(),
        norm.width(),
        norm.height()
    )
}

/// Rewrites every label file in `dir` so the class field is an integer.
/// Repairs datasets produced by older writers that stored the class as a
/// float. Lines that do not have five fields are dropped. Returns the
/// number of files rewritten.
pub fn fix_class_ids(dir: &Path) -> Result<usize, Error> {
    let mut fixed = 0;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(true, |ext| ext != "txt") {
            continue;
        }

        let contents = fs::read_to_string(&path)?;
        let mut rewritten = String::new();
        let mut changed = false;

        for line in contents.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 5 {
                warn!("dropping malformed line in {}: {line:?}", path.display());
                changed = true;
                continue;
            }

            let class: f32 = parts[0].parse().map_err(|_| {
                Error::CorruptState(format!(
                    "unparsable class field {:?} in {}",
                    parts[0],
                    path.display()
                ))
            })?;

            let class = class as i64;
            if parts[0] != class.to_string() {
                changed = true;
            }

            rewritten.push_str(&format!(
                "{} {} {} {} {}\n",
                class, parts[1], parts[2], parts[3], parts[4]
            ));
        }

        if changed {
            fs::write(&path, rewritten)?;
            fixed += 1;
        }
    }

    Ok(fixed)
}
