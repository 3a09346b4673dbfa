//! Progress resolution: which videos still need annotation and which frame
//! to resume from, rebuilt on every start by scanning the label directory.
//! The existing label-image filenames are the only source of truth; there
//! is no separate index.

use crate::error::Error;
use crate::labels;

use log::info;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub struct Progress {
    /// Source video filenames still needing work, lexicographic order.
    /// The first entry is the video annotation resumes on.
    pub remaining: Vec<String>,
    /// Frame to resume from. Only meaningful for the first remaining video.
    pub resume_frame: u64,
}

/// Scans `data_dir` and `label_dir` and computes the resume point.
///
/// A video counts as done once its stem shows up among the label-image
/// filenames, except for the lexicographically largest annotated stem:
/// that one is treated as in progress and stays in the queue, with the
/// resume frame taken from its highest annotated frame number. Creates
/// `label_dir` when absent.
pub fn resolve(data_dir: &Path, label_dir: &Path) -> Result<Progress, Error> {
    if !data_dir.is_dir() {
        return Err(Error::Config(format!(
            "source directory {} does not exist",
            data_dir.display()
        )));
    }

    let videos = dir_listing(data_dir)?;
    if videos.is_empty() {
        return Err(Error::Config("no source videos found".into()));
    }

    fs::create_dir_all(label_dir)?;
    let artifacts = dir_listing(label_dir)?;

    let annotated: BTreeSet<&str> = artifacts
        .iter()
        .filter(|name| name.contains(labels::IMAGE_EXT))
        .map(|name| labels::label_stem(name))
        .collect();

    // Nothing written yet (or only stray text files, which never count
    // as progress): start from the top.
    let Some(last) = annotated.iter().next_back().copied() else {
        info!("no annotations yet, starting from zero");
        return Ok(Progress {
            remaining: videos,
            resume_frame: 0,
        });
    };

    let mut resume_frame = 0;
    for name in artifacts
        .iter()
        .filter(|name| name.contains(labels::IMAGE_EXT) && labels::label_stem(name) == last)
    {
        let frame = labels::frame_number(name).ok_or_else(|| {
            Error::CorruptState(format!("label image {name} has no parsable frame number"))
        })?;
        resume_frame = resume_frame.max(frame);
    }

    // Every annotated stem except the largest one is done. The largest
    // stays in the queue so annotation picks it back up, and so does any
    // source stem never annotated at all.
    let remaining: Vec<String> = videos
        .into_iter()
        .filter(|name| {
            let stem = labels::video_stem(name);
            stem == last || !annotated.contains(stem)
        })
        .collect();

    if let Some(first) = remaining.first() {
        info!("current progress: video {first} on frame {resume_frame}");
    }

    Ok(Progress {
        remaining,
        resume_frame,
    })
}

fn dir_listing(dir: &Path) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn dirs(videos: &[&str], label_images: &[&str]) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("vids");
        let labels = root.path().join("labels");
        fs::create_dir(&data).unwrap();
        fs::create_dir(&labels).unwrap();
        for name in videos {
            File::create(data.join(name)).unwrap();
        }
        for name in label_images {
            File::create(labels.join(name)).unwrap();
        }
        (root, data, labels)
    }

    #[test]
    fn cold_start_returns_all_videos_sorted() {
        let (_root, data, labels) = dirs(&["b.mp4", "a.mp4", "c.mp4"], &[]);

        let progress = resolve(&data, &labels).unwrap();

        assert_eq!(progress.remaining, vec!["a.mp4", "b.mp4", "c.mp4"]);
        assert_eq!(progress.resume_frame, 0);
    }

    #[test]
    fn missing_label_dir_is_created() {
        let (_root, data, labels) = dirs(&["a.mp4"], &[]);
        let nested = labels.join("sub");

        let progress = resolve(&data, &nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(progress.resume_frame, 0);
    }

    #[test]
    fn missing_source_dir_fails() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve(&root.path().join("nope"), &root.path().join("labels"));
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn empty_source_dir_fails() {
        let (_root, data, labels) = dirs(&[], &[]);
        let err = resolve(&data, &labels);
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn text_only_label_dir_counts_as_cold_start() {
        let (_root, data, labels) = dirs(&["a.mp4"], &["a_10.txt"]);

        let progress = resolve(&data, &labels).unwrap();

        assert_eq!(progress.remaining, vec!["a.mp4"]);
        assert_eq!(progress.resume_frame, 0);
    }

    #[test]
    fn completed_videos_are_excluded() {
        let (_root, data, labels) = dirs(&["a.mp4", "b.mp4"], &["a_10.jpg", "b_5.jpg"]);

        let progress = resolve(&data, &labels).unwrap();

        assert_eq!(progress.remaining, vec!["b.mp4"]);
        assert_eq!(progress.resume_frame, 5);
    }

    #[test]
    fn the_largest_annotated_stem_stays_in_the_queue() {
        let (_root, data, labels) = dirs(&["a.mp4", "b.mp4", "c.mp4"], &["b_8.jpg"]);

        let progress = resolve(&data, &labels).unwrap();

        // b has annotations but is the last one touched, so it remains;
        // a was never annotated and remains too.
        assert_eq!(progress.remaining, vec!["a.mp4", "b.mp4", "c.mp4"]);
        assert_eq!(progress.resume_frame, 8);
    }

    #[test]
    fn resume_frame_is_the_maximum_annotated_frame() {
        let (_root, data, labels) = dirs(
            &["last.mp4"],
            &["last_10.jpg", "last_40.jpg", "last_25.jpg"],
        );

        let progress = resolve(&data, &labels).unwrap();

        assert_eq!(progress.resume_frame, 40);
    }

    #[test]
    fn rescan_is_idempotent() {
        let (_root, data, labels) = dirs(&["a.mp4", "b.mp4"], &["a_10.jpg", "a_20.jpg"]);

        let first = resolve(&data, &labels).unwrap();
        let second = resolve(&data, &labels).unwrap();

        assert_eq!(first.remaining, second.remaining);
        assert_eq!(first.resume_frame, second.resume_frame);
    }

    #[test]
    fn orphan_stems_are_never_revisited() {
        // zed has label images but no source video; it becomes the
        // "last" stem and a, already annotated, is filtered out.
        let (_root, data, labels) = dirs(&["a.mp4", "b.mp4"], &["a_1.jpg", "zed_3.jpg"]);

        let progress = resolve(&data, &labels).unwrap();

        assert_eq!(progress.remaining, vec!["b.mp4"]);
        assert_eq!(progress.resume_frame, 3);
    }

    #[test]
    fn unparsable_frame_suffix_is_corrupt_state() {
        let (_root, data, labels) = dirs(&["a.mp4"], &["a_junk.jpg"]);

        let err = resolve(&data, &labels);

        assert!(matches!(err, Err(Error::CorruptState(_))));
    }

    #[test]
    fn label_image_without_frame_delimiter_is_corrupt_state() {
        let (_root, data, labels) = dirs(&["a.mp4"], &["stray.jpg"]);

        let err = resolve(&data, &labels);

        assert!(matches!(err, Err(Error::CorruptState(_))));
    }
}
