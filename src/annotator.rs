use crate::detector::Detect;
use crate::error::Error;
use crate::progress;
use crate::review::{self, Review};
use crate::video::{Frames, VideoFile};

use log::{debug, info, warn};
use opencv::core::Mat;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub struct AnnotatorConfig {
    pub data_dir: PathBuf,
    pub label_dir: PathBuf,
    /// Frames advanced after each sampled frame. Skipping frames gets
    /// more variety into the dataset and finishes a video faster.
    pub frame_skip: u64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            data_dir: "pigeon_vids".into(),
            label_dir: "yolo_labels".into(),
            frame_skip: 4,
        }
    }
}

/// Where the run loop currently is: the active video, the frame it reads
/// next and how many frames that video has.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub video: String,
    pub frame: u64,
    pub total_frames: u64,
}

struct Active<S> {
    source: S,
    cursor: Cursor,
}

type Opener<S> = Box<dyn FnMut(&Path) -> Result<S, Error>>;

/// The annotation session: steps through the remaining videos frame by
/// frame, runs the detector and hands each detection to the reviewer.
/// Exactly one frame source is open at a time; it is swapped out when
/// the queue advances to the next video.
pub struct Annotator<D, R, S = VideoFile> {
    config: AnnotatorConfig,
    detector: D,
    reviewer: R,
    open: Opener<S>,
    remaining: VecDeque<String>,
    active: Option<Active<S>>,
}

impl<D: Detect, R: Review> Annotator<D, R, VideoFile> {
    pub fn new(config: AnnotatorConfig, detector: D, reviewer: R) -> Result<Self, Error> {
        Self::with_opener(config, detector, reviewer, Box::new(VideoFile::open))
    }
}

impl<D: Detect, R: Review, S: Frames> Annotator<D, R, S> {
    pub fn with_opener(
        config: AnnotatorConfig,
        detector: D,
        reviewer: R,
        mut open: Opener<S>,
    ) -> Result<Self, Error> {
        let progress = progress::resolve(&config.data_dir, &config.label_dir)?;
        info!("remaining videos: {:?}", progress.remaining);

        let mut remaining: VecDeque<String> = progress.remaining.into();
        let active = match remaining.pop_front() {
            Some(video) => {
                let mut source = open(&config.data_dir.join(&video))?;
                let total_frames = source.total_frames();
                info!("total frames are {total_frames} in video {video}");
                source.seek(progress.resume_frame)?;

                Some(Active {
                    source,
                    cursor: Cursor {
                        video,
                        frame: progress.resume_frame,
                        total_frames,
                    },
                })
            }
            None => None,
        };

        Ok(Self {
            config,
            detector,
            reviewer,
            open,
            remaining,
            active,
        })
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.active.as_ref().map(|active| &active.cursor)
    }

    /// Main loop. Reads a frame, detects, reviews and advances until no
    /// videos remain.
    pub fn run(&mut self) -> Result<(), Error> {
        while let Some((frame, video, frame_idx)) = self.next_frame()? {
            let detections = self.detector.detect(&frame)?;

            if detections.is_empty() {
                debug!("no results on {video} at frame {frame_idx}");
            } else {
                review::review_frame(
                    &frame,
                    &detections,
                    &mut self.reviewer,
                    &self.config.label_dir,
                    &video,
                    frame_idx,
                )?;
            }

            self.advance()?;
        }

        info!("no videos remaining to annotate");
        Ok(())
    }

    /// Reads the frame under the cursor, moving on to the next video
    /// when the current one cannot produce it. `None` once the queue is
    /// exhausted.
    fn next_frame(&mut self) -> Result<Option<(Mat, String, u64)>, Error> {
        loop {
            let read = match self.active.as_mut() {
                Some(active) => {
                    info!(
                        "current video: {} on frame {}",
                        active.cursor.video, active.cursor.frame
                    );
                    active
                        .source
                        .read()?
                        .map(|frame| (frame, active.cursor.video.clone(), active.cursor.frame))
                }
                None => return Ok(None),
            };

            match read {
                Some(item) => return Ok(Some(item)),
                None => {
                    warn!("couldn't read frame");
                    self.next_video()?;
                }
            }
        }
    }

    /// Moves the cursor forward by the frame skip, wrapping to the next
    /// queued video once past the end of the current one. The source is
    /// reseeked on every call, video change or not.
    fn advance(&mut self) -> Result<(), Error> {
        let wrapped = match self.active.as_mut() {
            Some(active) => {
                active.cursor.frame += self.config.frame_skip;
                debug!(
                    "next frame {} of {}",
                    active.cursor.frame, active.cursor.total_frames
                );

                if active.cursor.frame > active.cursor.total_frames {
                    true
                } else {
                    active.source.seek(active.cursor.frame)?;
                    false
                }
            }
            None => return Ok(()),
        };

        if wrapped {
            self.next_video()?;
        }

        Ok(())
    }

    fn next_video(&mut self) -> Result<(), Error> {
        self.active = match self.remaining.pop_front() {
            Some(video) => {
                let mut source = (self.open)(&self.config.data_dir.join(&video))?;
                let total_frames = source.total_frames();
                info!("total frames are {total_frames} in video {video}");
                source.seek(0)?;

                Some(Active {
                    source,
                    cursor: Cursor {
                        video,
                        frame: 0,
                        total_frames,
                    },
                })
            }
            None => None,
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::review::Verdict;
    use std::fs::File;
    use tempfile::TempDir;

    struct NoDetections;

    impl Detect for NoDetections {
        fn detect(&mut self, _frame: &Mat) -> Result<Vec<Detection>, Error> {
            Ok(Vec::new())
        }
    }

    struct RejectAll;

    impl Review for RejectAll {
        fn judge(&mut self, _crop: &Mat) -> Result<Verdict, Error> {
            Ok(Verdict::Discard)
        }
    }

    /// Stub source claiming ten frames and producing none.
    struct TenFrames;

    impl Frames for TenFrames {
        fn total_frames(&self) -> u64 {
            10
        }

        fn seek(&mut self, _frame: u64) -> Result<(), Error> {
            Ok(())
        }

        fn read(&mut self) -> Result<Option<Mat>, Error> {
            Ok(None)
        }
    }

    fn annotator_over(
        videos: &[&str],
        label_images: &[&str],
        frame_skip: u64,
    ) -> (TempDir, Annotator<NoDetections, RejectAll, TenFrames>) {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("vids");
        let labels = root.path().join("labels");
        std::fs::create_dir(&data).unwrap();
        std::fs::create_dir(&labels).unwrap();
        for name in videos {
            File::create(data.join(name)).unwrap();
        }
        for name in label_images {
            File::create(labels.join(name)).unwrap();
        }

        let config = AnnotatorConfig {
            data_dir: data,
            label_dir: labels,
            frame_skip,
        };
        let annotator =
            Annotator::with_opener(config, NoDetections, RejectAll, Box::new(|_| Ok(TenFrames)))
                .unwrap();
        (root, annotator)
    }

    #[test]
    fn resumes_on_the_last_annotated_frame() {
        let (_root, annotator) = annotator_over(&["a.mp4", "b.mp4"], &["a_5.jpg"], 8);

        let cursor = annotator.cursor().unwrap();
        assert_eq!(cursor.video, "a.mp4");
        assert_eq!(cursor.frame, 5);
    }

    #[test]
    fn advancing_past_the_end_pops_the_next_video() {
        let (_root, mut annotator) = annotator_over(&["a.mp4", "b.mp4"], &["a_5.jpg"], 8);

        // 5 + 8 = 13 > 10 total frames, so the queue advances.
        annotator.advance().unwrap();

        let cursor = annotator.cursor().unwrap();
        assert_eq!(cursor.video, "b.mp4");
        assert_eq!(cursor.frame, 0);
        assert_eq!(cursor.total_frames, 10);
    }

    #[test]
    fn advancing_within_the_video_keeps_it_active() {
        let (_root, mut annotator) = annotator_over(&["a.mp4", "b.mp4"], &[], 4);

        annotator.advance().unwrap();

        let cursor = annotator.cursor().unwrap();
        assert_eq!(cursor.video, "a.mp4");
        assert_eq!(cursor.frame, 4);
    }

    #[test]
    fn unreadable_videos_drain_the_queue_and_the_run_ends() {
        let (_root, mut annotator) = annotator_over(&["a.mp4", "b.mp4"], &[], 8);

        annotator.run().unwrap();

        assert!(annotator.cursor().is_none());
    }
}
