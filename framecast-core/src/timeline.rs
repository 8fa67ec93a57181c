//! Timeline compiler: scripts in, frame-indexed timelines out.
//!
//! Pure and deterministic. Frame math matches the reference composition:
//! per-segment frames are floored, the overall frame count is the ceiling
//! of the declared duration. The compiler validates *when* segments play;
//! it never rejects a segment for *what* it renders.

use serde::{Deserialize, Serialize};

use crate::script::{Script, Segment};

/// Errors from timeline compilation.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Invalid segment {index}: {reason}")]
    InvalidSegment { index: usize, reason: String },

    #[error("Script has no segments")]
    EmptyScript,

    #[error("Frame rate must be positive")]
    InvalidFrameRate,

    #[error(
        "Segments extend to frame {segment_end} past declared duration of {total_frames} frames"
    )]
    DurationOverrun {
        segment_end: u64,
        total_frames: u64,
    },
}

/// Policy for segments extending past the script's declared duration.
///
/// The reference behavior truncates trailing content at render time;
/// `Reject` surfaces the mismatch at compile time instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrunPolicy {
    /// Keep the declared duration and let the renderer truncate trailing
    /// content, logging the mismatch
    #[default]
    Truncate,
    /// Fail compilation when segments overrun the declared duration
    Reject,
}

/// One compiled timeline entry: a segment pinned to its frame span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub segment: Segment,
    #[serde(rename = "startFrame")]
    pub start_frame: u64,
    #[serde(rename = "durationFrames")]
    pub duration_frames: u64,
}

/// Frame-indexed compiled form of a script, the renderer's actual input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub fps: u32,
    #[serde(rename = "totalFrames")]
    pub total_frames: u64,
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Composition length in seconds, derived from the frame count.
    pub fn duration_seconds(&self) -> f64 {
        self.total_frames as f64 / self.fps as f64
    }

    /// Compiles a script into a frame-accurate timeline.
    ///
    /// `total_frames` derives from the script's declared `total_duration`,
    /// not the sum of segment spans; `policy` decides what happens when
    /// segments extend past that bound.
    ///
    /// Segment ordering is enforced on `start_time`, which must be
    /// non-decreasing. Entry `start_frame`s therefore only weakly
    /// increase: equal start times, or starts within the same frame at
    /// the given fps, compile to the same `start_frame`.
    ///
    /// # Errors
    /// - `TimelineError::EmptyScript` - Script has no segments
    /// - `TimelineError::InvalidFrameRate` - `fps` is zero
    /// - `TimelineError::InvalidSegment` - Non-positive frame span or
    ///   segments out of `start_time` order
    /// - `TimelineError::DurationOverrun` - Overrun under `OverrunPolicy::Reject`
    pub fn compile(
        script: &Script,
        fps: u32,
        policy: OverrunPolicy,
    ) -> Result<Timeline, TimelineError> {
        if fps == 0 {
            return Err(TimelineError::InvalidFrameRate);
        }
        if script.segments.is_empty() {
            return Err(TimelineError::EmptyScript);
        }

        let total_frames = (script.total_duration * fps as f64).ceil() as u64;

        let mut entries = Vec::with_capacity(script.segments.len());
        let mut previous_start = f64::NEG_INFINITY;

        for (index, segment) in script.segments.iter().enumerate() {
            if segment.start_time < previous_start {
                return Err(TimelineError::InvalidSegment {
                    index,
                    reason: format!(
                        "starts at {}s, before preceding segment at {}s",
                        segment.start_time, previous_start
                    ),
                });
            }
            previous_start = segment.start_time;

            let start_frame = (segment.start_time * fps as f64).floor() as i64;
            let end_frame = (segment.end_time * fps as f64).floor() as i64;
            let duration_frames = end_frame - start_frame;

            if start_frame < 0 || duration_frames <= 0 {
                return Err(TimelineError::InvalidSegment {
                    index,
                    reason: format!(
                        "{}s..{}s spans {} frames at {} fps",
                        segment.start_time, segment.end_time, duration_frames, fps
                    ),
                });
            }

            entries.push(TimelineEntry {
                segment: segment.clone(),
                start_frame: start_frame as u64,
                duration_frames: duration_frames as u64,
            });
        }

        let segment_end = entries
            .iter()
            .map(|e| e.start_frame + e.duration_frames)
            .max()
            .unwrap_or(0);

        if segment_end > total_frames {
            match policy {
                OverrunPolicy::Reject => {
                    return Err(TimelineError::DurationOverrun {
                        segment_end,
                        total_frames,
                    });
                }
                OverrunPolicy::Truncate => {
                    tracing::warn!(
                        segment_end,
                        total_frames,
                        "segments overrun declared duration; trailing content will be truncated"
                    );
                }
            }
        }

        Ok(Timeline {
            fps,
            total_frames,
            entries,
        })
    }
}
