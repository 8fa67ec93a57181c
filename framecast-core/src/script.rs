//! Script wire types: timed narrative segments and branding inputs.
//!
//! Scripts are immutable caller-supplied input. The core never mutates
//! them; the timeline compiler validates their timing and the renderer
//! consumes their content payloads opaquely.

use serde::{Deserialize, Serialize};

/// Presentation variant for a narrative segment.
///
/// Unknown kinds deserialize to [`SegmentKind::Unknown`] and render with
/// the default variant rather than failing: the pipeline is permissive
/// about *what* renders but strict about *when*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentKind {
    Opening,
    Introduction,
    ProblemSetup,
    Metaphor,
    VisionBuilding,
    ActionItems,
    Reflection,
    Affirmation,
    #[serde(other)]
    Unknown,
}

impl SegmentKind {
    /// Variant actually used for presentation, resolving unknown kinds
    /// to the default.
    pub fn presentation(self) -> SegmentKind {
        match self {
            SegmentKind::Unknown => SegmentKind::Introduction,
            kind => kind,
        }
    }
}

/// One timed narrative beat within a script.
///
/// Invariant: `start_time < end_time`. Ordering and contiguity across a
/// script's segment list are enforced by the timeline compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    /// Segment start, in seconds from the composition start
    #[serde(rename = "startTime")]
    pub start_time: f64,
    /// Segment end, in seconds from the composition start
    #[serde(rename = "endTime")]
    pub end_time: f64,
    /// Opaque payload handed to the presentation variant
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Segment {
    /// Segment span in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A complete declarative script: ordered segments plus an optional
/// audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub segments: Vec<Segment>,
    /// Caller-declared composition length in seconds. May diverge from
    /// the sum of segment spans; reconciliation is the compiler's job.
    #[serde(rename = "totalDuration")]
    pub total_duration: f64,
    /// URL of an audio track to lay under the composition
    #[serde(
        rename = "audioFile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub audio_file: Option<String>,
}

/// Brand palette threaded through to the presentation variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

impl Default for BrandColors {
    fn default() -> Self {
        Self {
            primary: "#22DFDC".to_string(),
            secondary: "#22EDB6".to_string(),
            accent: "#242424".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_script_json() -> &'static str {
        r#"{
            "title": "Day 1: Getting Started",
            "segments": [
                {"type": "opening", "startTime": 0.0, "endTime": 5.0, "content": {"text": "Welcome"}},
                {"type": "problem-setup", "startTime": 5.0, "endTime": 12.0}
            ],
            "totalDuration": 12.0,
            "audioFile": "https://cdn.example.com/audio/day-1.mp3"
        }"#
    }

    #[test]
    fn test_script_deserializes_wire_format() {
        let script: Script = serde_json::from_str(sample_script_json()).unwrap();

        assert_eq!(script.title, "Day 1: Getting Started");
        assert_eq!(script.segments.len(), 2);
        assert_eq!(script.segments[0].kind, SegmentKind::Opening);
        assert_eq!(script.segments[1].kind, SegmentKind::ProblemSetup);
        assert_eq!(script.segments[1].start_time, 5.0);
        assert_eq!(script.total_duration, 12.0);
        assert!(script.audio_file.is_some());
    }

    #[test]
    fn test_unknown_segment_kind_falls_back() {
        let json = r#"{"type": "dance-break", "startTime": 0.0, "endTime": 2.0}"#;
        let segment: Segment = serde_json::from_str(json).unwrap();

        assert_eq!(segment.kind, SegmentKind::Unknown);
        assert_eq!(segment.kind.presentation(), SegmentKind::Introduction);
    }

    #[test]
    fn test_known_kinds_present_as_themselves() {
        assert_eq!(
            SegmentKind::Affirmation.presentation(),
            SegmentKind::Affirmation
        );
        assert_eq!(SegmentKind::Opening.presentation(), SegmentKind::Opening);
    }

    #[test]
    fn test_default_brand_colors() {
        let colors = BrandColors::default();
        assert_eq!(colors.primary, "#22DFDC");
        assert_eq!(colors.secondary, "#22EDB6");
        assert_eq!(colors.accent, "#242424");
    }
}
