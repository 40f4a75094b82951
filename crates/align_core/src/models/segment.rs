//! Timeline segments and the identifiers that address them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Stable identifier of a segment on the host timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Zero-based index of a track in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackRef(pub usize);

impl TrackRef {
    /// Build from a one-based track number as typed by a user.
    ///
    /// Returns None for zero.
    pub fn from_number(number: usize) -> Option<Self> {
        number.checked_sub(1).map(TrackRef)
    }

    /// One-based track number for display.
    pub fn number(&self) -> usize {
        self.0 + 1
    }
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Track {}", self.number())
    }
}

/// One piece of audio placed on a timeline.
///
/// The segment plays `length` seconds of `file`, starting `source_offset`
/// seconds into the file, at timeline time `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Host identifier.
    pub id: SegmentId,
    /// Timeline start (seconds).
    pub position: f64,
    /// Duration on the timeline (seconds).
    pub length: f64,
    /// Source audio file. Empty when the host item has no audio source.
    #[serde(default)]
    pub file: PathBuf,
    /// Start of the played window within the source file (seconds).
    #[serde(default)]
    pub source_offset: f64,
    /// Linear gain.
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_volume() -> f64 {
    1.0
}

impl Segment {
    /// Create a segment with unity volume.
    pub fn new(
        id: SegmentId,
        position: f64,
        length: f64,
        file: impl Into<PathBuf>,
        source_offset: f64,
    ) -> Self {
        Self {
            id,
            position,
            length,
            file: file.into(),
            source_offset,
            volume: default_volume(),
        }
    }

    /// Timeline end (exclusive).
    pub fn end(&self) -> f64 {
        self.position + self.length
    }

    /// Whether `time` falls inside `[position, end)`.
    pub fn contains(&self, time: f64) -> bool {
        self.position <= time && time < self.end()
    }

    /// Whether the segment references an audio file.
    pub fn has_source(&self) -> bool {
        !self.file.as_os_str().is_empty()
    }

    /// Unused source material before the played window (seconds).
    pub fn head_room(&self) -> f64 {
        self.source_offset.max(0.0)
    }

    /// Unused source material after the played window, given the file duration.
    pub fn tail_room(&self, source_duration: f64) -> f64 {
        source_duration - self.source_offset - self.length
    }
}
