//! Host timeline capability interface.
//!
//! The alignment core never touches a host document directly. Everything it
//! needs from the host (enumerating segments, creating the derived track,
//! splitting, moving and resizing segments, source file lengths) goes through
//! [`TrackRepository`], which is passed explicitly into the edit planner and
//! the gap-fill planner.
//!
//! [`InMemoryTimeline`] is a complete host backed by a JSON project document;
//! the CLI and the tests use it.

mod comp;
mod memory;
mod types;

pub use comp::{active_comp_segments, POSITION_GROUP_SCALE, STACKED_TAKE_MIN_GROUP};
pub use memory::{InMemoryTimeline, Project, Track};
pub use types::{SegmentFilter, TimelineError, TimelineResult};

use std::path::PathBuf;

use crate::models::{Segment, SegmentId, TrackRef};

/// Operations the alignment core needs from a host timeline.
///
/// All mutators take effect immediately and are visible to later reads.
pub trait TrackRepository {
    /// Number of tracks in the document.
    fn track_count(&self) -> usize;

    /// Display name of a track.
    fn track_name(&self, track: TrackRef) -> TimelineResult<String>;

    /// Every segment on a track, in host order.
    fn segments(&self, track: TrackRef) -> TimelineResult<Vec<Segment>>;

    /// Active comp segments on a track, sorted by position.
    fn list_segments(&self, track: TrackRef, filter: &SegmentFilter) -> TimelineResult<Vec<Segment>> {
        Ok(active_comp_segments(&self.segments(track)?, filter))
    }

    /// Create a new track right after `source` holding copies of `segments`.
    fn create_derived_track(&mut self, source: TrackRef, segments: &[Segment]) -> TimelineResult<TrackRef>;

    /// Split a segment at timeline time `time`, returning the trailing piece.
    fn split_segment(&mut self, id: SegmentId, time: f64) -> TimelineResult<SegmentId>;

    /// Move a segment to a new timeline position.
    fn set_position(&mut self, id: SegmentId, position: f64) -> TimelineResult<()>;

    /// Change a segment's timeline length.
    fn set_length(&mut self, id: SegmentId, length: f64) -> TimelineResult<()>;

    /// Change where in the source file a segment starts playing.
    fn set_source_offset(&mut self, id: SegmentId, offset: f64) -> TimelineResult<()>;

    /// Current state of one segment.
    fn segment(&self, id: SegmentId) -> TimelineResult<Segment>;

    /// Where the segment's audio can be read from.
    fn source_path(&self, segment: &Segment) -> PathBuf {
        segment.file.clone()
    }

    /// Length of the segment's source file in seconds, 0 when unknown.
    fn source_file_duration(&self, id: SegmentId) -> TimelineResult<f64>;
}
