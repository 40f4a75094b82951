//! Data models shared across the alignment pipeline.
//!
//! - Timeline geometry (segments, stable identifiers, track references)
//! - Enums for segment edges and edit kinds

mod enums;
mod segment;

pub use enums::{Edge, EditKind};
pub use segment::{Segment, SegmentId, TrackRef};
