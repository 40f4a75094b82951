//! Edit planning: split/move corrections and gap filling.
//!
//! # Applying Adjustments
//!
//! Every adjustment names an onset on the target track and the shift that
//! moves it onto the reference onset (`shift = -diff`). The segment holding
//! the onset is cut slightly before it so the transient stays in the later
//! piece, and only that later piece moves:
//!
//! ```text
//! before:  [=========|===onset====]
//!                    ^ split = onset - 5ms
//! after:   [=========]
//!                  [===onset====]        (late onset, shift < 0)
//! ```
//!
//! A split point within 5ms of either segment edge moves the whole segment
//! instead, so no sliver segments are created.
//!
//! Adjustments run in descending onset time. Moving a later piece never
//! changes the geometry of anything to its left, so every earlier adjustment
//! still finds the segment it was computed against. Tracked geometry lives in
//! a [`SegmentArena`] that sees each split and move as soon as it happens.
//!
//! # Filling Gaps
//!
//! Moving pieces opens gaps between neighbours. For every adjacent pair with
//! a gap above 0.1ms, the moved side is extended over the gap plus a 5ms
//! crossfade overlap, bounded by the unused source audio on that edge:
//!
//! - Only the next segment moved: its left edge grows back into its source
//!   head room.
//! - Only the current segment moved: its right edge grows into the source
//!   tail room.
//! - Both or neither moved: each side takes half the gap plus half the
//!   crossfade, when it has the room.

mod arena;
mod gap_fill;
mod planner;

pub use arena::{SegmentArena, TrackedSegment};
pub use gap_fill::{fill_gaps, GapFillOperation, GapFillReport};
pub use planner::{apply_adjustments, EditOperation, EditReport, MovedSegment};

/// A split is placed this far before the onset (seconds).
pub const SPLIT_LEAD: f64 = 0.005;

/// Split points this close to a segment edge move the whole segment (seconds).
pub const EDGE_TOLERANCE: f64 = 0.005;

/// Gaps at or below this are treated as closed (seconds).
pub const GAP_EPSILON: f64 = 0.0001;
