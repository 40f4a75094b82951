//! Timeline error and filter types.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{SegmentId, TrackRef};

/// Errors reported by a timeline host.
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("{0} not found")]
    UnknownTrack(TrackRef),

    #[error("Segment {0} not found")]
    UnknownSegment(SegmentId),

    #[error("Cannot split segment {id} at {time:.3}s: outside its span")]
    InvalidSplit { id: SegmentId, time: f64 },

    #[error("Project I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid project document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Restricts which segments of a track take part in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentFilter {
    /// Keep segments overlapping `[start, end)`.
    pub time_range: Option<(f64, f64)>,
    /// Keep only these segments.
    pub selected: Option<Vec<SegmentId>>,
}

impl SegmentFilter {
    /// No restriction.
    pub fn all() -> Self {
        Self::default()
    }

    /// Segments overlapping a time range.
    pub fn time_range(start: f64, end: f64) -> Self {
        Self {
            time_range: Some((start, end)),
            selected: None,
        }
    }

    /// Only the given segments.
    pub fn selected(ids: Vec<SegmentId>) -> Self {
        Self {
            time_range: None,
            selected: Some(ids),
        }
    }
}
