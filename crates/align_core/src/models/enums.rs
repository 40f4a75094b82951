//! Small enums used by the edit and gap-fill planners.

use serde::{Deserialize, Serialize};

/// Which edge of a segment an extension applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Leading edge (moves position and source offset earlier).
    Left,
    /// Trailing edge (grows length only).
    Right,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Left => write!(f, "left"),
            Edge::Right => write!(f, "right"),
        }
    }
}

/// How an adjustment was realised on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// The split point fell near a segment boundary, so the whole segment moved.
    MoveWhole,
    /// The segment was split and only the trailing piece moved.
    SplitAndMove,
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditKind::MoveWhole => write!(f, "move"),
            EditKind::SplitAndMove => write!(f, "split+move"),
        }
    }
}
