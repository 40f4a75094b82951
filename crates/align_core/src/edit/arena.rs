//! Tracked segment geometry during edit planning.

use std::collections::HashMap;

use crate::models::{Segment, SegmentId};

/// Position and length of one segment as the planner currently sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedSegment {
    pub id: SegmentId,
    pub position: f64,
    pub length: f64,
}

impl TrackedSegment {
    pub fn end(&self) -> f64 {
        self.position + self.length
    }

    /// Whether `time` falls inside `[position, end)`.
    pub fn contains(&self, time: f64) -> bool {
        self.position <= time && time < self.end()
    }
}

impl From<&Segment> for TrackedSegment {
    fn from(segment: &Segment) -> Self {
        Self {
            id: segment.id,
            position: segment.position,
            length: segment.length,
        }
    }
}

/// Segment records addressed by id and kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SegmentArena {
    records: Vec<TrackedSegment>,
    index: HashMap<SegmentId, usize>,
}

impl SegmentArena {
    /// Track the given segments in host order.
    pub fn from_segments(segments: &[Segment]) -> Self {
        let mut arena = Self::default();
        for segment in segments {
            arena.insert(segment.into());
        }
        arena
    }

    /// Add a record, replacing any record with the same id.
    pub fn insert(&mut self, record: TrackedSegment) {
        match self.index.get(&record.id) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(record.id, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, id: SegmentId) -> Option<&TrackedSegment> {
        self.index.get(&id).map(|&slot| &self.records[slot])
    }

    pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut TrackedSegment> {
        match self.index.get(&id) {
            Some(&slot) => Some(&mut self.records[slot]),
            None => None,
        }
    }

    /// First record, in insertion order, whose span contains `time`.
    pub fn containing(&self, time: f64) -> Option<TrackedSegment> {
        self.records.iter().find(|r| r.contains(time)).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedSegment> {
        self.records.iter()
    }
}
