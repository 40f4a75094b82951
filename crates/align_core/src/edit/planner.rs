//! Split/move planning for grouped adjustments.

use serde::{Deserialize, Serialize};

use crate::analysis::Adjustment;
use crate::models::{EditKind, SegmentId, TrackRef};
use crate::timeline::{TimelineResult, TrackRepository};

use super::arena::{SegmentArena, TrackedSegment};
use super::{EDGE_TOLERANCE, SPLIT_LEAD};

/// One applied correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditOperation {
    pub kind: EditKind,
    /// Segment that contained the split point.
    pub segment_id: SegmentId,
    /// Segment that was moved: the original for a whole move, the new
    /// trailing piece for a split.
    pub moved_id: SegmentId,
    pub target_time: f64,
    pub split_time: f64,
    pub shift: f64,
}

/// A segment moved by the planner and how far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovedSegment {
    pub id: SegmentId,
    pub shift: f64,
}

/// Result of [`apply_adjustments`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditReport {
    pub operations: Vec<EditOperation>,
    pub moved: Vec<MovedSegment>,
    /// Adjustments that were applied.
    pub successful: usize,
    /// Adjustments that were tried.
    pub attempted: usize,
}

impl EditReport {
    /// Ids of every moved segment.
    pub fn moved_ids(&self) -> Vec<SegmentId> {
        self.moved.iter().map(|m| m.id).collect()
    }

    /// Adjustments that found no segment or could not be split.
    pub fn skipped(&self) -> usize {
        self.attempted - self.successful
    }
}

/// Apply adjustments to the segments of `track`, latest onset first.
///
/// An adjustment whose split point lies in no segment, or whose split the
/// host rejects, is skipped. Host failures other than a split are errors.
pub fn apply_adjustments(
    repo: &mut dyn TrackRepository,
    track: TrackRef,
    adjustments: &[Adjustment],
) -> TimelineResult<EditReport> {
    let mut arena = SegmentArena::from_segments(&repo.segments(track)?);

    let mut ordered = adjustments.to_vec();
    ordered.sort_by(|a, b| b.target_time.total_cmp(&a.target_time));

    let mut report = EditReport {
        attempted: ordered.len(),
        ..EditReport::default()
    };

    for adjustment in &ordered {
        let shift = adjustment.corrective_shift();
        let split_time = adjustment.target_time - SPLIT_LEAD;

        let Some(found) = arena.containing(split_time) else {
            tracing::debug!(
                "No segment contains split point {:.3}s, skipping adjustment",
                split_time
            );
            continue;
        };

        let near_edge = split_time <= found.position + EDGE_TOLERANCE
            || split_time >= found.end() - EDGE_TOLERANCE;

        let operation = if near_edge {
            let new_position = found.position + shift;
            repo.set_position(found.id, new_position)?;
            if let Some(record) = arena.get_mut(found.id) {
                record.position = new_position;
            }

            EditOperation {
                kind: EditKind::MoveWhole,
                segment_id: found.id,
                moved_id: found.id,
                target_time: adjustment.target_time,
                split_time,
                shift,
            }
        } else {
            let new_id = match repo.split_segment(found.id, split_time) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("Split of {} at {:.3}s failed: {}", found.id, split_time, e);
                    continue;
                }
            };

            let tail = repo.segment(new_id)?;
            let adjusted = tail.position + shift;
            repo.set_position(new_id, adjusted)?;

            if let Some(record) = arena.get_mut(found.id) {
                record.length = split_time - found.position;
            }
            arena.insert(TrackedSegment {
                id: new_id,
                position: adjusted,
                length: tail.length,
            });

            EditOperation {
                kind: EditKind::SplitAndMove,
                segment_id: found.id,
                moved_id: new_id,
                target_time: adjustment.target_time,
                split_time,
                shift,
            }
        };

        tracing::debug!(
            "{} {} at {:.3}s by {:+.1}ms",
            operation.kind,
            operation.moved_id,
            split_time,
            shift * 1000.0
        );

        report.moved.push(MovedSegment {
            id: operation.moved_id,
            shift,
        });
        report.operations.push(operation);
        report.successful += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OnsetMatch;
    use crate::models::Segment;
    use crate::timeline::{InMemoryTimeline, Project};

    fn host(segments: Vec<Segment>) -> (InMemoryTimeline, TrackRef) {
        let mut timeline = InMemoryTimeline::new(Project::default());
        let track = timeline.add_track("Target", segments);
        (timeline, track)
    }

    fn seg(id: u64, position: f64, length: f64, offset: f64) -> Segment {
        Segment::new(SegmentId(id), position, length, "take.wav", offset)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn splits_and_moves_trailing_piece() {
        let (mut timeline, track) = host(vec![seg(1, 0.0, 4.0, 1.0)]);
        let adjustments = [OnsetMatch::new(1.030, 1.000)];

        let report = apply_adjustments(&mut timeline, track, &adjustments).unwrap();
        assert_eq!(report.successful, 1);
        assert_eq!(report.attempted, 1);

        let op = report.operations[0];
        assert_eq!(op.kind, EditKind::SplitAndMove);
        assert_close(op.split_time, 1.025);
        assert_close(op.shift, -0.030);

        let head = timeline.segment(SegmentId(1)).unwrap();
        let tail = timeline.segment(op.moved_id).unwrap();
        assert_close(head.length, 1.025);
        assert_close(tail.position, 0.995);
        assert_close(tail.length, 2.975);
        assert_close(tail.source_offset, 2.025);
        assert_eq!(report.moved_ids(), vec![op.moved_id]);
    }

    #[test]
    fn split_near_edge_moves_whole_segment() {
        let (mut timeline, track) = host(vec![seg(1, 0.0, 2.0, 0.0), seg(2, 2.0, 2.0, 0.0)]);
        // Onset 8ms into segment 2: split point 3ms in, inside the tolerance
        let adjustments = [OnsetMatch::new(2.008, 2.028)];

        let report = apply_adjustments(&mut timeline, track, &adjustments).unwrap();
        assert_eq!(report.operations[0].kind, EditKind::MoveWhole);
        assert_eq!(report.operations[0].moved_id, SegmentId(2));
        assert_close(timeline.segment(SegmentId(2)).unwrap().position, 2.020);
        assert_eq!(timeline.segments(track).unwrap().len(), 2);
    }

    #[test]
    fn split_near_end_moves_whole_segment() {
        let (mut timeline, track) = host(vec![seg(1, 0.0, 2.0, 0.0)]);
        let adjustments = [OnsetMatch::new(2.002, 1.982)];

        let report = apply_adjustments(&mut timeline, track, &adjustments).unwrap();
        assert_eq!(report.operations[0].kind, EditKind::MoveWhole);
        assert_close(timeline.segment(SegmentId(1)).unwrap().position, -0.020);
    }

    #[test]
    fn unresolved_split_points_are_skipped() {
        let (mut timeline, track) = host(vec![seg(1, 0.0, 1.0, 0.0), seg(2, 3.0, 1.0, 0.0)]);
        let adjustments = [OnsetMatch::new(2.0, 1.97), OnsetMatch::new(3.5, 3.48)];

        let report = apply_adjustments(&mut timeline, track, &adjustments).unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.successful, 1);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn processes_latest_onset_first() {
        let (mut timeline, track) = host(vec![seg(1, 0.0, 10.0, 0.0)]);
        let adjustments = [
            OnsetMatch::new(2.0, 1.95),
            OnsetMatch::new(6.0, 5.96),
            OnsetMatch::new(4.0, 4.02),
        ];

        let report = apply_adjustments(&mut timeline, track, &adjustments).unwrap();
        let order: Vec<f64> = report.operations.iter().map(|op| op.target_time).collect();
        assert_eq!(order, vec![6.0, 4.0, 2.0]);
        assert!(report.operations.iter().all(|op| op.kind == EditKind::SplitAndMove));

        // Each earlier split lands in the original segment, never in a moved piece
        for op in &report.operations {
            assert_eq!(op.segment_id, SegmentId(1));
        }

        let mut segments = timeline.segments(track).unwrap();
        segments.sort_by(|a, b| a.position.total_cmp(&b.position));
        let positions: Vec<f64> = segments.iter().map(|s| s.position).collect();
        assert_eq!(positions.len(), 4);
        assert_close(positions[1], 1.945);
        assert_close(positions[2], 4.015);
        assert_close(positions[3], 5.955);
    }

    #[test]
    fn later_geometry_is_tracked() {
        // Second adjustment (earlier onset) falls inside the head left by the first split
        let (mut timeline, track) = host(vec![seg(1, 0.0, 4.0, 0.0)]);
        let adjustments = [OnsetMatch::new(1.0, 0.98), OnsetMatch::new(3.0, 3.04)];

        let report = apply_adjustments(&mut timeline, track, &adjustments).unwrap();
        assert_eq!(report.successful, 2);
        assert_close(timeline.segment(SegmentId(1)).unwrap().length, 0.995);
        assert_eq!(timeline.segments(track).unwrap().len(), 3);
    }

    #[test]
    fn unknown_track_is_an_error() {
        let (mut timeline, _) = host(vec![]);
        assert!(apply_adjustments(&mut timeline, TrackRef(5), &[]).is_err());
    }
}
