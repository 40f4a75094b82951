//! Gap filling and crossfade overlap after segments have moved.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{Edge, SegmentId, TrackRef};
use crate::timeline::{TimelineResult, TrackRepository};

use super::GAP_EPSILON;

/// One edge extension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapFillOperation {
    pub segment_id: SegmentId,
    pub edge: Edge,
    /// Seconds the edge actually moved.
    pub extension: f64,
    /// Seconds the edge should have moved (gap share plus crossfade).
    pub requested: f64,
}

impl GapFillOperation {
    /// The source ran out before the requested extension.
    pub fn is_truncated(&self) -> bool {
        self.extension < self.requested
    }
}

/// Result of [`fill_gaps`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapFillReport {
    pub operations: Vec<GapFillOperation>,
    /// Gaps addressed. The split branch (both or neither segment moved) is
    /// always counted, even if neither side had room to extend.
    pub gaps_filled: usize,
    /// Gaps whose full width was covered by the applied extensions.
    pub gaps_closed: usize,
    /// Gaps found above the threshold.
    pub gaps_found: usize,
}

/// Local view of a segment's timeline span while gaps are filled.
#[derive(Debug, Clone, Copy)]
struct Span {
    id: SegmentId,
    position: f64,
    length: f64,
}

/// Extend segment edges on `track` to close gaps left by moved segments.
///
/// Segments are visited in position order. Extensions never reach past the
/// start or end of the source file; an edge without enough material is
/// extended as far as the source allows (one-sided cases) or left alone
/// (split case).
pub fn fill_gaps(
    repo: &mut dyn TrackRepository,
    track: TrackRef,
    moved: &[SegmentId],
    crossfade: f64,
) -> TimelineResult<GapFillReport> {
    let mut report = GapFillReport::default();

    let mut spans: Vec<Span> = repo
        .segments(track)?
        .iter()
        .map(|s| Span {
            id: s.id,
            position: s.position,
            length: s.length,
        })
        .collect();
    if spans.len() < 2 {
        return Ok(report);
    }
    spans.sort_by(|a, b| a.position.total_cmp(&b.position));

    let moved: HashSet<SegmentId> = moved.iter().copied().collect();

    for i in 0..spans.len() - 1 {
        let curr = spans[i];
        let next = spans[i + 1];
        let gap = next.position - (curr.position + curr.length);

        if gap <= GAP_EPSILON {
            continue;
        }
        report.gaps_found += 1;

        let curr_moved = moved.contains(&curr.id);
        let next_moved = moved.contains(&next.id);

        let covered = match (curr_moved, next_moved) {
            (false, true) => {
                let requested = gap + crossfade;
                let head_room = repo.segment(next.id)?.head_room();
                let extension = requested.min(head_room);
                if extension <= 0.0 {
                    0.0
                } else {
                    spans[i + 1] = extend_left(repo, next, extension, head_room)?;
                    record(&mut report, next.id, Edge::Left, extension, requested);
                    report.gaps_filled += 1;
                    extension
                }
            }
            (true, false) => {
                let requested = gap + crossfade;
                let room = tail_room(repo, curr.id)?;
                let extension = requested.min(room);
                if extension <= 0.0 {
                    0.0
                } else {
                    spans[i] = extend_right(repo, curr, extension)?;
                    record(&mut report, curr.id, Edge::Right, extension, requested);
                    report.gaps_filled += 1;
                    extension
                }
            }
            _ => {
                let requested = gap / 2.0 + crossfade / 2.0;
                let mut covered = 0.0;

                if tail_room(repo, curr.id)? >= requested {
                    spans[i] = extend_right(repo, curr, requested)?;
                    record(&mut report, curr.id, Edge::Right, requested, requested);
                    covered += requested;
                } else {
                    tracing::debug!("No tail room to extend {} by {:.1}ms", curr.id, requested * 1000.0);
                }

                let head_room = repo.segment(next.id)?.head_room();
                if head_room >= requested {
                    spans[i + 1] = extend_left(repo, next, requested, head_room)?;
                    record(&mut report, next.id, Edge::Left, requested, requested);
                    covered += requested;
                } else {
                    tracing::debug!("No head room to extend {} by {:.1}ms", next.id, requested * 1000.0);
                }

                report.gaps_filled += 1;
                covered
            }
        };

        if covered >= gap {
            report.gaps_closed += 1;
        }
    }

    Ok(report)
}

/// Unused source after the segment's window, or 0 when the source length is unknown.
fn tail_room(repo: &dyn TrackRepository, id: SegmentId) -> TimelineResult<f64> {
    let source_len = repo.source_file_duration(id)?;
    if source_len <= 0.0 {
        return Ok(0.0);
    }
    Ok(repo.segment(id)?.tail_room(source_len))
}

fn extend_left(
    repo: &mut dyn TrackRepository,
    span: Span,
    extension: f64,
    source_offset: f64,
) -> TimelineResult<Span> {
    let position = span.position - extension;
    let length = span.length + extension;
    repo.set_position(span.id, position)?;
    repo.set_source_offset(span.id, (source_offset - extension).max(0.0))?;
    repo.set_length(span.id, length)?;
    Ok(Span {
        position,
        length,
        ..span
    })
}

fn extend_right(repo: &mut dyn TrackRepository, span: Span, extension: f64) -> TimelineResult<Span> {
    let length = span.length + extension;
    repo.set_length(span.id, length)?;
    Ok(Span { length, ..span })
}

fn record(report: &mut GapFillReport, id: SegmentId, edge: Edge, extension: f64, requested: f64) {
    let operation = GapFillOperation {
        segment_id: id,
        edge,
        extension,
        requested,
    };
    if operation.is_truncated() {
        tracing::debug!(
            "Extended {} {} edge by {:.1}ms of {:.1}ms requested",
            id,
            edge,
            extension * 1000.0,
            requested * 1000.0
        );
    }
    report.operations.push(operation);
}
