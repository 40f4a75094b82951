//! Active comp selection.
//!
//! Tracks recorded with loop or take stacking carry several full-length
//! alternate takes piled at the same position next to the short comp
//! pieces actually in use. Those stacks are left out of the analysis.

use std::collections::HashMap;

use crate::models::Segment;

use super::types::SegmentFilter;

/// Positions are grouped to tenths of a second to find stacks.
pub const POSITION_GROUP_SCALE: f64 = 10.0;

/// A stack needs more than this many items at one position.
pub const STACKED_TAKE_MIN_GROUP: usize = 3;

/// Select the segments that belong to the active comp, sorted by position.
///
/// Applies the selection and time-range filters, drops segments with no
/// source file and then removes stacked full-length takes: groups of more
/// than three items at the same (rounded) position whose every length is
/// above twice the median length. When no segment is three times longer
/// than the shortest one nothing is treated as a stack.
pub fn active_comp_segments(segments: &[Segment], filter: &SegmentFilter) -> Vec<Segment> {
    let candidates: Vec<&Segment> = segments
        .iter()
        .filter(|s| match &filter.selected {
            Some(ids) => ids.contains(&s.id),
            None => true,
        })
        .filter(|s| match filter.time_range {
            Some((start, end)) => !(s.end() <= start || s.position >= end),
            None => true,
        })
        .filter(|s| s.has_source())
        .collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    let mut lengths: Vec<f64> = candidates.iter().map(|s| s.length).collect();
    lengths.sort_by(f64::total_cmp);
    let min_len = lengths[0];
    let max_len = lengths[lengths.len() - 1];

    let mut kept: Vec<Segment> = if max_len < min_len * 3.0 {
        candidates.into_iter().cloned().collect()
    } else {
        let full_take_threshold = lengths[lengths.len() / 2] * 2.0;

        let mut groups: HashMap<i64, Vec<&Segment>> = HashMap::new();
        for &segment in &candidates {
            groups.entry(position_key(segment.position)).or_default().push(segment);
        }

        candidates
            .iter()
            .filter(|segment| {
                let group = &groups[&position_key(segment.position)];
                let stacked = group.len() > STACKED_TAKE_MIN_GROUP
                    && group.iter().all(|s| s.length > full_take_threshold);
                if stacked {
                    tracing::debug!("Skipping stacked take {} at {:.1}s", segment.id, segment.position);
                }
                !stacked
            })
            .map(|segment| (*segment).clone())
            .collect()
    };

    kept.sort_by(|a, b| a.position.total_cmp(&b.position));
    kept
}

/// Position rounded to tenths, nearest by exact value with ties to even.
fn position_key(position: f64) -> i64 {
    let scaled = position * POSITION_GROUP_SCALE;
    // Exact rounding error of the multiply
    let error = position.mul_add(POSITION_GROUP_SCALE, -scaled);
    let floor = scaled.floor();

    let key = if scaled - floor != 0.5 {
        scaled.round()
    } else if error > 0.0 {
        floor + 1.0
    } else if error < 0.0 || floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    key as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SegmentId;

    fn seg(id: u64, position: f64, length: f64) -> Segment {
        Segment::new(SegmentId(id), position, length, format!("take{}.wav", id), 0.0)
    }

    fn ids(segments: &[Segment]) -> Vec<u64> {
        segments.iter().map(|s| s.id.0).collect()
    }

    #[test]
    fn similar_lengths_keep_everything_sorted() {
        let segments = vec![seg(1, 4.0, 2.0), seg(2, 0.0, 2.5), seg(3, 2.0, 1.5)];
        let kept = active_comp_segments(&segments, &SegmentFilter::all());
        assert_eq!(ids(&kept), vec![2, 3, 1]);
    }

    #[test]
    fn stacked_full_takes_are_dropped() {
        let mut segments = Vec::new();
        // Four full takes stacked at 0.0 (one at 0.04 rounds to the same slot)
        segments.push(seg(1, 0.0, 60.0));
        segments.push(seg(2, 0.0, 60.0));
        segments.push(seg(3, 0.04, 60.0));
        segments.push(seg(4, 0.0, 60.0));
        // Short comp pieces
        for i in 0..6 {
            segments.push(seg(10 + i, 1.0 + i as f64 * 5.0, 4.0));
        }

        let kept = active_comp_segments(&segments, &SegmentFilter::all());
        assert_eq!(ids(&kept), vec![10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn small_stacks_are_kept() {
        let mut segments = vec![seg(1, 0.0, 60.0), seg(2, 0.0, 60.0), seg(3, 0.0, 60.0)];
        for i in 0..4 {
            segments.push(seg(10 + i, 1.0 + i as f64 * 5.0, 4.0));
        }
        let kept = active_comp_segments(&segments, &SegmentFilter::all());
        assert_eq!(kept.len(), 7);
    }

    #[test]
    fn stack_with_a_short_item_is_kept() {
        let mut segments = vec![
            seg(1, 0.0, 60.0),
            seg(2, 0.0, 60.0),
            seg(3, 0.0, 60.0),
            seg(4, 0.0, 3.0),
        ];
        for i in 0..4 {
            segments.push(seg(10 + i, 1.0 + i as f64 * 5.0, 4.0));
        }
        let kept = active_comp_segments(&segments, &SegmentFilter::all());
        assert_eq!(kept.len(), 8);
    }

    #[test]
    fn time_range_keeps_overlapping_segments() {
        let segments = vec![seg(1, 0.0, 2.0), seg(2, 2.0, 2.0), seg(3, 4.0, 2.0), seg(4, 6.0, 2.0)];
        let kept = active_comp_segments(&segments, &SegmentFilter::time_range(2.0, 6.0));
        // Ending exactly at the start or starting exactly at the end is outside
        assert_eq!(ids(&kept), vec![2, 3]);

        let kept = active_comp_segments(&segments, &SegmentFilter::time_range(1.5, 4.5));
        assert_eq!(ids(&kept), vec![1, 2, 3]);
    }

    #[test]
    fn selection_and_missing_sources() {
        let mut segments = vec![seg(1, 0.0, 2.0), seg(2, 2.0, 2.0), seg(3, 4.0, 2.0)];
        segments[2].file = Default::default();

        let filter = SegmentFilter::selected(vec![SegmentId(1), SegmentId(3)]);
        let kept = active_comp_segments(&segments, &filter);
        assert_eq!(ids(&kept), vec![1]);
    }

    #[test]
    fn position_key_rounds_half_to_even() {
        // Exact ties go to the even tenth
        assert_eq!(position_key(0.25), 2);
        assert_eq!(position_key(0.75), 8);
        assert_eq!(position_key(-0.25), -2);
        // Decimal-looking ties round by their stored value
        assert_eq!(position_key(0.35), 3);
        assert_eq!(position_key(1.45), 14);
        assert_eq!(position_key(0.05), 1);
        assert_eq!(position_key(0.04), 0);
        assert_eq!(position_key(12.0), 120);
    }

    #[test]
    fn tie_position_starts_its_own_group() {
        // 0.25 groups with 0.2, not with the stack at 0.3
        let mut segments = vec![
            seg(1, 0.3, 60.0),
            seg(2, 0.3, 60.0),
            seg(3, 0.3, 60.0),
            seg(4, 0.25, 60.0),
        ];
        for i in 0..6 {
            segments.push(seg(10 + i, 1.0 + i as f64 * 5.0, 4.0));
        }
        let kept = active_comp_segments(&segments, &SegmentFilter::all());
        assert_eq!(kept.len(), 10);
    }

    #[test]
    fn empty_input() {
        assert!(active_comp_segments(&[], &SegmentFilter::all()).is_empty());
    }
}
