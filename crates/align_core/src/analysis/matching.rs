//! Nearest-neighbour onset matching.

use super::types::OnsetMatch;

/// Above this many `refs x targets` comparisons the pipeline uses
/// [`match_onsets_sorted`] instead of the exhaustive scan.
pub const SORTED_MATCH_CUTOFF: usize = 1_000_000;

/// Nearest reference onset to `target` by absolute difference.
///
/// References are scanned in order and only a strictly smaller distance
/// replaces the current best, so the first minimum wins.
pub fn nearest_reference(refs: &[f64], target: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &reference) in refs.iter().enumerate() {
        let distance = (target - reference).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }
    best
}

/// Match every target onset to its nearest reference onset.
///
/// A match is kept only when the distance is strictly below `window`.
/// Several targets may share a reference; unmatched targets are dropped.
pub fn match_onsets(refs: &[f64], targets: &[f64], window: f64) -> Vec<OnsetMatch> {
    targets
        .iter()
        .filter_map(|&target| {
            let (idx, distance) = nearest_reference(refs, target)?;
            (distance < window).then(|| OnsetMatch::new(target, refs[idx]))
        })
        .collect()
}

/// Same result as [`match_onsets`] for ascending `refs`, using binary search.
///
/// When the two neighbouring references are equally distant the earlier one
/// is kept, as the exhaustive scan does.
pub fn match_onsets_sorted(refs: &[f64], targets: &[f64], window: f64) -> Vec<OnsetMatch> {
    if refs.is_empty() {
        return Vec::new();
    }

    targets
        .iter()
        .filter_map(|&target| {
            let idx = nearest_sorted(refs, target);
            let reference = refs[idx];
            ((target - reference).abs() < window).then(|| OnsetMatch::new(target, reference))
        })
        .collect()
}

/// Index of the first minimum-distance reference in ascending `refs`.
fn nearest_sorted(refs: &[f64], target: f64) -> usize {
    // First reference >= target
    let right = refs.partition_point(|&r| r < target);
    if right == 0 {
        return 0;
    }
    if right == refs.len() {
        return first_equal(refs, refs.len() - 1);
    }

    let left = right - 1;
    let left_distance = target - refs[left];
    let right_distance = refs[right] - target;
    if left_distance <= right_distance {
        first_equal(refs, left)
    } else {
        right
    }
}

/// Walk back over duplicate values so the earliest index is returned.
fn first_equal(refs: &[f64], mut idx: usize) -> usize {
    while idx > 0 && refs[idx - 1] == refs[idx] {
        idx -= 1;
    }
    idx
}
