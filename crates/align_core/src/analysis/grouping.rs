//! Significance filtering and mode-driven clustering of matches.

use crate::config::grouping_window;

use super::types::{Adjustment, OnsetMatch};

/// Grouping windows below this are treated as "no grouping" (seconds).
pub const MIN_GROUPING_WINDOW: f64 = 0.001;

/// Keep matches whose timing error is strictly above `threshold_ms`.
pub fn filter_significant(matches: &[OnsetMatch], threshold_ms: f64) -> Vec<OnsetMatch> {
    matches
        .iter()
        .filter(|m| m.diff_ms().abs() > threshold_ms)
        .copied()
        .collect()
}

/// Cluster matches using the grouping window for `mode` (0-100).
pub fn group_adjustments(matches: &[OnsetMatch], mode: f64) -> Vec<Adjustment> {
    group_with_window(matches, grouping_window(mode))
}

/// Cluster time-ordered matches and keep the largest correction per cluster.
///
/// A match closer than `window` to the previous match's target time joins the
/// current cluster. Clustering is a single left-to-right pass. Within a
/// cluster the first match with the largest `|diff|` is kept.
pub fn group_with_window(matches: &[OnsetMatch], window: f64) -> Vec<Adjustment> {
    if window < MIN_GROUPING_WINDOW {
        return matches.to_vec();
    }

    let mut adjustments = Vec::new();
    let mut iter = matches.iter();
    let Some(first) = iter.next() else {
        return adjustments;
    };

    let mut best = *first;
    let mut previous_time = first.target_time;

    for m in iter {
        if m.target_time - previous_time < window {
            if m.diff_secs.abs() > best.diff_secs.abs() {
                best = *m;
            }
        } else {
            adjustments.push(best);
            best = *m;
        }
        previous_time = m.target_time;
    }
    adjustments.push(best);

    tracing::debug!(
        "Grouped {} matches into {} adjustments (window {:.0}ms)",
        matches.len(),
        adjustments.len(),
        window * 1000.0
    );
    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(target: f64, reference: f64) -> OnsetMatch {
        OnsetMatch::new(target, reference)
    }

    #[test]
    fn threshold_is_strict() {
        let matches = [m(1.030, 1.0), m(2.0, 2.0), m(3.010, 3.0), m(4.0, 4.02)];
        let significant = filter_significant(&matches, 15.0);
        assert_eq!(significant, vec![matches[0], matches[3]]);

        // Exactly on the threshold is not significant
        let exact = [m(1.25, 1.0)];
        assert!(filter_significant(&exact, 250.0).is_empty());
    }

    #[test]
    fn precise_mode_is_identity() {
        let matches = vec![m(1.0, 0.98), m(1.01, 0.99), m(1.02, 1.05), m(4.0, 4.03)];
        assert_eq!(group_adjustments(&matches, 100.0), matches);
    }

    #[test]
    fn smart_mode_collapses_clusters() {
        let matches = [
            m(1.00, 0.98), // 20ms
            m(1.20, 1.16), // 40ms
            m(1.45, 1.47), // -20ms, 250ms after previous: same cluster
            m(2.00, 1.97), // 550ms gap: new cluster
            m(2.31, 2.25), // 310ms gap: new cluster
        ];
        let grouped = group_adjustments(&matches, 0.0);

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0], matches[1]);
        assert_eq!(grouped[1], matches[3]);
        assert_eq!(grouped[2], matches[4]);
    }

    #[test]
    fn clusters_chain_through_close_neighbours() {
        // Each step is 200ms, so a 300ms window joins all of them
        let matches: Vec<OnsetMatch> = (0..6)
            .map(|i| {
                let t = 1.0 + i as f64 * 0.2;
                m(t, t - 0.02 - i as f64 * 0.001)
            })
            .collect();
        let grouped = group_with_window(&matches, 0.3);
        assert_eq!(grouped, vec![matches[5]]);
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let matches = [m(1.0, 0.75), m(1.125, 1.375), m(1.25, 1.0)];
        let grouped = group_with_window(&matches, 0.3);
        assert_eq!(grouped, vec![matches[0]]);
    }

    #[test]
    fn blend_mode_uses_shorter_window() {
        // Mode 50: 150ms window
        let matches = [m(1.0, 0.98), m(1.1, 1.05), m(1.4, 1.37)];
        let grouped = group_adjustments(&matches, 50.0);
        assert_eq!(grouped, vec![matches[1], matches[2]]);
    }

    #[test]
    fn empty_input() {
        assert!(group_adjustments(&[], 0.0).is_empty());
    }
}
