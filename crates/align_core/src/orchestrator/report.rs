//! Run summary handed back to the caller.

use serde::{Deserialize, Serialize};

use crate::analysis::OnsetMatch;
use crate::edit::{EditReport, GapFillReport};
use crate::models::TrackRef;

use super::pipeline::PipelineRunResult;
use super::types::{AlignState, Context, NothingToDo};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step ran and the aligned track exists.
    Completed,
    /// The run stopped before editing anything.
    NothingToDo(NothingToDo),
}

/// Item counts per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub reference_segments: usize,
    pub target_segments: usize,
    pub reference_onsets: usize,
    pub target_onsets: usize,
    pub matches: usize,
    pub significant: usize,
    pub adjustments: usize,
}

/// Result of one alignment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub mode_label: String,
    pub threshold_ms: f64,
    pub counts: StageCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_track: Option<TrackRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<EditReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_fill: Option<GapFillReport>,
    /// Mean `|diff|` over the significant matches (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_correction_ms: Option<f64>,
    /// Largest `|diff|` over the significant matches (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_correction_ms: Option<f64>,
}

impl AlignReport {
    /// Summarize the state a pipeline run left behind.
    pub fn from_state(ctx: &Context, state: &AlignState, run: &PipelineRunResult) -> Self {
        let mut counts = StageCounts::default();
        if let Some(c) = &state.collected {
            counts.reference_segments = c.reference_segments.len();
            counts.target_segments = c.target_segments.len();
        }
        if let Some(o) = &state.onsets {
            counts.reference_onsets = o.reference.len();
            counts.target_onsets = o.target.len();
        }

        let mut stats = None;
        if let Some(m) = &state.matching {
            counts.matches = m.matches.len();
            counts.significant = m.significant.len();
            counts.adjustments = m.adjustments.len();
            stats = correction_stats(&m.significant);
        }

        let outcome = match &run.halted {
            Some(halted) => RunOutcome::NothingToDo(halted.reason.clone()),
            None => RunOutcome::Completed,
        };

        Self {
            run_id: state.run_id.clone(),
            outcome,
            mode_label: ctx.params.label(),
            threshold_ms: ctx.request.threshold_ms,
            counts,
            derived_track: state.derived_track(),
            edits: state.edits.as_ref().map(|e| e.report.clone()),
            gap_fill: state.gap_fill.clone(),
            avg_correction_ms: stats.map(|(avg, _)| avg),
            max_correction_ms: stats.map(|(_, max)| max),
        }
    }

    /// Whether the aligned track was produced.
    pub fn is_completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Closing lines for the run log.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Mode: {}", self.mode_label)];

        if let RunOutcome::NothingToDo(reason) = &self.outcome {
            lines.push(format!("Nothing to do: {}", reason));
            return lines;
        }

        if let Some(edits) = &self.edits {
            lines.push(format!(
                "Adjustments applied: {}/{}",
                edits.successful, edits.attempted
            ));
        }
        if let Some(gap_fill) = &self.gap_fill {
            lines.push(format!("Gaps filled: {}", gap_fill.gaps_filled));
        }
        if let Some(track) = self.derived_track {
            lines.push(format!("New track: {}", track.number()));
        }
        if let (Some(avg), Some(max)) = (self.avg_correction_ms, self.max_correction_ms) {
            lines.push(format!("Avg correction: {:.1}ms", avg));
            lines.push(format!("Max correction: {:.1}ms", max));
        }
        lines
    }
}

/// Mean and maximum absolute timing error (ms), None for no matches.
pub fn correction_stats(matches: &[OnsetMatch]) -> Option<(f64, f64)> {
    if matches.is_empty() {
        return None;
    }
    let diffs = matches.iter().map(|m| m.diff_ms().abs());
    let max = diffs.clone().fold(0.0, f64::max);
    let avg = diffs.sum::<f64>() / matches.len() as f64;
    Some((avg, max))
}
