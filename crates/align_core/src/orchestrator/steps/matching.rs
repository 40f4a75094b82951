//! Match step - pairs onsets, filters by threshold and groups.
//!
//! Large onset sets switch from the exhaustive nearest-neighbour scan to the
//! binary-search matcher; both give the same pairs.

use crate::analysis::{
    filter_significant, group_with_window, match_onsets, match_onsets_sorted, OnsetMatch,
    SORTED_MATCH_CUTOFF,
};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AlignState, Context, MatchOutput, NothingToDo, StepOutcome};
use crate::timeline::TrackRepository;

/// Match step for turning onsets into adjustments.
pub struct MatchStep;

impl MatchStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MatchStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MatchStep {
    fn name(&self) -> &str {
        "Match"
    }

    fn description(&self) -> &str {
        "Match onsets"
    }

    fn validate_input(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        if state.onsets.is_none() {
            return Err(StepError::precondition_failed("No onsets detected"));
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &Context,
        _repo: &mut dyn TrackRepository,
        state: &mut AlignState,
    ) -> StepResult<StepOutcome> {
        let onsets = state
            .onsets
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("No onsets detected"))?;
        let params = &ctx.params;
        let threshold_ms = ctx.request.threshold_ms;

        ctx.logger.info(&format!(
            "Match window: {:.0}ms",
            params.match_window * 1000.0
        ));

        let comparisons = onsets.reference.len().saturating_mul(onsets.target.len());
        let sorted_scan = comparisons > SORTED_MATCH_CUTOFF;
        let matches = if sorted_scan {
            tracing::debug!("{} comparisons, using sorted matcher", comparisons);
            match_onsets_sorted(&onsets.reference, &onsets.target, params.match_window)
        } else {
            match_onsets(&onsets.reference, &onsets.target, params.match_window)
        };
        ctx.logger.info(&format!("Matched pairs: {}", matches.len()));

        let significant = filter_significant(&matches, threshold_ms);
        ctx.logger.info(&format!(
            "Above threshold ({}ms): {}",
            threshold_ms,
            significant.len()
        ));

        let adjustments = if significant.is_empty() {
            Vec::new()
        } else {
            let grouped = group_with_window(&significant, params.group_window);
            ctx.logger.info(&format!(
                "After grouping: {} adjustments (window: {:.0}ms)",
                grouped.len(),
                params.group_window * 1000.0
            ));
            for adjustment in &grouped {
                ctx.logger.detail(&describe(adjustment));
            }
            grouped
        };

        let nothing_significant = significant.is_empty();
        state.matching = Some(MatchOutput {
            matches,
            significant,
            adjustments,
            sorted_scan,
        });

        if nothing_significant {
            return Ok(StepOutcome::Halt(NothingToDo::NoSignificantDifferences {
                threshold_ms,
            }));
        }
        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        match &state.matching {
            Some(m) if !m.adjustments.is_empty() => Ok(()),
            _ => Err(StepError::invalid_output("No adjustments recorded")),
        }
    }
}

fn describe(adjustment: &OnsetMatch) -> String {
    format!(
        "  {:.3}s -> {:.3}s ({:+.1}ms)",
        adjustment.target_time,
        adjustment.ref_time,
        adjustment.diff_ms()
    )
}
