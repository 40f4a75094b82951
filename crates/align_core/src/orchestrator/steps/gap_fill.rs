//! Fill Gaps step - closes the holes left by moved segments.

use crate::edit::fill_gaps;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AlignState, Context, StepOutcome};
use crate::timeline::TrackRepository;

/// Fill Gaps step for edge extension and crossfade overlap.
pub struct GapFillStep;

impl GapFillStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GapFillStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for GapFillStep {
    fn name(&self) -> &str {
        "Fill Gaps"
    }

    fn description(&self) -> &str {
        "Fill gaps and create crossfades"
    }

    fn validate_input(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        if state.edits.is_none() {
            return Err(StepError::precondition_failed("No edits applied"));
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &Context,
        repo: &mut dyn TrackRepository,
        state: &mut AlignState,
    ) -> StepResult<StepOutcome> {
        let edits = state
            .edits
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("No edits applied"))?;

        let report = fill_gaps(
            repo,
            edits.derived_track,
            &edits.report.moved_ids(),
            ctx.params.crossfade,
        )
        .map_err(|e| StepError::host("fill gaps", e))?;

        for op in &report.operations {
            ctx.logger.detail(&format!(
                "  {} {} edge +{:.1}ms",
                op.segment_id,
                op.edge,
                op.extension * 1000.0
            ));
        }

        let truncated = report.operations.iter().filter(|op| op.is_truncated()).count();
        if truncated > 0 {
            ctx.logger.warn(&format!(
                "{} extensions were cut short by the end of their source file",
                truncated
            ));
        }
        ctx.logger.info(&format!(
            "Gaps filled: {} ({} of {} fully closed)",
            report.gaps_filled, report.gaps_closed, report.gaps_found
        ));

        state.gap_fill = Some(report);
        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        if state.gap_fill.is_none() {
            return Err(StepError::invalid_output("Gap filling was not recorded"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OnsetMatch;
    use crate::edit::apply_adjustments;
    use crate::logging::RunLogger;
    use crate::models::{Segment, SegmentId, TrackRef};
    use crate::orchestrator::types::{AlignRequest, EditOutput};
    use crate::timeline::{InMemoryTimeline, Project};
    use std::sync::Arc;

    #[test]
    fn closes_gap_before_moved_piece() {
        let mut repo = InMemoryTimeline::new(Project::default());
        let track = repo.add_track("Bass", vec![Segment::new(SegmentId(1), 0.0, 4.0, "bass.wav", 1.0)]);
        repo.set_source_duration("bass.wav", 10.0);

        // Target early by 30ms: the tail moves later and leaves a 30ms gap
        let report = apply_adjustments(&mut repo, track, &[OnsetMatch::new(1.0, 1.030)]).unwrap();

        let mut state = AlignState::new("fill");
        state.edits = Some(EditOutput {
            derived_track: track,
            report,
        });

        let request = AlignRequest::new(TrackRef(0), track, 15.0, 100.0);
        let ctx = Context::new(request, "fill", Arc::new(RunLogger::silent()));
        let step = GapFillStep::new();
        step.validate_input(&ctx, &state).unwrap();
        step.execute(&ctx, &mut repo, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        let report = state.gap_fill.unwrap();
        assert_eq!(report.gaps_found, 1);
        assert_eq!(report.gaps_filled, 1);
        assert_eq!(report.gaps_closed, 1);
    }

    #[test]
    fn requires_edits() {
        let request = AlignRequest::new(TrackRef(0), TrackRef(1), 15.0, 100.0);
        let ctx = Context::new(request, "fill", Arc::new(RunLogger::silent()));
        assert!(GapFillStep::new().validate_input(&ctx, &AlignState::new("fill")).is_err());
    }
}
