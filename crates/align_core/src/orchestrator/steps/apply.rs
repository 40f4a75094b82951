//! Apply step - creates the aligned copy of the target and edits it.
//!
//! The original target track is never modified. The collected target
//! segments are copied onto a new track right after it and every split and
//! move happens on the copy.

use crate::edit::apply_adjustments;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AlignState, Context, EditOutput, StepOutcome};
use crate::timeline::TrackRepository;

/// Apply step for the split/move edits.
pub struct ApplyStep;

impl ApplyStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ApplyStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ApplyStep {
    fn name(&self) -> &str {
        "Apply"
    }

    fn description(&self) -> &str {
        "Apply adjustments"
    }

    fn validate_input(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        if state.collected.is_none() {
            return Err(StepError::precondition_failed("No segments collected"));
        }
        match &state.matching {
            Some(m) if !m.adjustments.is_empty() => Ok(()),
            _ => Err(StepError::precondition_failed("No adjustments to apply")),
        }
    }

    fn execute(
        &self,
        ctx: &Context,
        repo: &mut dyn TrackRepository,
        state: &mut AlignState,
    ) -> StepResult<StepOutcome> {
        let (Some(collected), Some(matching)) = (&state.collected, &state.matching) else {
            return Err(StepError::precondition_failed("No adjustments to apply"));
        };

        let derived_track = repo
            .create_derived_track(ctx.request.target, &collected.target_segments)
            .map_err(|e| StepError::host("create derived track", e))?;
        ctx.logger.info(&format!("Created {}", derived_track));

        let report = apply_adjustments(repo, derived_track, &matching.adjustments)
            .map_err(|e| StepError::host("apply adjustments", e))?;

        for op in &report.operations {
            ctx.logger.detail(&format!(
                "  {} {} at {:.3}s ({:+.1}ms)",
                op.kind,
                op.moved_id,
                op.split_time,
                op.shift * 1000.0
            ));
        }
        if report.skipped() > 0 {
            ctx.logger.warn(&format!(
                "{} adjustments had no segment to edit",
                report.skipped()
            ));
        }
        ctx.logger.info(&format!(
            "Adjustments applied: {}/{}",
            report.successful, report.attempted
        ));

        state.edits = Some(EditOutput {
            derived_track,
            report,
        });
        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        if state.edits.is_none() {
            return Err(StepError::invalid_output("Edits were not recorded"));
        }
        Ok(())
    }
}
