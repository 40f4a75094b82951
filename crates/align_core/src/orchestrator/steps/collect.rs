//! Collect step - gathers the active comp segments of both tracks.
//!
//! The time range (if any) applies to both tracks. Selected items restrict
//! only the target track. Stacked alternate takes are dropped by the host's
//! `list_segments`.

use crate::models::TrackRef;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AlignState, CollectOutput, Context, NothingToDo, StepOutcome};
use crate::timeline::TrackRepository;

/// Collect step for choosing the segments to analyze.
pub struct CollectStep;

impl CollectStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CollectStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for CollectStep {
    fn name(&self) -> &str {
        "Collect"
    }

    fn description(&self) -> &str {
        "Collect active comp segments"
    }

    fn validate_input(&self, _ctx: &Context, _state: &AlignState) -> StepResult<()> {
        Ok(())
    }

    fn execute(
        &self,
        ctx: &Context,
        repo: &mut dyn TrackRepository,
        state: &mut AlignState,
    ) -> StepResult<StepOutcome> {
        let request = &ctx.request;

        for track in [request.reference, request.target] {
            if track.0 >= repo.track_count() {
                return Ok(StepOutcome::Halt(NothingToDo::TrackNotFound { track }));
            }
        }

        let reference_name = track_name(repo, request.reference)?;
        let target_name = track_name(repo, request.target)?;

        ctx.logger
            .info(&format!("Reference: {} ({})", request.reference, reference_name));
        ctx.logger
            .info(&format!("Target: {} ({})", request.target, target_name));
        ctx.logger.info(&format!("Threshold: {}ms", request.threshold_ms));
        ctx.logger.info(&format!("Mode: {}", ctx.params.label()));
        ctx.logger
            .info(&format!("Processing: {}", request.scope.describe()));

        let reference_segments = repo
            .list_segments(request.reference, &request.scope.reference_filter())
            .map_err(|e| StepError::host("list reference segments", e))?;
        let target_segments = repo
            .list_segments(request.target, &request.scope.target_filter())
            .map_err(|e| StepError::host("list target segments", e))?;

        ctx.logger
            .info(&format!("Reference items: {}", reference_segments.len()));
        ctx.logger
            .info(&format!("Target items: {}", target_segments.len()));

        let empty = reference_segments.is_empty() || target_segments.is_empty();
        state.collected = Some(CollectOutput {
            reference_name,
            target_name,
            reference_segments,
            target_segments,
        });

        if empty {
            return Ok(StepOutcome::Halt(NothingToDo::NoSegments));
        }
        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, state: &AlignState) -> StepResult<()> {
        match &state.collected {
            Some(c) if !c.reference_segments.is_empty() && !c.target_segments.is_empty() => Ok(()),
            _ => Err(StepError::invalid_output("Segments were not recorded")),
        }
    }
}

fn track_name(repo: &dyn TrackRepository, track: TrackRef) -> StepResult<String> {
    repo.track_name(track)
        .map_err(|e| StepError::host("read track name", e))
}
