//! Core types for the alignment pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{Adjustment, OnsetMatch};
use crate::audio::{AudioReader, WavReader};
use crate::config::ModeParams;
use crate::edit::{EditReport, GapFillReport};
use crate::logging::RunLogger;
use crate::models::{Segment, SegmentId, TrackRef};
use crate::timeline::SegmentFilter;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Which part of the tracks a run looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every segment on both tracks.
    #[default]
    EntireTrack,
    /// Segments overlapping `[start, end)` on both tracks.
    TimeRange(f64, f64),
    /// Only these target segments; the whole reference track is used.
    SelectedItems(Vec<SegmentId>),
}

impl Scope {
    /// Pick the scope from a time selection and a set of selected items.
    ///
    /// A time selection wins over selected items; with neither the whole
    /// track is processed.
    pub fn from_selection(time_range: Option<(f64, f64)>, selected: Vec<SegmentId>) -> Self {
        match time_range {
            Some((start, end)) => Scope::TimeRange(start, end),
            None if !selected.is_empty() => Scope::SelectedItems(selected),
            None => Scope::EntireTrack,
        }
    }

    /// Segment filter for the reference track.
    pub fn reference_filter(&self) -> SegmentFilter {
        match self {
            Scope::TimeRange(start, end) => SegmentFilter::time_range(*start, *end),
            Scope::EntireTrack | Scope::SelectedItems(_) => SegmentFilter::all(),
        }
    }

    /// Segment filter for the target track.
    pub fn target_filter(&self) -> SegmentFilter {
        match self {
            Scope::TimeRange(start, end) => SegmentFilter::time_range(*start, *end),
            Scope::SelectedItems(ids) => SegmentFilter::selected(ids.clone()),
            Scope::EntireTrack => SegmentFilter::all(),
        }
    }

    /// One-line description for the run log.
    pub fn describe(&self) -> String {
        match self {
            Scope::EntireTrack => "Entire track".to_string(),
            Scope::TimeRange(start, end) => format!("Time selection: {:.1}s - {:.1}s", start, end),
            Scope::SelectedItems(ids) => format!("{} selected items on target track", ids.len()),
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignRequest {
    /// Track whose timing is the reference.
    pub reference: TrackRef,
    /// Track to align. It is left untouched; edits go to a derived copy.
    pub target: TrackRef,
    /// Smallest timing error (milliseconds) worth correcting.
    pub threshold_ms: f64,
    /// Smart (0) to precise (100).
    pub mode: f64,
    #[serde(default)]
    pub scope: Scope,
}

impl AlignRequest {
    /// Request over the entire tracks.
    pub fn new(reference: TrackRef, target: TrackRef, threshold_ms: f64, mode: f64) -> Self {
        Self {
            reference,
            target,
            threshold_ms,
            mode,
            scope: Scope::EntireTrack,
        }
    }

    /// Restrict the request to a scope.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Check the numeric parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold_ms.is_finite() || self.threshold_ms < 0.0 {
            return Err(format!("threshold must be a non-negative number of ms, got {}", self.threshold_ms));
        }
        if !self.mode.is_finite() {
            return Err(format!("mode must be a number between 0 and 100, got {}", self.mode));
        }
        if let Scope::TimeRange(start, end) = self.scope {
            if !start.is_finite() || !end.is_finite() || end <= start {
                return Err(format!("time range {}..{} is empty", start, end));
            }
        }
        Ok(())
    }
}

/// Read-only context passed to pipeline steps.
///
/// Contains the request and shared resources that steps can read but not
/// modify. Mutable state goes in `AlignState`; the host timeline is passed
/// to each step separately.
pub struct Context {
    /// What to align.
    pub request: AlignRequest,
    /// Constants derived from the request's mode.
    pub params: ModeParams,
    /// Run name/identifier.
    pub run_name: String,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    /// Source of decoded audio for onset detection.
    reader: Arc<dyn AudioReader>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    /// Create a new context reading WAV files at the default analysis rate.
    pub fn new(request: AlignRequest, run_name: impl Into<String>, logger: Arc<RunLogger>) -> Self {
        let params = ModeParams::from_mode(request.mode);
        Self {
            request,
            params,
            run_name: run_name.into(),
            logger,
            reader: Arc::new(WavReader::default()),
            progress_callback: None,
        }
    }

    /// Replace the audio reader.
    pub fn with_reader(mut self, reader: Arc<dyn AudioReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Read WAV files decimated towards `rate` Hz.
    pub fn with_sample_rate(self, rate: u32) -> Self {
        self.with_reader(Arc::new(WavReader::new(rate)))
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// The audio reader.
    pub fn reader(&self) -> &dyn AudioReader {
        self.reader.as_ref()
    }
}

/// Mutable run state that accumulates results from pipeline steps.
///
/// Each step writes its own section once; later steps only read earlier
/// sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignState {
    /// Unique run identifier.
    pub run_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// Segments taking part (from Collect step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected: Option<CollectOutput>,
    /// Detected onsets (from Detect step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onsets: Option<OnsetOutput>,
    /// Matches and adjustments (from Match step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchOutput>,
    /// Derived track and applied edits (from Apply step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<EditOutput>,
    /// Gap filling results (from Fill Gaps step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_fill: Option<GapFillReport>,
}

impl AlignState {
    /// Create a new run state with the given ID.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Derived track, once created.
    pub fn derived_track(&self) -> Option<TrackRef> {
        self.edits.as_ref().map(|e| e.derived_track)
    }
}

/// Output from the Collect step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectOutput {
    pub reference_name: String,
    pub target_name: String,
    /// Active comp segments of the reference track, by position.
    pub reference_segments: Vec<Segment>,
    /// Active comp segments of the target track, by position.
    pub target_segments: Vec<Segment>,
}

/// Output from the Detect step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnsetOutput {
    /// Reference onsets, ascending (seconds).
    pub reference: Vec<f64>,
    /// Target onsets, ascending (seconds).
    pub target: Vec<f64>,
}

/// Output from the Match step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchOutput {
    pub matches: Vec<OnsetMatch>,
    /// Matches above the threshold.
    pub significant: Vec<OnsetMatch>,
    /// Significant matches after grouping.
    pub adjustments: Vec<Adjustment>,
    /// Whether the binary-search matcher was used.
    pub sorted_scan: bool,
}

/// Output from the Apply step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOutput {
    pub derived_track: TrackRef,
    pub report: EditReport,
}

/// Why a run stopped without editing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NothingToDo {
    /// A track selector points past the last track.
    TrackNotFound { track: TrackRef },
    /// One or both tracks have no segments in scope.
    NoSegments,
    /// One or both tracks produced no onsets.
    NoOnsets,
    /// No match exceeded the threshold.
    NoSignificantDifferences { threshold_ms: f64 },
}

impl std::fmt::Display for NothingToDo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NothingToDo::TrackNotFound { track } => write!(f, "{} not found", track),
            NothingToDo::NoSegments => write!(f, "No items found on one or both tracks"),
            NothingToDo::NoOnsets => write!(f, "Could not detect onsets, check the audio files"),
            NothingToDo::NoSignificantDifferences { threshold_ms } => write!(
                f,
                "No timing differences above {}ms found; tracks are already aligned or the threshold is too high",
                threshold_ms
            ),
        }
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Step completed; run the next one.
    Continue,
    /// Nothing left to do. Later steps are not run.
    Halt(NothingToDo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_selection_wins_over_selected_items() {
        let scope = Scope::from_selection(Some((1.0, 4.0)), vec![SegmentId(3)]);
        assert_eq!(scope, Scope::TimeRange(1.0, 4.0));

        let scope = Scope::from_selection(None, vec![SegmentId(3)]);
        assert_eq!(scope, Scope::SelectedItems(vec![SegmentId(3)]));

        assert_eq!(Scope::from_selection(None, vec![]), Scope::EntireTrack);
    }

    #[test]
    fn selected_items_only_filter_the_target() {
        let scope = Scope::SelectedItems(vec![SegmentId(3), SegmentId(4)]);
        assert_eq!(scope.reference_filter(), SegmentFilter::all());
        assert_eq!(scope.target_filter().selected, Some(vec![SegmentId(3), SegmentId(4)]));
        assert_eq!(scope.describe(), "2 selected items on target track");

        let scope = Scope::TimeRange(2.0, 6.0);
        assert_eq!(scope.reference_filter(), scope.target_filter());
        assert_eq!(scope.describe(), "Time selection: 2.0s - 6.0s");
    }

    #[test]
    fn request_validation() {
        let ok = AlignRequest::new(TrackRef(0), TrackRef(1), 15.0, 50.0);
        assert!(ok.validate().is_ok());

        let mut bad = ok.clone();
        bad.threshold_ms = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = ok.clone();
        bad.mode = f64::INFINITY;
        assert!(bad.validate().is_err());

        let bad = ok.with_scope(Scope::TimeRange(5.0, 5.0));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn nothing_to_do_serializes_with_reason_tag() {
        let json = serde_json::to_string(&NothingToDo::NoSignificantDifferences { threshold_ms: 15.0 }).unwrap();
        assert_eq!(json, r#"{"reason":"no_significant_differences","threshold_ms":15.0}"#);

        let json = serde_json::to_string(&NothingToDo::TrackNotFound { track: TrackRef(2) }).unwrap();
        assert_eq!(json, r#"{"reason":"track_not_found","track":2}"#);
    }

    #[test]
    fn state_serializes_without_empty_sections() {
        let state = AlignState::new("run-1");
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"run_id\":\"run-1\""));
        assert!(!json.contains("onsets"));
    }
}
