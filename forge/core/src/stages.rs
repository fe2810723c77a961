//! Generation Stages
//!
//! A fixed catalog of named phases shown to the user while a run is in
//! flight. Stage timing is a presentation device: the orchestrator advances
//! through the catalog on its own clock, independent of how far the backend
//! actually is. Only the final stage is tied to a real event (the response
//! being accepted).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One entry of the stage catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationStage {
    /// Stable identifier
    pub id: &'static str,
    /// Short display name
    pub name: &'static str,
    /// One-line description of what the stage represents
    pub description: &'static str,
    /// Progress reported while this stage is current (0-100)
    pub target_progress: u8,
    /// How long the stage is shown before advancing
    pub estimated_duration: Duration,
}

const fn stage(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    target_progress: u8,
    millis: u64,
) -> GenerationStage {
    GenerationStage {
        id,
        name,
        description,
        target_progress,
        estimated_duration: Duration::from_millis(millis),
    }
}

/// The stage catalog, in display order
pub const STAGES: [GenerationStage; 10] = [
    stage("analyze", "Analyzing requirements", "Reading the request and extracting requirements", 0, 800),
    stage("architecture", "Designing architecture", "Choosing layers and module boundaries", 10, 1200),
    stage("patterns", "Selecting design patterns", "Matching requirements to proven patterns", 20, 1000),
    stage("structure", "Planning project structure", "Laying out directories and files", 30, 1000),
    stage("core", "Generating core logic", "Writing the central domain code", 45, 2000),
    stage("features", "Implementing features", "Filling in the requested functionality", 60, 2000),
    stage("tests", "Writing tests", "Adding unit and integration tests", 72, 1500),
    stage("security", "Hardening security", "Validating inputs and securing boundaries", 82, 1200),
    stage("docs", "Writing documentation", "Documenting usage and design", 92, 1000),
    stage("finalize", "Finalizing output", "Assembling the generated project", 100, 500),
];

/// A progress report for the current stage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Index into [`STAGES`]
    pub stage_index: usize,
    /// Stage display name
    pub stage_name: String,
    /// Stage description
    pub description: String,
    /// Overall progress (0-100)
    pub progress: u8,
    /// Sum of the estimated durations of the stages still to come
    pub estimated_time_remaining: Duration,
}

/// Tracks the current stage of one run
///
/// Only moves forward, so reported progress never decreases.
#[derive(Debug)]
pub struct StageTracker {
    stages: &'static [GenerationStage],
    current: usize,
    last_progress: u8,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    /// Start at the first stage of the catalog
    #[must_use]
    pub fn new() -> Self {
        Self::with_stages(&STAGES)
    }

    /// Track a custom catalog. The catalog must not be empty.
    #[must_use]
    pub fn with_stages(stages: &'static [GenerationStage]) -> Self {
        debug_assert!(!stages.is_empty(), "stage catalog must not be empty");
        Self {
            stages,
            current: 0,
            last_progress: 0,
        }
    }

    /// The current stage
    #[must_use]
    pub fn current(&self) -> &GenerationStage {
        &self.stages[self.current]
    }

    /// Index of the current stage
    #[must_use]
    pub fn index(&self) -> usize {
        self.current
    }

    /// Whether timed advancement may move on
    ///
    /// The last stage is reserved for the accepted response, so the timer
    /// stops one short of it.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.current + 2 < self.stages.len()
    }

    /// Move to the next stage if timed advancement allows it
    pub fn advance(&mut self) -> Option<StageProgress> {
        if !self.can_advance() {
            return None;
        }
        self.current += 1;
        Some(self.report())
    }

    /// Jump to the final stage
    pub fn finish(&mut self) -> StageProgress {
        self.current = self.stages.len() - 1;
        self.report()
    }

    /// Build a progress report for the current stage
    pub fn report(&mut self) -> StageProgress {
        let stage = self.current();
        let progress = stage.target_progress.max(self.last_progress).min(100);
        let remaining = self.stages[self.current + 1..]
            .iter()
            .map(|s| s.estimated_duration)
            .sum();

        let report = StageProgress {
            stage_index: self.current,
            stage_name: stage.name.to_string(),
            description: stage.description.to_string(),
            progress,
            estimated_time_remaining: remaining,
        };
        self.last_progress = progress;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_monotonic() {
        assert_eq!(STAGES.len(), 10);
        assert_eq!(STAGES[0].target_progress, 0);
        assert_eq!(STAGES[STAGES.len() - 1].target_progress, 100);
        for pair in STAGES.windows(2) {
            assert!(pair[0].target_progress <= pair[1].target_progress);
        }
    }

    #[test]
    fn test_timed_advance_stops_before_final_stage() {
        let mut tracker = StageTracker::new();
        let mut reports = Vec::new();
        while let Some(report) = tracker.advance() {
            reports.push(report);
        }

        assert_eq!(reports.len(), STAGES.len() - 2);
        assert_eq!(tracker.index(), STAGES.len() - 2);
        assert!(reports.iter().all(|r| r.progress < 100));
    }

    #[test]
    fn test_finish_reports_complete() {
        let mut tracker = StageTracker::new();
        tracker.advance();
        let report = tracker.finish();
        assert_eq!(report.progress, 100);
        assert_eq!(report.estimated_time_remaining, Duration::ZERO);
        assert_eq!(report.stage_name, "Finalizing output");
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut tracker = StageTracker::new();
        let mut last = tracker.report().progress;
        while let Some(report) = tracker.advance() {
            assert!(report.progress >= last);
            last = report.progress;
        }
        assert!(tracker.finish().progress >= last);
    }

    #[test]
    fn test_remaining_time_counts_later_stages() {
        let mut tracker = StageTracker::new();
        let first = tracker.report();
        let expected: Duration = STAGES[1..].iter().map(|s| s.estimated_duration).sum();
        assert_eq!(first.estimated_time_remaining, expected);
    }
}
