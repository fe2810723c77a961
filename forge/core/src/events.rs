//! Controller Events
//!
//! Everything a surface needs to draw a run arrives as a [`ForgeEvent`] on the
//! controller's channel. Events are tagged with the [`RunId`] that produced
//! them; a surface that sees a newer run can drop stale updates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::CodeArtifact;
use crate::messages::ChatMessage;
use crate::renderer::LiveCodingState;
use crate::stages::StageProgress;

/// Identifies one generation run within a controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl RunId {
    /// The run after this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// How a run ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every artifact was revealed and committed
    Completed {
        /// Artifacts committed
        artifacts: usize,
    },
    /// The token was cancelled; earlier commits stay
    Cancelled {
        /// Artifacts committed before cancellation
        committed: usize,
    },
    /// The run failed and an error message was appended
    Failed {
        /// User-facing error text
        error: String,
    },
    /// The input was empty; nothing was sent
    Rejected,
}

/// Controller to surface
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForgeEvent {
    /// A submission was accepted and a run started
    RunStarted {
        /// Run
        run_id: RunId,
        /// Text as the user typed it
        prompt: String,
    },

    /// Stage progress while the backend works
    Stage {
        /// Run
        run_id: RunId,
        /// Current stage
        progress: StageProgress,
    },

    /// Live-typing snapshot
    LiveCoding {
        /// Run
        run_id: RunId,
        /// Snapshot of the reveal
        state: LiveCodingState,
    },

    /// An artifact finished revealing and was committed
    ArtifactCommitted {
        /// Run
        run_id: RunId,
        /// The committed artifact
        artifact: CodeArtifact,
    },

    /// A message was appended to the transcript
    Message {
        /// The appended message
        message: ChatMessage,
    },

    /// The run is over
    RunFinished {
        /// Run
        run_id: RunId,
        /// Result
        outcome: RunOutcome,
    },
}

impl ForgeEvent {
    /// Run this event belongs to, if any
    #[must_use]
    pub fn run_id(&self) -> Option<RunId> {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::Stage { run_id, .. }
            | Self::LiveCoding { run_id, .. }
            | Self::ArtifactCommitted { run_id, .. }
            | Self::RunFinished { run_id, .. } => Some(*run_id),
            Self::Message { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_increase() {
        let first = RunId(0);
        assert!(first.next() > first);
        assert_eq!(first.next().to_string(), "run-1");
    }

    #[test]
    fn test_event_shape() {
        let event = ForgeEvent::RunFinished {
            run_id: RunId(3),
            outcome: RunOutcome::Cancelled { committed: 2 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "run_finished");
        assert_eq!(json["run_id"], 3);
        assert_eq!(json["outcome"]["outcome"], "cancelled");
        assert_eq!(json["outcome"]["committed"], 2);
        assert_eq!(event.run_id(), Some(RunId(3)));
    }
}
