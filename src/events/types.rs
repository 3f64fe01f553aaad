//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Run-level events
    Pipeline(PipelineEvent),
    /// Per-stage item flow
    Stage(StageEvent),
    /// Slow-hash throttle activity
    Throttle(ThrottleEvent),
}

/// Run-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// The run has started with these stages, in order
    Started { stages: Vec<String> },
    /// A stage returned and its output relay has been closed
    StageFinished {
        index: usize,
        name: String,
        emitted: usize,
    },
    /// All stages finished successfully
    Completed { summary: PipelineSummary },
    /// The run was cancelled from outside
    Cancelled,
    /// The run was aborted by a fault
    Error { message: String },
}

/// Item flow within a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    /// A stage wrote one item to its output relay
    ItemEmitted { stage: String },
}

/// Throttle activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ThrottleEvent {
    /// A permit was granted after waiting this long
    Acquired { waited_ms: u64 },
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Number of stages that ran
    pub stages: usize,
    /// Items that came out of the last stage
    pub output_items: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Pipeline(PipelineEvent::StageFinished {
            index: 2,
            name: "sextet-hash".to_string(),
            emitted: 17,
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Pipeline(PipelineEvent::StageFinished { index, name, emitted }) => {
                assert_eq!(index, 2);
                assert_eq!(name, "sextet-hash");
                assert_eq!(emitted, 17);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn pipeline_summary_is_serializable() {
        let summary = PipelineSummary {
            stages: 5,
            output_items: 1,
            duration_ms: 1250,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("1250"));
    }
}
