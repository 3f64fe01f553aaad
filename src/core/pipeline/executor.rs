//! Pipeline execution implementation.

use super::{PipelineConfig, Stage, StageContext};
use crate::core::item::Item;
use crate::core::relay::{CancellationToken, Relay};
use crate::core::throttle::Throttle;
use crate::error::{panic_message, PipelineError, Result, SignerError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelineSummary};
use crossbeam_channel::unbounded;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// Result of pipeline execution
#[derive(Debug)]
pub struct RunOutput {
    /// Items the last stage emitted, in the order they arrived
    pub items: Vec<Item>,
    /// Run summary
    pub summary: PipelineSummary,
}

/// Builder for a pipeline
pub struct PipelineBuilder {
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            stages: Vec::new(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the relay capacity
    pub fn relay_capacity(mut self, capacity: usize) -> Self {
        self.config.relay_capacity = capacity;
        self
    }

    /// Set the number of throttle permits
    pub fn throttle_permits(mut self, permits: usize) -> Self {
        self.config.throttle_permits = permits;
        self
    }

    /// Append a stage
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Validate the configuration and build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;
        if self.stages.is_empty() {
            return Err(PipelineError::EmptyPipeline.into());
        }
        Ok(Pipeline {
            config: Arc::new(self.config),
            stages: self.stages,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered list of stages connected by bounded relays.
///
/// Each run creates fresh relays, a fresh throttle and one thread per
/// stage. The first stage reads from an already-closed relay; whatever
/// the last stage writes is collected into [`RunOutput::items`].
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The configuration runs use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage names, in order
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<RunOutput> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunOutput> {
        self.run_with_cancel(events, &CancellationToken::new())
    }

    /// Run the pipeline until it completes, faults, or `cancel` fires.
    ///
    /// Blocks until every stage thread has finished. The first fault
    /// cancels every other stage and is returned; nothing the last stage
    /// produced is returned after a fault.
    pub fn run_with_cancel(
        &self,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<RunOutput> {
        let start_time = Instant::now();
        let names = self.stage_names();
        let throttle = Arc::new(
            Throttle::new(self.config.throttle_permits, self.config.throttle_timeout())
                .with_events(events.clone()),
        );
        info!(stages = ?names, permits = throttle.permits(), "pipeline started");
        events.send(Event::Pipeline(PipelineEvent::Started {
            stages: names.clone(),
        }));
        let (done_tx, done_rx) = unbounded::<(usize, Result<()>)>();

        let (outcome, collected) = thread::scope(|scope| {
            let mut input = Relay::closed(cancel);
            let mut counters = Vec::with_capacity(self.stages.len());

            for (index, stage) in self.stages.iter().enumerate() {
                let (output, next_input) = Relay::new(self.config.relay_capacity, cancel);
                let output = output.labelled(stage.name(), events.clone());
                counters.push(output.sent_counter());

                let ctx = StageContext::new(
                    index,
                    stage.name(),
                    cancel.clone(),
                    Arc::clone(&throttle),
                    Arc::clone(&self.config),
                );
                let stage_input = std::mem::replace(&mut input, next_input);
                let done = done_tx.clone();

                scope.spawn(move || {
                    // upstream must not see a dropped receiver before this
                    // stage's outcome is queued
                    let keepalive = stage_input.keepalive();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        stage.run(&ctx, stage_input, &output)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(PipelineError::StagePanicked {
                            stage: stage.name().to_string(),
                            message: panic_message(payload.as_ref()),
                        }
                        .into())
                    });

                    // close the relay first, then report the stage done
                    output.close();
                    let _ = done.send((index, result));
                    drop(keepalive);
                });
            }
            drop(done_tx);

            // the last relay drains into the caller
            let sink = scope.spawn(move || input.drain());

            let mut first_error: Option<SignerError> = None;
            for (index, result) in done_rx.iter() {
                match result {
                    Ok(()) => {
                        events.send(Event::Pipeline(PipelineEvent::StageFinished {
                            index,
                            name: names[index].clone(),
                            emitted: counters[index].load(Ordering::SeqCst),
                        }));
                    }
                    Err(error) => {
                        if !error.is_cancellation() {
                            warn!(stage = %names[index], %error, "stage failed, cancelling run");
                        }
                        let replace = match first_error.as_ref() {
                            None => true,
                            Some(existing) => {
                                existing.is_cancellation() && !error.is_cancellation()
                            }
                        };
                        if replace {
                            first_error = Some(error);
                        }
                        cancel.cancel();
                    }
                }
            }

            let collected: Result<Vec<Item>> = match sink.join() {
                Ok(drained) => drained.map_err(SignerError::from),
                Err(payload) => Err(PipelineError::StagePanicked {
                    stage: "sink".to_string(),
                    message: panic_message(payload.as_ref()),
                }
                .into()),
            };
            (first_error, collected)
        });

        let duration_ms = start_time.elapsed().as_millis() as u64;

        if let Some(error) = outcome {
            if error.is_cancellation() {
                warn!(duration_ms, "pipeline cancelled");
                events.send(Event::Pipeline(PipelineEvent::Cancelled));
                return Err(PipelineError::Cancelled.into());
            }
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: error.to_string(),
            }));
            return Err(error);
        }

        let items = match collected {
            Ok(items) => items,
            Err(error) => {
                if error.is_cancellation() {
                    events.send(Event::Pipeline(PipelineEvent::Cancelled));
                    return Err(PipelineError::Cancelled.into());
                }
                return Err(error);
            }
        };

        let summary = PipelineSummary {
            stages: self.stages.len(),
            output_items: items.len(),
            duration_ms,
        };
        info!(
            output_items = summary.output_items,
            duration_ms, "pipeline completed"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: summary.clone(),
        }));

        Ok(RunOutput { items, summary })
    }
}
