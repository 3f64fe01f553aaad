//! Merge stage: sort everything, join it, emit once.

use crate::core::item::Item;
use crate::core::pipeline::{Stage, StageContext};
use crate::core::relay::{RelayReceiver, RelaySender};
use crate::error::Result;
use rayon::prelude::*;
use tracing::info;

/// Collects the whole input, sorts it lexicographically and emits one
/// joined value.
///
/// This is the only point where the run's output order is fixed, so the
/// final value does not depend on thread scheduling. Empty input yields
/// an empty string.
#[derive(Debug, Default)]
pub struct MergeStage;

impl MergeStage {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for MergeStage {
    fn name(&self) -> &str {
        "merge"
    }

    fn run(&self, ctx: &StageContext, input: RelayReceiver, output: &RelaySender) -> Result<()> {
        let mut values = Vec::new();
        while let Some(item) = input.recv()? {
            values.push(item.into_text()?);
        }

        values.par_sort_unstable();
        let merged = values.join(&ctx.config().merge_separator);
        info!(
            stage = ctx.name(),
            index = ctx.index(),
            values = values.len(),
            "merge result ready"
        );
        output.send(Item::Text(merged))?;
        Ok(())
    }
}
