//! Sextet hash stage: `A("0"+x) + A("1"+x) + ... + A("5"+x)` per item.

use super::guarded;
use crate::core::hasher::HashProvider;
use crate::core::item::Item;
use crate::core::pipeline::{Stage, StageContext};
use crate::core::relay::{RelayReceiver, RelaySender};
use crate::error::{panic_message, HashError, RelayError, Result};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Fans each item out into `sextet_width` indexed fast-hash calls.
///
/// Every call gets its own scoped thread, so all of them are in flight
/// at once; their results are joined in index order regardless of which
/// finishes first. Items still leave the stage in completion order.
///
/// An item in flight costs `sextet_width + 1` OS threads; the stage has
/// the same thread-limit ceiling as [`PairHashStage`](super::PairHashStage).
pub struct SextetHashStage {
    provider: Arc<dyn HashProvider>,
}

impl SextetHashStage {
    pub fn new(provider: Arc<dyn HashProvider>) -> Self {
        Self { provider }
    }

    fn sign_item(&self, ctx: &StageContext, item: Item, output: &RelaySender) -> Result<()> {
        // tasks spawned just before a fault skip their hashing
        if ctx.is_cancelled() {
            return Err(RelayError::Cancelled.into());
        }
        let text = item.into_text()?;
        let text = text.as_str();
        let width = ctx.config().sextet_width;
        debug!(stage = ctx.name(), data = %text, width, "sextet input");

        let parts = thread::scope(|scope| -> std::result::Result<Vec<String>, HashError> {
            let calls: Vec<_> = (0..width)
                .map(|index| {
                    scope.spawn(move || -> std::result::Result<String, HashError> {
                        let hash =
                            guarded("hash_a", || self.provider.hash_a(&format!("{index}{text}")))?;
                        debug!(index, hash = %hash, "hash_a(index+data)");
                        Ok(hash)
                    })
                })
                .collect();

            // joined by position, not by completion
            calls
                .into_iter()
                .map(|call| {
                    call.join().unwrap_or_else(|payload| {
                        Err(HashError::Panicked {
                            function: "hash_a",
                            message: panic_message(payload.as_ref()),
                        })
                    })
                })
                .collect()
        })?;

        let signed = parts.concat();
        debug!(stage = ctx.name(), result = %signed, "sextet result");
        output.send(Item::Text(signed))?;
        Ok(())
    }
}

impl Stage for SextetHashStage {
    fn name(&self) -> &str {
        "sextet-hash"
    }

    fn run(&self, ctx: &StageContext, input: RelayReceiver, output: &RelaySender) -> Result<()> {
        let tasks = ctx.task_group();
        let received = thread::scope(|scope| -> Result<()> {
            while let Some(item) = input.recv()? {
                let output = output.clone();
                scope.spawn(tasks.task(move || self.sign_item(ctx, item, &output)));
            }
            Ok(())
        });
        tasks.finish(received)
    }
}
