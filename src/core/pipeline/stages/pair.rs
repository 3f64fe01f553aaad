//! Pair hash stage: `A(x) ~ A(B(x))` per item.

use super::guarded;
use crate::core::hasher::HashProvider;
use crate::core::item::Item;
use crate::core::pipeline::{Stage, StageContext};
use crate::core::relay::{RelayReceiver, RelaySender};
use crate::error::{panic_message, HashError, RelayError, Result};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Signs each item with its fast hash and the fast hash of its slow hash.
///
/// Every item gets its own task, and within it the two branches run
/// concurrently. Only the slow call is throttled; the permit is held for
/// that call alone. Results leave in completion order, not input order.
///
/// Each item in flight costs two OS threads. Inputs large enough to hit
/// the process thread limit make `Scope::spawn` panic, which fails the
/// run as [`PipelineError::StagePanicked`].
///
/// [`PipelineError::StagePanicked`]: crate::error::PipelineError::StagePanicked
pub struct PairHashStage {
    provider: Arc<dyn HashProvider>,
}

impl PairHashStage {
    pub fn new(provider: Arc<dyn HashProvider>) -> Self {
        Self { provider }
    }

    fn sign_item(&self, ctx: &StageContext, item: Item, output: &RelaySender) -> Result<()> {
        // tasks spawned just before a fault skip their hashing
        if ctx.is_cancelled() {
            return Err(RelayError::Cancelled.into());
        }
        let text = item.into_text()?;
        debug!(stage = ctx.name(), data = %text, "pair input");

        let (fast, slow) = thread::scope(|scope| -> Result<(String, String)> {
            let fast = scope.spawn(|| guarded("hash_a", || self.provider.hash_a(&text)));

            let slow = ctx
                .throttle()
                .run(ctx.cancel_token(), || {
                    guarded("hash_b", || self.provider.hash_b(&text))
                })??;
            debug!(stage = ctx.name(), slow = %slow, "hash_b(data)");
            let slow = guarded("hash_a", || self.provider.hash_a(&slow))?;
            debug!(stage = ctx.name(), slow = %slow, "hash_a(hash_b(data))");

            let fast = fast.join().unwrap_or_else(|payload| {
                Err(HashError::Panicked {
                    function: "hash_a",
                    message: panic_message(payload.as_ref()),
                })
            })?;
            debug!(stage = ctx.name(), fast = %fast, "hash_a(data)");

            Ok((fast, slow))
        })?;

        let signed = format!("{}{}{}", fast, ctx.config().pair_separator, slow);
        debug!(stage = ctx.name(), result = %signed, "pair result");
        output.send(Item::Text(signed))?;
        Ok(())
    }
}

impl Stage for PairHashStage {
    fn name(&self) -> &str {
        "pair-hash"
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
