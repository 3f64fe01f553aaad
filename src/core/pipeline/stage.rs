//! Stage abstraction.

use super::StageContext;
use crate::core::item::Item;
use crate::core::relay::{RelayReceiver, RelaySender};
use crate::error::Result;
use std::sync::Mutex;
use tracing::{debug, warn};

/// One position in a pipeline.
///
/// A stage reads items from `input` until end-of-sequence and writes
/// results to `output`. It must not return while any task it spawned
/// can still write to `output`; the executor closes the output relay as
/// soon as `run` returns.
pub trait Stage: Send + Sync {
    /// Name used in events and logs
    fn name(&self) -> &str;

    /// Process the stage's whole input
    fn run(&self, ctx: &StageContext, input: RelayReceiver, output: &RelaySender) -> Result<()>;
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, ctx: &StageContext, input: RelayReceiver, output: &RelaySender) -> Result<()> {
        (**self).run(ctx, input, output)
    }
}

/// A stage built from a closure.
pub struct FnStage<F> {
    name: String,
    body: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageContext, RelayReceiver, &RelaySender) -> Result<()> + Send + Sync,
{
    /// Create a named stage from `body`
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&StageContext, RelayReceiver, &RelaySender) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &StageContext, input: RelayReceiver, output: &RelaySender) -> Result<()> {
        (self.body)(ctx, input, output)
    }
}

type BoxedItems = Box<dyn Iterator<Item = Item> + Send>;

/// Source stage that feeds an iterator into the pipeline.
///
/// The iterator is consumed by the first run; later runs emit nothing.
pub struct IterSource {
    items: Mutex<Option<BoxedItems>>,
}

impl IterSource {
    /// Create a source over `items`
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Item> + 'static,
        I::IntoIter: Send + 'static,
    {
        let items: BoxedItems = Box::new(items.into_iter().map(Into::into));
        Self {
            items: Mutex::new(Some(items)),
        }
    }
}

impl Stage for IterSource {
    fn name(&self) -> &str {
        "source"
    }

    fn run(&self, _ctx: &StageContext, _input: RelayReceiver, output: &RelaySender) -> Result<()> {
        let items = self
            .items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        let Some(items) = items else {
            warn!("source already consumed by an earlier run");
            return Ok(());
        };

        for item in items {
            debug!(?item, "source item");
            output.send(item)?;
        }
        Ok(())
    }
}
