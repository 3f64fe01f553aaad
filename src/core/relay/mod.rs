//! # Relay Module
//!
//! Bounded conduits between adjacent pipeline stages.
//!
//! A relay is a crossbeam bounded channel plus the run's
//! [`CancellationToken`]:
//! - a full relay blocks the sender (backpressure)
//! - an empty, open relay blocks the receiver
//! - a drained relay whose senders are all gone reports end-of-sequence
//! - cancelling the run wakes both sides with [`RelayError::Cancelled`]

mod cancel;

pub use cancel::CancellationToken;

use crate::core::item::Item;
use crate::error::RelayError;
use crate::events::{null_sender, Event, EventSender, StageEvent};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Factory for relay endpoints.
pub struct Relay;

impl Relay {
    /// Create a relay holding at most `capacity` items in flight.
    ///
    /// `capacity` must be at least 1; the pipeline config enforces this.
    pub fn new(capacity: usize, cancel: &CancellationToken) -> (RelaySender, RelayReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            RelaySender {
                inner: sender,
                cancel: cancel.clone(),
                label: Arc::from("relay"),
                events: null_sender(),
                sent: Arc::new(AtomicUsize::new(0)),
            },
            RelayReceiver {
                inner: receiver,
                cancel: cancel.clone(),
            },
        )
    }

    /// A relay that is already closed and empty.
    ///
    /// Used as the input of the first stage in a run.
    pub fn closed(cancel: &CancellationToken) -> RelayReceiver {
        let (sender, receiver) = Self::new(1, cancel);
        sender.close();
        receiver
    }
}

/// Writing end of a relay.
///
/// Clones share the same relay; the relay closes when the last clone is
/// dropped or closed.
#[derive(Clone)]
pub struct RelaySender {
    inner: Sender<Item>,
    cancel: CancellationToken,
    label: Arc<str>,
    events: EventSender,
    sent: Arc<AtomicUsize>,
}

impl RelaySender {
    /// Attribute sends on this relay to a stage for event reporting
    pub(crate) fn labelled(mut self, label: &str, events: EventSender) -> Self {
        self.label = Arc::from(label);
        self.events = events;
        self
    }

    /// Send an item, blocking while the relay is full.
    pub fn send(&self, item: Item) -> Result<(), RelayError> {
        if self.cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }

        select! {
            send(self.inner, item) -> sent => {
                sent.map_err(|_| RelayError::Disconnected)?;
            }
            recv(self.cancel.signal()) -> _ => return Err(RelayError::Cancelled),
        }

        self.sent.fetch_add(1, Ordering::SeqCst);
        self.events.send(Event::Stage(StageEvent::ItemEmitted {
            stage: self.label.to_string(),
        }));
        Ok(())
    }

    /// Items successfully sent through this relay, across all clones
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    /// Shared handle on the sent counter, readable after the sender is gone
    pub(crate) fn sent_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.sent)
    }

    /// Give up this handle on the relay.
    ///
    /// Once every clone is closed the receiver sees end-of-sequence.
    pub fn close(self) {
        drop(self);
    }
}

/// Reading end of a relay.
pub struct RelayReceiver {
    inner: Receiver<Item>,
    cancel: CancellationToken,
}

impl RelayReceiver {
    /// Receive the next item.
    ///
    /// Returns `Ok(None)` once the relay is closed and drained.
    pub fn recv(&self) -> Result<Option<Item>, RelayError> {
        if self.cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }

        select! {
            recv(self.inner) -> item => Ok(item.ok()),
            recv(self.cancel.signal()) -> _ => Err(RelayError::Cancelled),
        }
    }

    /// Collect everything until end-of-sequence
    pub fn drain(&self) -> Result<Vec<Item>, RelayError> {
        let mut items = Vec::new();
        while let Some(item) = self.recv()? {
            items.push(item);
        }
        Ok(items)
    }

    /// Second handle that keeps the relay's receiving side connected
    pub(crate) fn keepalive(&self) -> RelayReceiver {
        RelayReceiver {
            inner: self.inner.clone(),
            cancel: self.cancel.clone(),
        }
    }
}
