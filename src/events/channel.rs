//! Event channel implementation using crossbeam-channel.
//!
//! Stage threads, item tasks and the executor all hold clones of the
//! same sender; whoever owns the receiver sees every event of the run.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sends events from a pipeline run.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event.
    ///
    /// If the receiver is dropped, the event is silently discarded.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receives events from a pipeline run.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Returns an iterator over received events
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for event sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create a new unbounded event channel.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose receiver is already gone.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, StageEvent};
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Stage(StageEvent::ItemEmitted {
                stage: "pair-hash".to_string(),
            }));
        });

        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Stage(StageEvent::ItemEmitted { stage }) => assert_eq!(stage, "pair-hash"),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Cancelled));
    }

    #[test]
    fn receiver_iterator_ends_when_senders_drop() {
        let (sender, receiver) = EventChannel::new();
        sender.send(Event::Pipeline(PipelineEvent::Cancelled));
        sender.send(Event::Pipeline(PipelineEvent::Cancelled));
        drop(sender);

        assert_eq!(receiver.iter().count(), 2);
        assert!(receiver.recv().is_none());
    }
}
