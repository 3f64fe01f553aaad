//! Run-wide cancellation signal.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

/// Shared flag that tears a run down.
///
/// Internally a channel that never carries a message: cancelling drops the
/// only sender, which disconnects every clone of the receiver. Blocking
/// operations wait on that receiver alongside their real work with
/// `select!`, so cancellation wakes every suspended task at once.
#[derive(Clone)]
pub struct CancellationToken {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(trigger))),
            signal,
        }
    }

    /// Cancel the run. Idempotent.
    pub fn cancel(&self) {
        let mut trigger = self
            .trigger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        trigger.take();
    }

    /// Whether `cancel` has been called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) once cancelled
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::select;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn new_token_is_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_wakes_a_blocked_select() {
        let token = CancellationToken::new();
        let (_tx, never) = bounded::<()>(0);

        let waiter = {
            let token = token.clone();
            thread::spawn(move || {
                select! {
                    recv(never) -> _ => false,
                    recv(token.signal()) -> _ => true,
                }
            })
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(waiter.join().unwrap());
    }
}
