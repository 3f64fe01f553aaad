//! # Throttle Module
//!
//! A counting permit pool guarding calls to the slow hash.
//!
//! Permits are tokens in a crossbeam bounded channel, pre-seeded at
//! construction. Acquiring takes a token out; dropping the
//! [`ThrottlePermit`] puts it back. With one permit, at most one guarded
//! call runs at any instant for the lifetime of the throttle.
//!
//! Acquisition gives up when the run is cancelled, or when no permit has
//! been released for the configured timeout. The timeout is a stall
//! watchdog: a long queue that keeps moving never trips it, a permit that
//! is never released surfaces as a [`ThrottleError::Timeout`] instead of
//! a hang.

use crate::core::relay::CancellationToken;
use crate::error::ThrottleError;
use crate::events::{null_sender, Event, EventSender, ThrottleEvent};
use crossbeam_channel::{after, bounded, never, select, Receiver, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

/// Shared permit pool
pub struct Throttle {
    release: Sender<()>,
    pool: Receiver<()>,
    permits: usize,
    timeout: Option<Duration>,
    last_release: Mutex<Instant>,
    events: EventSender,
}

impl Throttle {
    /// Create a throttle with `permits` tokens available up front.
    ///
    /// `permits` must be at least 1; the pipeline config enforces this.
    pub fn new(permits: usize, timeout: Option<Duration>) -> Self {
        let (release, pool) = bounded(permits);
        for _ in 0..permits {
            let _ = release.try_send(());
        }
        Self {
            release,
            pool,
            permits,
            timeout,
            last_release: Mutex::new(Instant::now()),
            events: null_sender(),
        }
    }

    /// Report acquisitions on this event channel
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Total number of permits
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Permits currently held
    pub fn in_use(&self) -> usize {
        self.permits.saturating_sub(self.pool.len())
    }

    /// Wait for a permit.
    ///
    /// With a timeout set, fails once the caller has waited that long
    /// without any permit being released.
    pub fn acquire(&self, cancel: &CancellationToken) -> Result<ThrottlePermit<'_>, ThrottleError> {
        if cancel.is_cancelled() {
            return Err(ThrottleError::Cancelled);
        }

        let start = Instant::now();
        loop {
            let deadline = match self.timeout {
                Some(timeout) => {
                    let stalled = self.progress_since(start).elapsed();
                    if stalled >= timeout {
                        if self.pool.try_recv().is_ok() {
                            break;
                        }
                        return Err(ThrottleError::Timeout {
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    after(timeout - stalled)
                }
                None => never(),
            };

            select! {
                recv(self.pool) -> token => {
                    token.map_err(|_| ThrottleError::Cancelled)?;
                    break;
                }
                recv(cancel.signal()) -> _ => return Err(ThrottleError::Cancelled),
                recv(deadline) -> _ => {}
            }
        }

        let waited_ms = start.elapsed().as_millis() as u64;
        trace!(waited_ms, "throttle permit acquired");
        self.events
            .send(Event::Throttle(ThrottleEvent::Acquired { waited_ms }));

        Ok(ThrottlePermit { throttle: self })
    }

    /// Run `call` while holding a permit, releasing it as soon as the call returns.
    pub fn run<T>(
        &self,
        cancel: &CancellationToken,
        call: impl FnOnce() -> T,
    ) -> Result<T, ThrottleError> {
        let permit = self.acquire(cancel)?;
        let result = call();
        drop(permit);
        Ok(result)
    }
}

impl Throttle {
    /// Latest of `start` and the most recent permit release
    fn progress_since(&self, start: Instant) -> Instant {
        let released = *self
            .last_release
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        released.max(start)
    }

    fn return_permit(&self) {
        *self
            .last_release
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
        let _ = self.release.try_send(());
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("permits", &self.permits)
            .field("in_use", &self.in_use())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A held permit; released on drop, including during unwinding.
pub struct ThrottlePermit<'a> {
    throttle: &'a Throttle,
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        self.throttle.return_permit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn permits_are_preseeded() {
        let throttle = Throttle::new(2, None);
        let cancel = CancellationToken::new();

        let first = throttle.acquire(&cancel).unwrap();
        let second = throttle.acquire(&cancel).unwrap();
        assert_eq!(throttle.in_use(), 2);

        drop(first);
        drop(second);
        assert_eq!(throttle.in_use(), 0);
    }

    #[test]
    fn exhausted_throttle_times_out() {
        let throttle = Throttle::new(1, Some(Duration::from_millis(30)));
        let cancel = CancellationToken::new();

        let _held = throttle.acquire(&cancel).unwrap();
        let outcome = throttle.acquire(&cancel).map(|_| ());
        match outcome {
            Err(ThrottleError::Timeout { waited_ms }) => assert!(waited_ms >= 25),
            _ => panic!("expected a timeout"),
        }
    }

    #[test]
    fn busy_queue_outlasts_the_timeout() {
        // every caller waits far longer than the timeout in total, but a
        // permit comes back well within it each time
        let throttle = Arc::new(Throttle::new(1, Some(Duration::from_millis(60))));
        let cancel = CancellationToken::new();

        let workers: Vec<_> = (0..10)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                let cancel = cancel.clone();
                thread::spawn(move || {
                    throttle.run(&cancel, || thread::sleep(Duration::from_millis(15)))
                })
            })
            .collect();

        for worker in workers {
            assert!(worker.join().unwrap().is_ok());
        }
    }

    #[test]
    fn cancel_wakes_a_waiting_acquire() {
        let throttle = Arc::new(Throttle::new(1, None));
        let cancel = CancellationToken::new();
        let held = throttle.acquire(&cancel).unwrap();

        let waiter = {
            let throttle = Arc::clone(&throttle);
            let cancel = cancel.clone();
            thread::spawn(move || throttle.acquire(&cancel).map(|_| ()))
        };

        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        assert!(matches!(
            waiter.join().unwrap(),
            Err(ThrottleError::Cancelled)
        ));
        drop(held);
    }

    #[test]
    fn permit_is_returned_when_the_call_panics() {
        let throttle = Throttle::new(1, Some(Duration::from_millis(100)));
        let cancel = CancellationToken::new();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = throttle.run(&cancel, || panic!("provider blew up"));
        }));
        assert!(outcome.is_err());
        assert_eq!(throttle.in_use(), 0);
        assert!(throttle.acquire(&cancel).is_ok());
    }

    #[test]
    fn single_permit_serializes_callers() {
        let throttle = Arc::new(Throttle::new(1, None));
        let cancel = CancellationToken::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                let cancel = cancel.clone();
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    throttle
                        .run(&cancel, || {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(2));
                            active.fetch_sub(1, Ordering::SeqCst);
                        })
                        .unwrap();
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
