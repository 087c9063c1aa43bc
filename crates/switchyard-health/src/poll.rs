//! Bounded polling with cooperative cancellation.
//!
//! `poll_until` runs a step up to `attempts` times, sleeping `interval`
//! between attempts. A step either finishes the poll, asks for another
//! round, or fails it. Every sleep also watches the cancellation signal.

use std::future::Future;
use std::time::Duration;

use switchyard_core::config::PollingSection;
use tokio::sync::watch;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Upper bound on the time spent sleeping.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.attempts
    }
}

/// Locate and rollout cadences of the orchestrated monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Finding the deployment a service update triggered.
    pub locate: PollPolicy,
    /// Waiting for that deployment to finish.
    pub rollout: PollPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollingSection::default())
    }
}

impl From<&PollingSection> for PollSettings {
    fn from(section: &PollingSection) -> Self {
        Self {
            locate: PollPolicy::new(section.locate_attempts, section.locate_interval()),
            rollout: PollPolicy::new(section.poll_attempts, section.poll_interval()),
        }
    }
}

/// Outcome of one poll attempt.
#[derive(Debug)]
pub enum PollStep<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// Every attempt returned `Pending`.
    Exhausted { attempts: u32 },
    Cancelled,
    Failed(E),
}

/// Cancellation signal threaded through every suspend point of a run.
///
/// Wraps an optional `watch::Receiver<bool>`; `true` means cancel. Without
/// a receiver, or after the sender is dropped, it never fires.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Option<watch::Receiver<bool>>);

impl CancelSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self(Some(rx))
    }

    pub fn never() -> Self {
        Self(None)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&mut self) {
        if let Some(rx) = self.0.as_mut() {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
        std::future::pending::<()>().await
    }

    /// Sleep for `duration`, returning `false` if cancelled first.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}

/// Run `step` until it is ready, it fails, attempts run out, or the run is
/// cancelled. `step` receives the 1-based attempt number.
pub async fn poll_until<T, E, F, Fut>(
    policy: PollPolicy,
    cancel: &mut CancelSignal,
    mut step: F,
) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStep<T>, E>>,
{
    for attempt in 1..=policy.attempts {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }
        match step(attempt).await {
            Ok(PollStep::Ready(value)) => return Ok(value),
            Ok(PollStep::Pending) => {}
            Err(e) => return Err(PollError::Failed(e)),
        }
        if attempt < policy.attempts && !cancel.sleep(policy.interval).await {
            return Err(PollError::Cancelled);
        }
    }
    Err(PollError::Exhausted {
        attempts: policy.attempts,
    })
}
