//! Quiet-interval completion detection
//!
//! The number of entries is not known up front, so the crawl is declared
//! done once nothing has been emitted for the quiet interval. Emissions and
//! the deadline are observed from the same loop in [`CompletionDetector::next`]:
//! an emission can never be counted after the deadline that it should have
//! pushed back.
//!
//! ```ignore
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut detector = CompletionDetector::new(Duration::from_secs(5));
//!
//! while let Some(outcome) = detector.next(&mut rx).await {
//!     // handle outcome
//! }
//! println!("closed: {:?}", detector.close_reason());
//! ```

use std::time::Duration;

use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};

/// A value stamped with the instant it was emitted
#[derive(Debug, Clone)]
pub struct Emission<T> {
    pub emitted_at: Instant,
    pub value: T,
}

impl<T> Emission<T> {
    /// Stamp `value` with the current instant
    pub fn now(value: T) -> Self {
        Self {
            emitted_at: Instant::now(),
            value,
        }
    }
}

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Active,
    Closed,
}

/// Why the output queue was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Nothing was emitted for the quiet interval
    QuietInterval,
    /// Every producer finished and the queue drained
    Exhausted,
    /// The configured record limit was reached
    RecordLimit,
    /// The crawl was cancelled from outside
    Cancelled,
}

/// Closes the output queue after a quiet interval without emissions
#[derive(Debug)]
pub struct CompletionDetector {
    quiet_interval: Duration,
    deadline: Instant,
    close_reason: Option<CloseReason>,
}

impl CompletionDetector {
    /// Create an active detector armed to fire `quiet_interval` from now
    pub fn new(quiet_interval: Duration) -> Self {
        Self {
            quiet_interval,
            deadline: Instant::now() + quiet_interval,
            close_reason: None,
        }
    }

    /// Push the deadline to `quiet_interval` after `emitted_at`
    ///
    /// Has no effect once closed, and never moves the deadline backwards.
    pub fn rearm(&mut self, emitted_at: Instant) {
        if self.is_closed() {
            return;
        }
        let deadline = emitted_at + self.quiet_interval;
        if deadline > self.deadline {
            self.deadline = deadline;
        }
    }

    /// Transition to closed; the first reason wins
    pub fn close(&mut self, reason: CloseReason) {
        if self.close_reason.is_none() {
            tracing::debug!(?reason, "completion detector closed");
            self.close_reason = Some(reason);
        }
    }

    /// Receive the next emission, or `None` once closed
    ///
    /// Closes when the deadline passes with no emission, or when every
    /// sender has been dropped and the queue is empty. Emissions already
    /// queued are preferred over the timer, but one stamped after the
    /// deadline closes the detector instead of being delivered.
    pub async fn next<T>(&mut self, queue: &mut mpsc::UnboundedReceiver<Emission<T>>) -> Option<T> {
        if self.is_closed() {
            return None;
        }

        tokio::select! {
            biased;

            emission = queue.recv() => match emission {
                Some(emission) if emission.emitted_at > self.deadline => {
                    self.close(CloseReason::QuietInterval);
                    None
                }
                Some(emission) => {
                    self.rearm(emission.emitted_at);
                    Some(emission.value)
                }
                None => {
                    self.close(CloseReason::Exhausted);
                    None
                }
            },

            _ = sleep_until(self.deadline) => {
                self.close(CloseReason::QuietInterval);
                None
            }
        }
    }

    pub fn state(&self) -> DetectorState {
        if self.close_reason.is_some() {
            DetectorState::Closed
        } else {
            DetectorState::Active
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close_reason.is_some()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Instant at which the detector closes unless rearmed
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet_interval
    }
}
