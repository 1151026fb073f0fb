//! Update coalescing for rapid viewport changes.
//!
//! Continuous panning produces viewport notifications far faster than
//! re-projection is worth running. [`UpdateCoalescer`] is a trailing-edge
//! debounce: each notification replaces the pending viewport and re-arms a
//! single-shot deadline one quiescence window ahead; the projection runs
//! only once no new input has arrived for a full window. The last input of
//! a burst is therefore always eventually projected; intermediate inputs
//! are discardable by design.
//!
//! The clock is passed in explicitly, so scheduling is cooperative (the
//! host's frame loop or timer calls [`UpdateCoalescer::poll`]) and timing
//! behavior is testable without sleeping. `*_now` variants use
//! `Instant::now()`.

use crate::error::Result;
use crate::types::Viewport;
use std::time::{Duration, Instant};

/// Trailing-edge debouncer over `(bounds, zoom)` inputs.
#[derive(Debug)]
pub struct UpdateCoalescer {
    window: Duration,
    pending: Option<Viewport>,
    deadline: Option<Instant>,
}

impl UpdateCoalescer {
    /// Creates a coalescer with the given quiescence window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records a viewport change at `now`. Replaces any pending viewport
    /// and re-arms the deadline; the timer is single-shot, never stacked.
    pub fn notify(&mut self, viewport: Viewport, now: Instant) {
        self.pending = Some(viewport);
        self.deadline = Some(now + self.window);
    }

    pub fn notify_now(&mut self, viewport: Viewport) {
        self.notify(viewport, Instant::now());
    }

    /// Whether an input is waiting for its quiescence window to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending input becomes due, if any. Hosts integrating with a
    /// timer wheel can use this to schedule the next `poll`.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Takes the pending viewport if its window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Viewport> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    pub fn poll_now(&mut self) -> Option<Viewport> {
        self.poll(Instant::now())
    }

    /// Polls and, when due, runs `project` on the pending viewport.
    ///
    /// The projection runs outside the call stack of the event that armed
    /// the timer, so an error here has no caller to propagate to: it is
    /// logged and swallowed, and the pending input stays consumed (the next
    /// viewport change re-arms as usual).
    pub fn run_due<T, F>(&mut self, now: Instant, project: F) -> Option<T>
    where
        F: FnOnce(&Viewport) -> Result<T>,
    {
        let viewport = self.poll(now)?;
        match project(&viewport) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("deferred projection failed: {}", err);
                None
            }
        }
    }

    /// Drops the pending input and disarms the deadline. Must be called on
    /// teardown so a stale projection cannot fire after the consumer is
    /// gone.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
    }
}
