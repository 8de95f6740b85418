//! Time sources the replay yields to between events and while awaiting arrival.

use std::{thread, time::Duration};

/// Default interval between two arrival polls.
pub const DEFAULT_FRAME: Duration = Duration::from_millis(16);

/// Suspends the replay between events and between arrival polls.
///
/// A frame-driven host implements this by yielding to its render loop; the
/// headless CLI sleeps the thread; tests return immediately.
pub trait Pacer {
    /// Waits for the fixed inter-event delay.
    fn pause(&mut self, delay: Duration);

    /// Waits for the next presentation frame before the agent position is polled again.
    fn wait_frame(&mut self);
}

/// Pacer that blocks the calling thread.
#[derive(Clone, Copy, Debug)]
pub struct ThreadPacer {
    frame: Duration,
}

impl ThreadPacer {
    /// Creates a pacer that sleeps for `frame` between arrival polls.
    #[must_use]
    pub const fn new(frame: Duration) -> Self {
        Self { frame }
    }
}

impl Default for ThreadPacer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME)
    }
}

impl Pacer for ThreadPacer {
    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    fn wait_frame(&mut self) {
        thread::sleep(self.frame);
    }
}

/// Pacer that never waits.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstantPacer;

impl Pacer for InstantPacer {
    fn pause(&mut self, _delay: Duration) {}

    fn wait_frame(&mut self) {}
}
