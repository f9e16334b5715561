use std::time::{Duration, Instant};

/// Repeating deadline used for liveness checks.
///
/// The timer does not run on its own; the owning event loop calls
/// [`poll`](AliveTimer::poll) with the current time. A [`reset`](AliveTimer::reset)
/// both records that the peer proved itself alive and pushes the next firing
/// one full interval out.
#[derive(Debug, Clone)]
pub struct AliveTimer {
    interval: Option<Duration>,
    deadline: Option<Instant>,
    was_reset: bool,
}

impl AliveTimer {
    /// A stopped timer. `None` creates a timer that never fires.
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            deadline: None,
            was_reset: false,
        }
    }

    /// Arm the timer from `now` and clear the reset flag.
    pub fn start(&mut self, now: Instant) {
        self.deadline = self.interval.map(|interval| now + interval);
        self.was_reset = false;
    }

    pub fn stop(&mut self) {
        self.deadline = None;
        self.was_reset = false;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Mark the peer alive. No effect on a stopped timer.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        if let (Some(interval), Some(_)) = (self.interval, self.deadline) {
            self.deadline = Some(now + interval);
            self.was_reset = true;
        }
    }

    /// Returns `true` once per elapsed interval and re-arms.
    pub fn poll(&mut self, now: Instant) -> bool {
        match (self.interval, self.deadline) {
            (Some(interval), Some(deadline)) if now >= deadline => {
                self.deadline = Some(now + interval);
                true
            }
            _ => false,
        }
    }

    /// Whether a reset happened since the last call, clearing the flag.
    pub fn take_reset(&mut self) -> bool {
        std::mem::take(&mut self.was_reset)
    }
}
