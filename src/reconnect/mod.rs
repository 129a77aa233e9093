use crate::transport::CloseReason;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    Idle,
    /// A retry timer is pending; further closes are ignored until it fires.
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Logged out: the session is over, never retry.
    Terminal,
    AlreadyScheduled,
    Schedule(Duration),
}

/// Fixed-interval retry with a single pending timer.
///
/// No backoff and no attempt cap: a network that never comes back is retried
/// forever at `delay`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    state: ReconnectState,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: ReconnectState::Idle,
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    pub fn on_close(&mut self, reason: Option<&CloseReason>) -> ReconnectDecision {
        if reason.is_some_and(CloseReason::is_logged_out) {
            return ReconnectDecision::Terminal;
        }
        match self.state {
            ReconnectState::Scheduled => ReconnectDecision::AlreadyScheduled,
            ReconnectState::Idle => {
                self.state = ReconnectState::Scheduled;
                ReconnectDecision::Schedule(self.delay)
            }
        }
    }

    /// The timer elapsed; clear the guard before the attempt starts.
    pub fn fire(&mut self) {
        self.state = ReconnectState::Idle;
    }

    /// Drop a pending retry (explicit disconnect).
    pub fn cancel(&mut self) {
        self.state = ReconnectState::Idle;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
