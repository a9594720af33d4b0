//! Per-endpoint sliding-window admission control.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Sliding one-second window limiter for a single endpoint.
///
/// Holds at most `max_rps` timestamps. The check and the insert happen under
/// the same lock, so concurrent callers can never be admitted past the limit.
#[derive(Debug)]
pub struct RateLimiter {
    max_rps: u32,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_rps: u32) -> Self {
        Self {
            max_rps,
            window: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_rps(&self) -> u32 {
        self.max_rps
    }

    /// Try to admit one request now.
    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }

    /// Try to admit one request at `now`. A refusal records nothing; only
    /// entries that already left the window are discarded.
    pub fn admit_at(&self, now: Instant) -> bool {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut window, now);

        if window.len() < self.max_rps as usize {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Requests admitted within the trailing window.
    pub fn recent_requests(&self) -> usize {
        let now = Instant::now();
        let window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window
            .iter()
            .filter(|ts| now.saturating_duration_since(**ts) < WINDOW)
            .count()
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant) {
    while let Some(oldest) = window.front() {
        if now.saturating_duration_since(*oldest) < WINDOW {
            break;
        }
        window.pop_front();
    }
}
