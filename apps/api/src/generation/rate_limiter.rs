//! Rate Limiter — per-client sliding window over request timestamps.
//!
//! Check-and-append is one critical section, so concurrent requests from the
//! same identity cannot both slip under the limit. Empty windows are
//! garbage-collected opportunistically every `SWEEP_EVERY` checks.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::AppError;

pub const DEFAULT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const SWEEP_EVERY: usize = 64;

#[derive(Default)]
struct LimiterState {
    windows: HashMap<String, VecDeque<Instant>>,
    checks_since_sweep: usize,
}

pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests: max_requests.max(1),
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admits the request and records it, or rejects it without recording.
    pub fn check(&self, identity: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;

        state.checks_since_sweep += 1;
        if state.checks_since_sweep >= SWEEP_EVERY {
            let removed = sweep_windows(&mut state.windows, now, self.window);
            state.checks_since_sweep = 0;
            if removed > 0 {
                debug!(removed, "Rate limiter dropped idle client windows");
            }
        }

        let timestamps = state.windows.entry(identity.to_string()).or_default();
        prune(timestamps, now, self.window);

        if timestamps.len() >= self.max_requests {
            let retry_after = timestamps
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            warn!(client = %identity, limit = self.max_requests, "Rate limit exceeded");
            return Err(AppError::RateLimited {
                limit: self.max_requests,
                window_secs: self.window.as_secs(),
                retry_after_secs: ceil_secs(retry_after),
            });
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// Removes identities whose windows have emptied. Returns how many.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        sweep_windows(&mut state.windows, now, self.window)
    }

    /// Number of identities currently holding a window.
    pub fn tracked_identities(&self) -> usize {
        self.lock().windows.len()
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.windows.clear();
        state.checks_since_sweep = 0;
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) < window {
            break;
        }
        timestamps.pop_front();
    }
}

fn sweep_windows(
    windows: &mut HashMap<String, VecDeque<Instant>>,
    now: Instant,
    window: Duration,
) -> usize {
    let before = windows.len();
    windows.retain(|_, timestamps| {
        prune(timestamps, now, window);
        !timestamps.is_empty()
    });
    before - windows.len()
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}
