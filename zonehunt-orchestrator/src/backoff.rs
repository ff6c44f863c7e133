use std::time::Duration;
use tokio::time::Instant;
use zonehunt_common::Settings;

/// How the inter-zone wait grows when the provider throttles us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub step_secs: u64,
    pub cap_secs: u64,
}

impl From<&Settings> for BackoffPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            step_secs: settings.backoff_step_secs,
            cap_secs: settings.backoff_cap_secs,
        }
    }
}

/// The only mutable state of a run. Owned by the scheduler and lent to the
/// zone pass.
#[derive(Debug)]
pub struct RunState {
    zone_wait_secs: u64,
    started: Instant,
}

impl RunState {
    pub fn new(initial_zone_wait_secs: u64) -> Self {
        Self {
            zone_wait_secs: initial_zone_wait_secs,
            started: Instant::now(),
        }
    }

    pub fn zone_wait_secs(&self) -> u64 {
        self.zone_wait_secs
    }

    pub fn zone_wait(&self) -> Duration {
        Duration::from_secs(self.zone_wait_secs)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Grow the wait by one step, never past the cap. A wait already at or
    /// above the cap is left alone. Returns whether the wait changed.
    ///
    /// There is no way to shrink the wait: it is non-decreasing for the
    /// whole run.
    pub fn on_rate_limited(&mut self, policy: &BackoffPolicy) -> bool {
        if self.zone_wait_secs >= policy.cap_secs {
            return false;
        }
        let next = self
            .zone_wait_secs
            .saturating_add(policy.step_secs)
            .min(policy.cap_secs);
        let changed = next != self.zone_wait_secs;
        self.zone_wait_secs = next;
        changed
    }
}
