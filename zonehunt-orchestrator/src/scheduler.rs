use std::time::Duration;
use tokio::time::MissedTickBehavior;
use zonehunt_common::{LaunchedInstance, Settings, Zone};
use zonehunt_providers::CloudProvider;

use crate::backoff::RunState;
use crate::reporter;
use crate::zone_pass::{run_pass, PassResult};

/// Terminal result of a run, handed back to `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub instance: LaunchedInstance,
    pub zone: Zone,
    pub elapsed: Duration,
}

impl Launch {
    pub fn summary(&self) -> String {
        format!(
            "Generated instance {} in availability zone {} ({}), took {:.1?}",
            self.instance.id, self.zone.id, self.zone.name, self.elapsed
        )
    }
}

/// Run passes until one launches an instance.
///
/// The first pass starts immediately. Later passes start on ticks of a
/// fixed timer whose period is the create interval; backoff never changes
/// it. Passes never overlap: ticks that fall due while a pass is still
/// running collapse into a single tick that fires when the pass ends.
/// There is no attempt limit and no deadline; without a launch this future
/// never completes.
pub async fn run(provider: &dyn CloudProvider, zones: &[Zone], settings: &Settings) -> Launch {
    let mut state = RunState::new(settings.zone_interval_secs);
    let mut ticker = tokio::time::interval(settings.create_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut pass: u64 = 0;
    loop {
        // First tick completes immediately.
        ticker.tick().await;
        pass += 1;
        reporter::pass_started(pass, zones.len(), state.zone_wait_secs());

        match run_pass(provider, zones, settings, &mut state).await {
            PassResult::Launched { instance, zone } => {
                return Launch {
                    instance,
                    zone,
                    elapsed: state.elapsed(),
                };
            }
            PassResult::Exhausted(stats) => reporter::pass_finished(pass, &stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::settings_with;
    use tokio::time::{timeout, Instant};
    use zonehunt_providers::mock::{fake_zones, too_many_requests_text, MockProvider};

    fn offsets_secs(provider: &MockProvider, start: Instant) -> Vec<u64> {
        provider
            .attempts()
            .iter()
            .map(|a| a.at.duration_since(start).as_secs())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_without_capacity() {
        let settings = settings_with(&[
            ("CREATE_INTERVAL_SECONDS", "60"),
            ("CREATE_ZONE_SECONDS", "10"),
        ]);
        let provider = MockProvider::with_fake_zones(3);
        let zones = fake_zones(3);
        let start = Instant::now();

        let outcome = timeout(Duration::from_secs(95), run(&provider, &zones, &settings)).await;

        assert!(outcome.is_err(), "run must not finish without a launch");
        // Pass 1 at t=0, pass 2 on the next tick at t=60.
        assert_eq!(offsets_secs(&provider, start), vec![0, 10, 20, 60, 70, 80]);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_on_second_pass_ends_the_run() {
        let settings = settings_with(&[
            ("CREATE_INTERVAL_SECONDS", "60"),
            ("CREATE_ZONE_SECONDS", "10"),
        ]);
        let provider = MockProvider::with_fake_zones(2);
        provider
            .push_failure(too_many_requests_text())
            .push_failure(too_many_requests_text())
            .push_failure(too_many_requests_text())
            .push_success();
        let zones = fake_zones(2);
        let start = Instant::now();

        let launch = run(&provider, &zones, &settings).await;

        // Pass 1: AD-1 at 0 (wait -> 11), AD-2 at 11 (wait -> 12), ends at 23.
        // Pass 2 on the t=60 tick: AD-1 at 60 (wait -> 13), AD-2 at 73 launches.
        assert_eq!(offsets_secs(&provider, start), vec![0, 11, 60, 73]);
        assert_eq!(launch.zone, zones[1]);
        assert_eq!(launch.elapsed, Duration::from_secs(73));
        assert!(launch.summary().contains(&zones[1].id));
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_pass_does_not_overlap_next() {
        // Each pass takes 3 x 30s = 90s, longer than the 60s period.
        let settings = settings_with(&[
            ("CREATE_INTERVAL_SECONDS", "60"),
            ("CREATE_ZONE_SECONDS", "30"),
        ]);
        let provider = MockProvider::with_fake_zones(3);
        let zones = fake_zones(3);
        let start = Instant::now();

        let _ = timeout(Duration::from_secs(250), run(&provider, &zones, &settings)).await;

        let offsets = offsets_secs(&provider, start);
        // Attempts are strictly sequential and at least one zone wait apart.
        for pair in offsets.windows(2) {
            assert!(pair[1] >= pair[0] + 30, "overlapping attempts: {:?}", offsets);
        }
        // The tick that fell due during pass 1 fires once, when the pass ends.
        assert_eq!(&offsets[..4], &[0, 30, 60, 90]);
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_has_no_delay() {
        let settings = settings_with(&[]);
        let provider = MockProvider::with_fake_zones(1);
        provider.push_success();
        let start = Instant::now();

        let launch = run(&provider, &fake_zones(1), &settings).await;

        assert_eq!(provider.attempts()[0].at, start);
        assert_eq!(launch.elapsed, Duration::ZERO);
    }
}
