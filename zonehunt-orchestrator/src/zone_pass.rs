use zonehunt_common::{LaunchRequest, LaunchedInstance, Settings, Zone};
use zonehunt_providers::CloudProvider;

use crate::backoff::{BackoffPolicy, RunState};
use crate::classifier::{classify, AttemptOutcome, ErrorMarkers};
use crate::reporter;

/// Counters for one pass that ended without a launch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub attempts: usize,
    pub out_of_capacity: usize,
    pub rate_limited: usize,
    pub other: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassResult {
    /// Every zone was tried once and none had capacity.
    Exhausted(PassStats),
    /// A launch was accepted; the run is over.
    Launched { instance: LaunchedInstance, zone: Zone },
}

/// One attempt per zone, in list order.
///
/// After every failed attempt, including the last one, the pass sleeps for
/// the current inter-zone wait. A throttled attempt grows that wait before
/// the sleep. A successful attempt returns immediately: the remaining zones
/// are skipped and no sleep happens.
pub async fn run_pass(
    provider: &dyn CloudProvider,
    zones: &[Zone],
    settings: &Settings,
    state: &mut RunState,
) -> PassResult {
    let markers = ErrorMarkers::from(settings);
    let policy = BackoffPolicy::from(settings);
    let mut stats = PassStats::default();

    for zone in zones {
        reporter::attempt_started(zone);
        let request = LaunchRequest::for_zone(settings, zone);
        let result = provider.launch_instance(&request).await;
        stats.attempts += 1;

        let outcome = classify(&result, &markers);
        if outcome.is_rate_limited() {
            stats.rate_limited += 1;
            let increased = state.on_rate_limited(&policy);
            reporter::rate_limited(zone, state.zone_wait_secs(), increased);
        }

        match outcome {
            AttemptOutcome::Success(instance) => {
                return PassResult::Launched {
                    instance,
                    zone: zone.clone(),
                };
            }
            AttemptOutcome::OutOfCapacity { .. } => {
                stats.out_of_capacity += 1;
                reporter::out_of_capacity(zone);
            }
            AttemptOutcome::RateLimited => {}
            AttemptOutcome::Other(error) => {
                stats.other += 1;
                reporter::unexpected_error(zone, &error, &request);
            }
        }

        tokio::time::sleep(state.zone_wait()).await;
    }

    PassResult::Exhausted(stats)
}
