//! Human-readable progress reporting. Purely observational: nothing here
//! feeds back into the loop.
//!
//! Severity policy:
//! - capacity exhaustion is expected and only shows up at debug level
//! - throttling is a warning that includes the current inter-zone wait
//! - any other failure is an error with the full error text and request

use zonehunt_common::{LaunchRequest, Settings, Zone};

use crate::scheduler::Launch;
use crate::zone_pass::PassStats;

pub fn starting(settings: &Settings, zones: &[Zone], provider: &str) {
    tracing::info!(
        "🚀 Starting instance generation every {} seconds: provider={} shape={} zones={}",
        settings.create_interval_secs,
        provider,
        settings.shape,
        zones
            .iter()
            .map(|z| z.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
}

pub fn pass_started(pass: u64, zone_count: usize, zone_wait_secs: u64) {
    tracing::debug!(
        "🔁 [zone-pass] pass #{} over {} zone(s), zone wait {}s",
        pass,
        zone_count,
        zone_wait_secs
    );
}

pub fn attempt_started(zone: &Zone) {
    tracing::info!("Attempting to create new instance in domain {}", zone.name);
}

pub fn out_of_capacity(zone: &Zone) {
    tracing::debug!("[zone-pass] {}: out of host capacity", zone.name);
}

pub fn rate_limited(zone: &Zone, zone_wait_secs: u64, increased: bool) {
    if increased {
        tracing::warn!(
            "⚠️ [zone-pass] {}: too many requests, increasing wait between zones to {}s",
            zone.name,
            zone_wait_secs
        );
    } else {
        tracing::warn!(
            "⚠️ [zone-pass] {}: too many requests, wait between zones already at {}s",
            zone.name,
            zone_wait_secs
        );
    }
}

pub fn unexpected_error(zone: &Zone, error: &str, request: &LaunchRequest) {
    let request_json = serde_json::to_string(request).unwrap_or_default();
    tracing::error!(
        "❌ [zone-pass] {}: received error from api: {}; request: {}",
        zone.name,
        error,
        request_json
    );
}

pub fn pass_finished(pass: u64, stats: &PassStats) {
    tracing::debug!(
        "[zone-pass] pass #{} done: attempts={} out_of_capacity={} rate_limited={} other={}",
        pass,
        stats.attempts,
        stats.out_of_capacity,
        stats.rate_limited,
        stats.other
    );
}

pub fn launched(launch: &Launch) {
    tracing::info!("✅ {}", launch.summary());
}
