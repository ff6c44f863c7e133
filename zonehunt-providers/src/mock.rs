use crate::{service_error_text, CloudProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use zonehunt_common::{LaunchRequest, LaunchedInstance, Zone};

/// Error text the mock uses for capacity exhaustion.
pub fn out_of_capacity_text() -> String {
    service_error_text("InternalError", "Out of host capacity.", 500, Some("mock"))
}

/// Error text the mock uses for throttling.
pub fn too_many_requests_text() -> String {
    service_error_text(
        "TooManyRequests",
        "Too many requests for the user",
        429,
        Some("mock"),
    )
}

/// One recorded launch attempt.
#[derive(Debug, Clone)]
pub struct MockAttempt {
    pub zone: String,
    pub at: Instant,
}

/// In-memory provider with a scripted sequence of launch results.
///
/// Each launch pops the next scripted step; once the script is empty every
/// launch fails with the capacity error. Attempts are recorded with the
/// tokio clock so tests running on a paused clock can assert on timing.
pub struct MockProvider {
    zones: Vec<Zone>,
    zone_listing_error: Option<String>,
    script: Mutex<VecDeque<Option<String>>>,
    attempts: Mutex<Vec<MockAttempt>>,
}

impl MockProvider {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            zone_listing_error: None,
            script: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// `count` fake availability domains named `MOCK:AD-1`, `MOCK:AD-2`, ...
    pub fn with_fake_zones(count: usize) -> Self {
        Self::new(fake_zones(count))
    }

    /// Dry-run provider: three zones, `failures` capacity errors, then a launch.
    pub fn capacity_then_success(failures: u32) -> Self {
        let provider = Self::with_fake_zones(3);
        for _ in 0..failures {
            provider.push_failure(out_of_capacity_text());
        }
        provider.push_success();
        provider
    }

    /// Make `list_zones` fail.
    pub fn failing_zone_listing(message: impl Into<String>) -> Self {
        Self {
            zone_listing_error: Some(message.into()),
            ..Self::new(Vec::new())
        }
    }

    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        lock(&self.script).push_back(Some(message.into()));
        self
    }

    pub fn push_success(&self) -> &Self {
        lock(&self.script).push_back(None);
        self
    }

    pub fn attempts(&self) -> Vec<MockAttempt> {
        lock(&self.attempts).clone()
    }

    pub fn attempted_zones(&self) -> Vec<String> {
        self.attempts().into_iter().map(|a| a.zone).collect()
    }
}

/// A panic while a guard was held cannot leave the script or the attempt log
/// half-written, so the data stays usable after poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn fake_zones(count: usize) -> Vec<Zone> {
    (1..=count)
        .map(|i| Zone {
            id: format!("ocid1.availabilitydomain.mock..ad{}", i),
            name: format!("MOCK:AD-{}", i),
        })
        .collect()
}

#[async_trait]
impl CloudProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_zones(&self) -> Result<Vec<Zone>> {
        if let Some(message) = &self.zone_listing_error {
            return Err(anyhow!(message.clone()));
        }
        Ok(self.zones.clone())
    }

    async fn launch_instance(&self, request: &LaunchRequest) -> Result<LaunchedInstance> {
        lock(&self.attempts).push(MockAttempt {
            zone: request.availability_domain.clone(),
            at: Instant::now(),
        });

        let step = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Some(out_of_capacity_text()));

        match step {
            Some(message) => Err(anyhow!(message)),
            None => Ok(LaunchedInstance {
                id: format!("ocid1.instance.mock..{}", uuid::Uuid::new_v4().simple()),
                availability_domain: request.availability_domain.clone(),
                display_name: Some(request.display_name.clone()),
                lifecycle_state: Some("PROVISIONING".to_string()),
            }),
        }
    }
}
