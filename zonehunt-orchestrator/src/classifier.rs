use zonehunt_common::{LaunchedInstance, Settings};

/// Substrings that identify the two provider conditions the loop treats
/// specially.
#[derive(Debug, Clone, Copy)]
pub struct ErrorMarkers<'a> {
    pub capacity: &'a str,
    pub rate_limit: &'a str,
}

impl<'a> From<&'a Settings> for ErrorMarkers<'a> {
    fn from(settings: &'a Settings) -> Self {
        Self {
            capacity: &settings.capacity_marker,
            rate_limit: &settings.rate_limit_marker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(LaunchedInstance),
    /// `rate_limited` is set when the same error also carried the rate-limit
    /// marker; backoff still applies in that case.
    OutOfCapacity { rate_limited: bool },
    RateLimited,
    Other(String),
}

impl AttemptOutcome {
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::RateLimited | AttemptOutcome::OutOfCapacity { rate_limited: true }
        )
    }
}

/// Map a launch result to an outcome. Pure: the same input always yields the
/// same outcome.
pub fn classify(result: &anyhow::Result<LaunchedInstance>, markers: &ErrorMarkers<'_>) -> AttemptOutcome {
    match result {
        Ok(instance) => AttemptOutcome::Success(instance.clone()),
        Err(e) => classify_error_text(&format!("{:#}", e), markers),
    }
}

/// Both markers are checked; neither one short-circuits the other.
pub fn classify_error_text(text: &str, markers: &ErrorMarkers<'_>) -> AttemptOutcome {
    let out_of_capacity = text.contains(markers.capacity);
    let rate_limited = text.contains(markers.rate_limit);

    match (out_of_capacity, rate_limited) {
        (true, rate_limited) => AttemptOutcome::OutOfCapacity { rate_limited },
        (false, true) => AttemptOutcome::RateLimited,
        (false, false) => AttemptOutcome::Other(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    const MARKERS: ErrorMarkers<'static> = ErrorMarkers {
        capacity: "Out of host capacity",
        rate_limit: "TooManyRequests",
    };

    fn instance() -> LaunchedInstance {
        LaunchedInstance {
            id: "ocid1.instance.oc1..abc".to_string(),
            availability_domain: "AD-2".to_string(),
            display_name: None,
            lifecycle_state: None,
        }
    }

    #[test]
    fn ok_is_success() {
        assert_eq!(
            classify(&Ok(instance()), &MARKERS),
            AttemptOutcome::Success(instance())
        );
    }

    #[test]
    fn capacity_marker() {
        let err = anyhow!("Service error:InternalError. Out of host capacity. http status code: 500. Opc request id: x");
        let outcome = classify(&Err(err), &MARKERS);
        assert_eq!(outcome, AttemptOutcome::OutOfCapacity { rate_limited: false });
        assert!(!outcome.is_rate_limited());
    }

    #[test]
    fn rate_limit_marker() {
        let err = anyhow!("Service error:TooManyRequests. Too many requests for the user. http status code: 429. Opc request id: x");
        let outcome = classify(&Err(err), &MARKERS);
        assert_eq!(outcome, AttemptOutcome::RateLimited);
        assert!(outcome.is_rate_limited());
    }

    #[test]
    fn both_markers_are_honoured() {
        let outcome = classify_error_text("TooManyRequests while Out of host capacity", &MARKERS);
        assert_eq!(outcome, AttemptOutcome::OutOfCapacity { rate_limited: true });
        assert!(outcome.is_rate_limited());
    }

    #[test]
    fn anything_else_is_other_with_full_text() {
        let err = Err(anyhow!("NotAuthorizedOrNotFound")).context("LaunchInstance failed");
        let outcome = classify(&err, &MARKERS);
        assert_eq!(
            outcome,
            AttemptOutcome::Other("LaunchInstance failed: NotAuthorizedOrNotFound".to_string())
        );
        assert!(!outcome.is_rate_limited());
    }

    #[test]
    fn markers_in_context_chain_are_found() {
        let err = Err(anyhow!("Out of host capacity")).context("launch in AD-1");
        assert_eq!(
            classify(&err, &MARKERS),
            AttemptOutcome::OutOfCapacity { rate_limited: false }
        );
    }

    #[test]
    fn classification_is_repeatable() {
        for text in [
            "Out of host capacity",
            "TooManyRequests",
            "connection reset by peer",
            "",
        ] {
            assert_eq!(
                classify_error_text(text, &MARKERS),
                classify_error_text(text, &MARKERS)
            );
        }
    }

    #[test]
    fn markers_come_from_settings() {
        let settings = crate::test_support::settings_with(&[("RATE_LIMIT_ERROR_MARKER", "SlowDown")]);
        let markers = ErrorMarkers::from(&settings);
        assert_eq!(classify_error_text("SlowDown", &markers), AttemptOutcome::RateLimited);
        assert_eq!(
            classify_error_text("TooManyRequests", &markers),
            AttemptOutcome::Other("TooManyRequests".to_string())
        );
    }
}
