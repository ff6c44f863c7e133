//! Shared fixtures for the orchestrator's unit tests.

use zonehunt_common::Settings;

/// Valid settings for region `eu-test-1`, with `overrides` applied on top
/// (`ENV_VAR`, value).
pub fn settings_with(overrides: &[(&str, &str)]) -> Settings {
    let base: &[(&str, &str)] = &[
        ("OCI_USER_ID", "ocid1.user.oc1..u"),
        ("OCI_TENANCY_ID", "ocid1.tenancy.oc1..t"),
        ("OCI_SUBNET_ID", "ocid1.subnet.oc1.eu-test-1.s"),
        ("OCI_IMAGE_ID", "ocid1.image.oc1.eu-test-1.i"),
        ("OCI_FINGERPRINT", "aa:bb"),
        ("OCI_REGION", "eu-test-1"),
        ("SSH_KEY", "ssh-ed25519 AAAA me@host"),
        ("DISPLAY_NAME", "hunter"),
    ];
    Settings::from_lookup(|key| {
        overrides
            .iter()
            .chain(base.iter())
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap()
}
