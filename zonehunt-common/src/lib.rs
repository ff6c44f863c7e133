use serde::{Deserialize, Serialize};

pub mod launch;
pub mod settings;

pub use launch::LaunchRequest;
pub use settings::{ConfigError, ProviderKind, Settings};

// --- Entities ---

/// An availability domain within the configured region.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// What the provider hands back once a launch has been accepted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchedInstance {
    pub id: String,
    pub availability_domain: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
}
