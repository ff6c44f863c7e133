//! Process configuration.
//!
//! Every setting is declared once in [`SETTINGS_TABLE`] as a
//! `(field, ENV_VAR, default)` triple. Loading walks the table, asks a lookup
//! function (usually the process environment) for each variable and falls
//! back to the default. Validation runs once; after that `Settings` is never
//! mutated.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default for a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// No default; validation decides whether an empty value is acceptable.
    Required,
    Value(&'static str),
    /// Current unix time in milliseconds, resolved at load time.
    UnixMillis,
}

pub const SETTINGS_TABLE: &[(&str, &str, DefaultValue)] = &[
    ("log_level", "LOG_LEVEL", DefaultValue::Value("info")),
    ("provider", "PROVIDER", DefaultValue::Value("oci")),
    ("user_id", "OCI_USER_ID", DefaultValue::Required),
    ("tenancy_id", "OCI_TENANCY_ID", DefaultValue::Required),
    ("subnet_id", "OCI_SUBNET_ID", DefaultValue::Required),
    ("image_id", "OCI_IMAGE_ID", DefaultValue::Required),
    ("fingerprint", "OCI_FINGERPRINT", DefaultValue::Required),
    ("region", "OCI_REGION", DefaultValue::Required),
    ("key_path", "KEY_PATH", DefaultValue::Value("oci.key")),
    ("shape", "SHAPE", DefaultValue::Value("VM.Standard.A1.Flex")),
    ("display_name", "DISPLAY_NAME", DefaultValue::UnixMillis),
    ("cpus", "CPUS", DefaultValue::Value("4")),
    ("volume_size_gb", "VOLUME_SIZE", DefaultValue::Value("50")),
    ("ssh_key", "SSH_KEY", DefaultValue::Required),
    ("create_interval_secs", "CREATE_INTERVAL_SECONDS", DefaultValue::Value("60")),
    ("zone_interval_secs", "CREATE_ZONE_SECONDS", DefaultValue::Value("10")),
    ("backoff_step_secs", "BACKOFF_STEP_SECONDS", DefaultValue::Value("1")),
    ("backoff_cap_secs", "BACKOFF_CAP_SECONDS", DefaultValue::Value("20")),
    ("capacity_marker", "CAPACITY_ERROR_MARKER", DefaultValue::Value("Out of host capacity")),
    ("rate_limit_marker", "RATE_LIMIT_ERROR_MARKER", DefaultValue::Value("TooManyRequests")),
    ("mock_failures", "MOCK_FAILURES", DefaultValue::Value("5")),
];

/// Env var name for a field, for error messages.
pub fn env_var_for(field: &str) -> &'static str {
    SETTINGS_TABLE
        .iter()
        .find(|(f, _, _)| *f == field)
        .map(|(_, env, _)| *env)
        .unwrap_or("")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid log level {0:?}: expected one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
    #[error("unknown provider {0:?}: expected oci or mock")]
    UnknownProvider(String),
    #[error("{env} must be a non-negative integer, got {value:?}")]
    InvalidNumber { env: &'static str, value: String },
    #[error("{env} must be greater than zero")]
    NotPositive { env: &'static str },
    #[error("invalid subnet id, please specify it with OCI_SUBNET_ID. It should look similar to ocid1.subnet.oc1.your-region.verylongrandomstring")]
    InvalidSubnetId,
    #[error("invalid image id, please specify it with OCI_IMAGE_ID. It should look similar to ocid1.image.oc1.your-region.verylongrandomstring")]
    InvalidImageId,
    #[error("invalid user id, please specify it with OCI_USER_ID. It should look similar to ocid1.user.oc1..verylongrandomstring")]
    InvalidUserId,
    #[error("invalid tenancy id, please specify it with OCI_TENANCY_ID. It should look similar to ocid1.tenancy.oc1..verylongrandomstring")]
    InvalidTenancyId,
    #[error("please specify your SSH public key using SSH_KEY. It should look similar to ssh-rsa verylongstring user@example.com")]
    MissingSshKey,
    #[error("please specify your region using OCI_REGION")]
    MissingRegion,
    #[error("please specify the fingerprint of your API key using OCI_FINGERPRINT")]
    InvalidFingerprint,
    #[error("OCI_IMAGE_ID must contain the region identifier {0:?}")]
    ImageOutsideRegion(String),
    #[error("OCI_SUBNET_ID must contain the region identifier {0:?}")]
    SubnetOutsideRegion(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Oci,
    Mock,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oci" => Some(ProviderKind::Oci),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Oci => "oci",
            ProviderKind::Mock => "mock",
        }
    }
}

/// Map a user-supplied level onto a tracing directive.
///
/// `warning`, `fatal` and `panic` are accepted for compatibility with
/// logrus-style level names.
pub fn normalize_log_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "fatal" | "panic" => Some("error"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_level: &'static str,
    pub provider: ProviderKind,

    pub user_id: String,
    pub tenancy_id: String,
    pub subnet_id: String,
    pub image_id: String,
    pub fingerprint: String,
    pub region: String,
    pub key_path: String,

    pub shape: String,
    pub display_name: String,
    pub cpus: u32,
    pub volume_size_gb: u64,
    pub ssh_key: String,

    pub create_interval_secs: u64,
    pub zone_interval_secs: u64,
    pub backoff_step_secs: u64,
    pub backoff_cap_secs: u64,

    pub capacity_marker: String,
    pub rate_limit_marker: String,

    pub mock_failures: u32,
}

impl Settings {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary `ENV_VAR -> value` lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = Resolved::resolve(&lookup);

        let log_level = normalize_log_level(raw.text("log_level"))
            .ok_or_else(|| ConfigError::InvalidLogLevel(raw.text("log_level").to_string()))?;
        let provider = ProviderKind::parse(raw.text("provider"))
            .ok_or_else(|| ConfigError::UnknownProvider(raw.text("provider").to_string()))?;

        let settings = Settings {
            log_level,
            provider,
            user_id: raw.owned("user_id"),
            tenancy_id: raw.owned("tenancy_id"),
            subnet_id: raw.owned("subnet_id"),
            image_id: raw.owned("image_id"),
            fingerprint: raw.owned("fingerprint"),
            region: raw.owned("region"),
            key_path: raw.owned("key_path"),
            shape: raw.owned("shape"),
            display_name: raw.owned("display_name"),
            cpus: raw.positive("cpus")?,
            volume_size_gb: raw.positive("volume_size_gb")?,
            ssh_key: raw.owned("ssh_key"),
            create_interval_secs: raw.positive("create_interval_secs")?,
            zone_interval_secs: raw.number("zone_interval_secs")?,
            backoff_step_secs: raw.number("backoff_step_secs")?,
            backoff_cap_secs: raw.number("backoff_cap_secs")?,
            capacity_marker: raw.owned("capacity_marker"),
            rate_limit_marker: raw.owned("rate_limit_marker"),
            mock_failures: raw.number("mock_failures")?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Resource identifier checks. Order matters: the first failing rule wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subnet_id.is_empty() || !self.subnet_id.contains(".subnet.") {
            return Err(ConfigError::InvalidSubnetId);
        }
        if self.image_id.is_empty() || !self.image_id.contains(".image.") {
            return Err(ConfigError::InvalidImageId);
        }
        if self.user_id.is_empty() || !self.user_id.contains(".user.") {
            return Err(ConfigError::InvalidUserId);
        }
        if self.tenancy_id.is_empty() || !self.tenancy_id.contains(".tenancy.") {
            return Err(ConfigError::InvalidTenancyId);
        }
        if self.ssh_key.is_empty() {
            return Err(ConfigError::MissingSshKey);
        }
        if self.region.is_empty() {
            return Err(ConfigError::MissingRegion);
        }
        if self.fingerprint.is_empty() || !self.fingerprint.contains(':') {
            return Err(ConfigError::InvalidFingerprint);
        }
        if !self.image_id.contains(&self.region) {
            return Err(ConfigError::ImageOutsideRegion(self.region.clone()));
        }
        if !self.subnet_id.contains(&self.region) {
            return Err(ConfigError::SubnetOutsideRegion(self.region.clone()));
        }
        Ok(())
    }

    /// `tenancy/user/fingerprint`, the key id used for request signing.
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy_id, self.user_id, self.fingerprint)
    }

    pub fn create_interval(&self) -> Duration {
        Duration::from_secs(self.create_interval_secs)
    }
}

/// Raw string values after env lookup and defaulting, keyed by field name.
struct Resolved(HashMap<&'static str, String>);

impl Resolved {
    fn resolve<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = HashMap::with_capacity(SETTINGS_TABLE.len());
        for (field, env, default) in SETTINGS_TABLE {
            // Empty variables count as unset.
            let value = lookup(env)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| match default {
                    DefaultValue::Required => String::new(),
                    DefaultValue::Value(v) => v.to_string(),
                    DefaultValue::UnixMillis => chrono::Utc::now().timestamp_millis().to_string(),
                });
            values.insert(*field, value);
        }
        Resolved(values)
    }

    fn text(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    fn owned(&self, field: &str) -> String {
        self.text(field).to_string()
    }

    fn number<T: FromStr>(&self, field: &str) -> Result<T, ConfigError> {
        let value = self.text(field);
        value.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            env: env_var_for(field),
            value: value.to_string(),
        })
    }

    fn positive<T: FromStr + Default + PartialEq>(&self, field: &str) -> Result<T, ConfigError> {
        let n: T = self.number(field)?;
        if n == T::default() {
            return Err(ConfigError::NotPositive {
                env: env_var_for(field),
            });
        }
        Ok(n)
    }
}
