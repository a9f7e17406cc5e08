use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError};

use crate::serde::{
    deserialize_comma_separated, deserialize_duration_secs, deserialize_from_str, serialize_duration_secs,
    serialize_to_str,
};

pub const DEFAULT_API_URL: &str = "https://api.pulumi.com";
pub const DEFAULT_COLLECT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate]
    pub pulumi: PulumiSettings,

    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PulumiSettings {
    #[validate(length(min = 1, message = "pulumi access token is required"))]
    #[serde(default, skip_serializing)]
    pub access_token: String,

    #[serde(
        default = "PulumiSettings::default_api_url",
        serialize_with = "serialize_to_str",
        deserialize_with = "deserialize_from_str"
    )]
    pub api_url: Url,

    #[validate(length(min = 1, message = "at least one pulumi organization is required"))]
    #[serde(default, deserialize_with = "deserialize_comma_separated")]
    pub organizations: Vec<String>,

    #[validate(custom = "validate_positive_duration")]
    #[serde(
        alias = "collect_interval_secs",
        default = "PulumiSettings::default_collect_interval",
        serialize_with = "serialize_duration_secs",
        deserialize_with = "deserialize_duration_secs"
    )]
    pub collect_interval: Duration,

    #[validate(range(min = 1, max = 100, message = "max-concurrency must be between 1 and 100"))]
    #[serde(default = "PulumiSettings::default_max_concurrency")]
    pub max_concurrency: usize,

    #[validate(custom = "validate_positive_duration")]
    #[serde(
        rename = "request_timeout_secs",
        default = "PulumiSettings::default_request_timeout",
        serialize_with = "serialize_duration_secs",
        deserialize_with = "deserialize_duration_secs"
    )]
    pub request_timeout: Duration,
}

impl PulumiSettings {
    pub fn default_api_url() -> Url {
        Url::parse(DEFAULT_API_URL).expect("failed parsing default pulumi api url")
    }

    pub const fn default_collect_interval() -> Duration {
        Duration::from_secs(DEFAULT_COLLECT_INTERVAL_SECS)
    }

    pub const fn default_max_concurrency() -> usize {
        DEFAULT_MAX_CONCURRENCY
    }

    pub const fn default_request_timeout() -> Duration {
        Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

impl fmt::Debug for PulumiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PulumiSettings")
            .field("access_token", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .field("organizations", &self.organizations)
            .field("collect_interval", &self.collect_interval)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(
        default = "HttpSettings::default_listen_address",
        serialize_with = "serialize_to_str",
        deserialize_with = "deserialize_from_str"
    )]
    pub listen_address: SocketAddr,
}

impl HttpSettings {
    pub fn default_listen_address() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 8080))
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { listen_address: Self::default_listen_address() }
    }
}

fn validate_positive_duration(duration: &Duration) -> Result<(), ValidationError> {
    if duration.is_zero() {
        let mut error = ValidationError::new("positive_duration");
        error.message = Some("duration must be positive".into());
        return Err(error);
    }

    Ok(())
}
