//! Shared value types and well-known constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name this provider reports in its user agent.
pub const PROVIDER_NAME: &str = "terraform-provider-sakura";

/// Version this provider reports in its user agent.
pub const PROVIDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Zone used when no source names one.
pub const DEFAULT_ZONE: &str = "is1b";

/// Zones available when no source lists them.
pub const DEFAULT_ZONES: [&str; 4] = ["is1a", "is1b", "tk1a", "tk1v"];

/// API root used when no source names one.
pub const DEFAULT_API_ROOT_URL: &str = "https://secure.sakura.ad.jp/cloud/zone";

/// Default number of API retries on 423/503 responses.
pub const DEFAULT_RETRY_MAX: u32 = 10;

/// Default per-request timeout, in seconds.
pub const DEFAULT_API_REQUEST_TIMEOUT: u64 = 300;

/// Default API requests per second.
pub const DEFAULT_API_REQUEST_RATE_LIMIT: u32 = 10;

/// Name of the profile used when none is named or marked current.
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Diagnostics mode as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    /// No tracing.
    #[default]
    Off,
    /// API-level tracing only.
    Api,
    /// Wire-level tracing only.
    Http,
    /// Both API and wire tracing.
    Both,
}

impl TraceMode {
    /// Interpret a raw trace setting.
    ///
    /// `"api"` and `"http"` select one layer; an empty value or `"off"`
    /// disables tracing; any other value enables both layers.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "off" => Self::Off,
            "api" => Self::Api,
            "http" => Self::Http,
            _ => Self::Both,
        }
    }

    /// The flags this mode enables.
    pub fn flags(self) -> TraceFlags {
        match self {
            Self::Off => TraceFlags::default(),
            Self::Api => TraceFlags {
                api: true,
                http: false,
            },
            Self::Http => TraceFlags {
                api: false,
                http: true,
            },
            Self::Both => TraceFlags {
                api: true,
                http: true,
            },
        }
    }
}

impl FromStr for TraceMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Api => "api",
            Self::Http => "http",
            Self::Both => "both",
        })
    }
}

/// Which tracing layers are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceFlags {
    /// Log each API operation.
    pub api: bool,
    /// Log raw HTTP requests and responses.
    pub http: bool,
}

/// Backend services the provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceId {
    /// Core IaaS API (servers, disks, switches, ...).
    Iaas,
    /// Key management service.
    Kms,
    /// Secret manager.
    SecretManager,
    /// Simple message queue.
    SimpleMq,
    /// Event bus.
    EventBus,
    /// Cloud HSM.
    CloudHsm,
    /// AppRun shared.
    #[serde(rename = "apprun")]
    AppRun,
    /// Object storage. Needs native integer IDs.
    ObjectStorage,
    /// Add-on marketplace. Configured through environment strings.
    Addon,
    /// Workflows. Configured through environment strings.
    Workflows,
}

impl ServiceId {
    /// Every service, in construction order.
    pub const ALL: [ServiceId; 10] = [
        ServiceId::Iaas,
        ServiceId::Kms,
        ServiceId::SecretManager,
        ServiceId::SimpleMq,
        ServiceId::EventBus,
        ServiceId::CloudHsm,
        ServiceId::AppRun,
        ServiceId::ObjectStorage,
        ServiceId::Addon,
        ServiceId::Workflows,
    ];

    /// Stable lowercase name, used in endpoint overrides and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iaas => "iaas",
            Self::Kms => "kms",
            Self::SecretManager => "secret_manager",
            Self::SimpleMq => "simple_mq",
            Self::EventBus => "event_bus",
            Self::CloudHsm => "cloud_hsm",
            Self::AppRun => "apprun",
            Self::ObjectStorage => "object_storage",
            Self::Addon => "addon",
            Self::Workflows => "workflows",
        }
    }

    /// How this service's client receives its configuration.
    pub fn transport(self) -> Transport {
        match self {
            Self::ObjectStorage => Transport::NativeBigInt,
            Self::Addon | Self::Workflows => Transport::Environ,
            _ => Transport::Shared,
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a service client is handed its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// The shared option object.
    Shared,
    /// The option object variant that asks for native integer IDs.
    NativeBigInt,
    /// A list of `KEY=VALUE` strings; the SDK has no options entry point.
    Environ,
}
