//! Configuration resolution.
//!
//! Configuration arrives as sparse [`ConfigFragment`]s from up to four
//! sources. The [`Resolver`] merges them field by field under a fixed
//! precedence (explicit > environment > stored profile > built-in defaults),
//! fills the remaining gaps with defaults and validates the credential
//! combination, producing a [`ResolvedConfig`].
//!
//! # Example
//!
//! ```
//! use sakura_provider_core::config::{ConfigFragment, Resolver};
//!
//! let explicit = ConfigFragment::default().with_zone("tk1a");
//! let environment = ConfigFragment::default().with_token("token", "secret");
//! let profile = ConfigFragment::default().with_zone("is1a");
//!
//! let resolved = Resolver::new()
//!     .resolve(&explicit, &environment, &profile)
//!     .unwrap();
//! assert_eq!(resolved.zone, "tk1a");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{FieldError, ProviderError, Result, ValidationErrors};
use crate::profile::ProfileStore;
use crate::types::{
    TraceMode, DEFAULT_API_REQUEST_RATE_LIMIT, DEFAULT_API_REQUEST_TIMEOUT, DEFAULT_API_ROOT_URL,
    DEFAULT_RETRY_MAX, DEFAULT_ZONE, DEFAULT_ZONES,
};

/// Locale sent with API requests when no source names one.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ja-JP";

/// Upper bound accepted for `retry_max`.
pub const MAX_RETRY_MAX: u32 = 100;

/// Accepted range for `api_request_rate_limit`.
pub const RATE_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Environment variables read by [`ConfigFragment::from_env`].
pub mod env_vars {
    /// Profile name.
    pub const PROFILE: &str = "SAKURACLOUD_PROFILE";
    /// Directory holding stored profiles.
    pub const PROFILE_DIR: &str = "SAKURACLOUD_PROFILE_DIR";
    /// API access token.
    pub const ACCESS_TOKEN: &str = "SAKURACLOUD_ACCESS_TOKEN";
    /// API access token secret.
    pub const ACCESS_TOKEN_SECRET: &str = "SAKURACLOUD_ACCESS_TOKEN_SECRET";
    /// Service principal id.
    pub const SERVICE_PRINCIPAL_ID: &str = "SAKURACLOUD_SERVICE_PRINCIPAL_ID";
    /// Service principal key id.
    pub const SERVICE_PRINCIPAL_KEY_ID: &str = "SAKURACLOUD_SERVICE_PRINCIPAL_KEY_ID";
    /// Inline service principal private key.
    pub const PRIVATE_KEY: &str = "SAKURACLOUD_PRIVATE_KEY";
    /// Path to the service principal private key.
    pub const PRIVATE_KEY_PATH: &str = "SAKURACLOUD_PRIVATE_KEY_PATH";
    /// Default zone.
    pub const ZONE: &str = "SAKURACLOUD_ZONE";
    /// Comma separated list of zones.
    pub const ZONES: &str = "SAKURACLOUD_ZONES";
    /// Zone used for global resources.
    pub const DEFAULT_ZONE: &str = "SAKURACLOUD_DEFAULT_ZONE";
    /// API root URL.
    pub const API_ROOT_URL: &str = "SAKURACLOUD_API_ROOT_URL";
    /// Accept-Language header value.
    pub const ACCEPT_LANGUAGE: &str = "SAKURACLOUD_ACCEPT_LANGUAGE";
    /// Maximum API retries.
    pub const RETRY_MAX: &str = "SAKURACLOUD_RETRY_MAX";
    /// Minimum retry wait, in seconds.
    pub const RETRY_WAIT_MIN: &str = "SAKURACLOUD_RETRY_WAIT_MIN";
    /// Maximum retry wait, in seconds.
    pub const RETRY_WAIT_MAX: &str = "SAKURACLOUD_RETRY_WAIT_MAX";
    /// Per-request timeout, in seconds.
    pub const API_REQUEST_TIMEOUT: &str = "SAKURACLOUD_API_REQUEST_TIMEOUT";
    /// API requests per second.
    pub const RATE_LIMIT: &str = "SAKURACLOUD_RATE_LIMIT";
    /// Trace mode.
    pub const TRACE: &str = "SAKURACLOUD_TRACE";
    /// Operator supplied user agent suffix.
    pub const APPEND_USER_AGENT: &str = "SAKURACLOUD_APPEND_USER_AGENT";
    /// User agent suffix contributed by the host tool.
    pub const HOST_APPEND_USER_AGENT: &str = "TF_APPEND_USER_AGENT";
    /// Prefix of per-service endpoint overrides for environment-configured clients.
    pub const ENDPOINT_PREFIX: &str = "SAKURA_ENDPOINTS_";
}

/// A snapshot of environment variables.
///
/// Everything that reads the environment takes one of these instead of
/// calling `std::env` directly, so tests never mutate process state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        std::env::vars().collect()
    }

    /// Create an empty environment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set a variable.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Look up a variable, including ones set to an empty string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Look up a variable, treating blank values as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Iterate over variables whose name starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.vars
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A partially filled configuration from one source.
///
/// Every field is optional: `None` means "this source says nothing", which
/// is different from `Some(0)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFragment {
    /// Name of the stored profile to read.
    pub profile: Option<String>,
    /// API access token.
    pub access_token: Option<String>,
    /// API access token secret.
    pub access_token_secret: Option<String>,
    /// Service principal id.
    pub service_principal_id: Option<String>,
    /// Service principal key id.
    pub service_principal_key_id: Option<String>,
    /// Inline private key for the service principal.
    pub private_key: Option<String>,
    /// Path to the private key for the service principal.
    pub private_key_path: Option<String>,
    /// Zone used when a resource does not name one.
    pub zone: Option<String>,
    /// Zones the provider may operate in.
    pub zones: Option<Vec<String>>,
    /// Zone used for global resources.
    pub default_zone: Option<String>,
    /// API root URL.
    pub api_root_url: Option<String>,
    /// Accept-Language header value.
    pub accept_language: Option<String>,
    /// Maximum number of retries on 423/503 responses.
    pub retry_max: Option<u32>,
    /// Minimum wait between retries, in seconds.
    pub retry_wait_min: Option<u64>,
    /// Maximum wait between retries, in seconds.
    pub retry_wait_max: Option<u64>,
    /// Per-request timeout, in seconds.
    pub api_request_timeout: Option<u64>,
    /// API requests per second.
    pub api_request_rate_limit: Option<u32>,
    /// Diagnostics mode.
    pub trace: Option<TraceMode>,
    /// Per-service endpoint overrides, keyed by service name.
    pub endpoints: Option<BTreeMap<String, String>>,
}

impl ConfigFragment {
    /// The built-in defaults, expressed as a fragment.
    pub fn defaults() -> Self {
        Self {
            zone: Some(DEFAULT_ZONE.to_string()),
            zones: Some(DEFAULT_ZONES.iter().map(|z| z.to_string()).collect()),
            default_zone: Some(DEFAULT_ZONE.to_string()),
            api_root_url: Some(DEFAULT_API_ROOT_URL.to_string()),
            accept_language: Some(DEFAULT_ACCEPT_LANGUAGE.to_string()),
            retry_max: Some(DEFAULT_RETRY_MAX),
            retry_wait_min: Some(0),
            retry_wait_max: Some(0),
            api_request_timeout: Some(DEFAULT_API_REQUEST_TIMEOUT),
            api_request_rate_limit: Some(DEFAULT_API_REQUEST_RATE_LIMIT),
            trace: Some(TraceMode::Off),
            endpoints: Some(BTreeMap::new()),
            ..Self::default()
        }
    }

    /// Read a fragment from `SAKURACLOUD_*` variables.
    ///
    /// Blank variables count as unset. Numeric variables that do not parse
    /// are reported together in one configuration error.
    pub fn from_env(env: &Environment) -> Result<Self> {
        let mut bad = Vec::new();
        let string = |key: &str| env.get_non_empty(key).map(str::to_string);

        let fragment = Self {
            profile: string(env_vars::PROFILE),
            access_token: string(env_vars::ACCESS_TOKEN),
            access_token_secret: string(env_vars::ACCESS_TOKEN_SECRET),
            service_principal_id: string(env_vars::SERVICE_PRINCIPAL_ID),
            service_principal_key_id: string(env_vars::SERVICE_PRINCIPAL_KEY_ID),
            private_key: string(env_vars::PRIVATE_KEY),
            private_key_path: string(env_vars::PRIVATE_KEY_PATH),
            zone: string(env_vars::ZONE),
            zones: env.get_non_empty(env_vars::ZONES).map(split_list),
            default_zone: string(env_vars::DEFAULT_ZONE),
            api_root_url: string(env_vars::API_ROOT_URL),
            accept_language: string(env_vars::ACCEPT_LANGUAGE),
            retry_max: parse_number(env, env_vars::RETRY_MAX, &mut bad),
            retry_wait_min: parse_number(env, env_vars::RETRY_WAIT_MIN, &mut bad),
            retry_wait_max: parse_number(env, env_vars::RETRY_WAIT_MAX, &mut bad),
            api_request_timeout: parse_number(env, env_vars::API_REQUEST_TIMEOUT, &mut bad),
            api_request_rate_limit: parse_number(env, env_vars::RATE_LIMIT, &mut bad),
            trace: env.get_non_empty(env_vars::TRACE).map(TraceMode::parse),
            endpoints: None,
        };

        if bad.is_empty() {
            Ok(fragment)
        } else {
            Err(ProviderError::Configuration(bad.join("; ")))
        }
    }

    /// Set the access token pair.
    pub fn with_token(mut self, token: impl Into<String>, secret: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self.access_token_secret = Some(secret.into());
        self
    }

    /// Set the service principal identity.
    pub fn with_service_principal(
        mut self,
        principal_id: impl Into<String>,
        key_id: impl Into<String>,
    ) -> Self {
        self.service_principal_id = Some(principal_id.into());
        self.service_principal_key_id = Some(key_id.into());
        self
    }

    /// Set the profile name.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the zone.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Set the zone list.
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = Some(zones.into_iter().map(Into::into).collect());
        self
    }

    /// Set the retry count.
    pub fn with_retry_max(mut self, retry_max: u32) -> Self {
        self.retry_max = Some(retry_max);
        self
    }

    /// Set the trace mode.
    pub fn with_trace(mut self, trace: TraceMode) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Add an endpoint override for a service.
    pub fn with_endpoint(mut self, service: impl Into<String>, url: impl Into<String>) -> Self {
        self.endpoints
            .get_or_insert_with(BTreeMap::new)
            .insert(service.into(), url.into());
        self
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    env: &Environment,
    key: &str,
    bad: &mut Vec<String>,
) -> Option<T>
where
    T::Err: fmt::Display,
{
    let raw = env.get_non_empty(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            bad.push(format!("failed to parse environment variable[{}]: {}", key, err));
            None
        }
    }
}

/// Retry bounds applied by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries.
    pub max: u32,
    /// Minimum wait between retries. Zero lets the HTTP layer choose.
    pub wait_min: Duration,
    /// Maximum wait between retries. Zero lets the HTTP layer choose.
    pub wait_max: Duration,
}

/// Service principal private key material.
#[derive(Clone, PartialEq, Eq)]
pub enum PrivateKey {
    /// PEM text supplied directly.
    Inline(String),
    /// Path to a PEM file.
    Path(PathBuf),
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline(<redacted>)"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// The credential mode selected by validation.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Access token and secret.
    Token {
        /// API access token.
        access_token: String,
        /// API access token secret.
        access_token_secret: String,
    },
    /// Service principal identity.
    ServicePrincipal {
        /// Principal id.
        principal_id: String,
        /// Key id.
        key_id: String,
        /// Private key material, validated by the signer.
        private_key: Option<PrivateKey>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { access_token, .. } => f
                .debug_struct("Token")
                .field("access_token", access_token)
                .field("access_token_secret", &"<redacted>")
                .finish(),
            Self::ServicePrincipal {
                principal_id,
                key_id,
                private_key,
            } => f
                .debug_struct("ServicePrincipal")
                .field("principal_id", principal_id)
                .field("key_id", key_id)
                .field("private_key", private_key)
                .finish(),
        }
    }
}

/// A fully merged, defaulted and validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Name of the stored profile the values were read from, if any.
    pub profile: Option<String>,
    /// Credentials for every API call.
    pub credentials: Credentials,
    /// Zone used when a resource does not name one.
    pub zone: String,
    /// Zones the provider may operate in.
    pub zones: Vec<String>,
    /// Zone used for global resources.
    pub default_zone: String,
    /// API root URL.
    pub api_root_url: String,
    /// Accept-Language header value.
    pub accept_language: String,
    /// Retry bounds.
    pub retry: RetryPolicy,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// API requests per second.
    pub rate_limit: u32,
    /// Diagnostics mode.
    pub trace: TraceMode,
    /// Per-service endpoint overrides, keyed by service name.
    pub endpoints: BTreeMap<String, String>,
}

impl ResolvedConfig {
    /// Validate a merged fragment.
    ///
    /// All problems are collected before returning, never just the first.
    pub fn from_merged(merged: ConfigFragment) -> Result<Self> {
        let mut errors = ValidationErrors::new();

        let credentials = select_credentials(&merged, &mut errors);

        let retry_max = merged.retry_max.unwrap_or(DEFAULT_RETRY_MAX);
        if retry_max > MAX_RETRY_MAX {
            errors.push(FieldError::invalid(
                "retry_max",
                format!("retry_max must be between 0 and {}, got {}", MAX_RETRY_MAX, retry_max),
            ));
        }

        let rate_limit = merged
            .api_request_rate_limit
            .unwrap_or(DEFAULT_API_REQUEST_RATE_LIMIT);
        if !RATE_LIMIT_RANGE.contains(&rate_limit) {
            errors.push(FieldError::invalid(
                "api_request_rate_limit",
                format!(
                    "api_request_rate_limit must be between {} and {}, got {}",
                    RATE_LIMIT_RANGE.start(),
                    RATE_LIMIT_RANGE.end(),
                    rate_limit
                ),
            ));
        }

        let wait_min = merged.retry_wait_min.unwrap_or(0);
        let wait_max = merged.retry_wait_max.unwrap_or(0);
        if wait_max != 0 && wait_min > wait_max {
            errors.push(FieldError::invalid(
                "retry_wait_min",
                format!(
                    "retry_wait_min ({}) must not exceed retry_wait_max ({})",
                    wait_min, wait_max
                ),
            ));
        }

        let api_root_url = merged
            .api_root_url
            .unwrap_or_else(|| DEFAULT_API_ROOT_URL.to_string());
        if !is_http_url(&api_root_url) {
            errors.push(FieldError::invalid(
                "api_root_url",
                format!("api_root_url must be an http(s) URL, got {:?}", api_root_url),
            ));
        }

        errors.into_result()?;
        let credentials = credentials.ok_or_else(|| {
            ProviderError::Configuration("credential selection produced no result".to_string())
        })?;

        let zone = merged.zone.unwrap_or_else(|| DEFAULT_ZONE.to_string());
        Ok(Self {
            profile: merged.profile,
            credentials,
            default_zone: merged.default_zone.unwrap_or_else(|| zone.clone()),
            zone,
            zones: merged
                .zones
                .unwrap_or_else(|| DEFAULT_ZONES.iter().map(|z| z.to_string()).collect()),
            api_root_url,
            accept_language: merged
                .accept_language
                .unwrap_or_else(|| DEFAULT_ACCEPT_LANGUAGE.to_string()),
            retry: RetryPolicy {
                max: retry_max,
                wait_min: Duration::from_secs(wait_min),
                wait_max: Duration::from_secs(wait_max),
            },
            request_timeout: Duration::from_secs(
                merged
                    .api_request_timeout
                    .unwrap_or(DEFAULT_API_REQUEST_TIMEOUT),
            ),
            rate_limit,
            trace: merged.trace.unwrap_or_default(),
            endpoints: merged.endpoints.unwrap_or_default(),
        })
    }

    /// Endpoint override for a service, if one is configured.
    pub fn endpoint_override(&self, service: &str) -> Option<&str> {
        self.endpoints.get(service).map(String::as_str)
    }
}

pub(crate) fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}

fn select_credentials(
    merged: &ConfigFragment,
    errors: &mut ValidationErrors,
) -> Option<Credentials> {
    let token = merged.access_token.as_ref();
    let secret = merged.access_token_secret.as_ref();
    let principal = merged.service_principal_id.as_ref();
    let key_id = merged.service_principal_key_id.as_ref();

    let token_ready = token.is_some() && secret.is_some();
    let principal_ready = principal.is_some() && key_id.is_some();

    match (token_ready, principal_ready) {
        (true, true) => {
            errors.push(FieldError::invalid(
                "credentials",
                "both access token and service principal credentials are configured; use only one",
            ));
            None
        }
        (false, true) => Some(Credentials::ServicePrincipal {
            principal_id: principal.cloned().unwrap_or_default(),
            key_id: key_id.cloned().unwrap_or_default(),
            private_key: merged
                .private_key
                .clone()
                .map(PrivateKey::Inline)
                .or_else(|| merged.private_key_path.clone().map(|p| PrivateKey::Path(p.into()))),
        }),
        (true, false) => {
            if principal.is_some() || key_id.is_some() {
                warn!("incomplete service principal settings are ignored; using access token");
            }
            Some(Credentials::Token {
                access_token: token.cloned().unwrap_or_default(),
                access_token_secret: secret.cloned().unwrap_or_default(),
            })
        }
        (false, false) => {
            // Report the gaps of every mode that was started; with nothing
            // set, token mode is the one asked for.
            let principal_started = principal.is_some() || key_id.is_some();
            let token_started = token.is_some() || secret.is_some();
            if token_started || !principal_started {
                if token.is_none() {
                    errors.push(FieldError::missing("access_token"));
                }
                if secret.is_none() {
                    errors.push(FieldError::missing("access_token_secret"));
                }
            }
            if principal_started {
                if principal.is_none() {
                    errors.push(FieldError::missing("service_principal_id"));
                }
                if key_id.is_none() {
                    errors.push(FieldError::missing("service_principal_key_id"));
                }
            }
            None
        }
    }
}

/// Merges configuration fragments into a [`ResolvedConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    zero_is_unset: bool,
}

impl Resolver {
    /// Create a resolver with presence semantics: a numeric `Some(0)` wins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat numeric zeros as unset during the merge.
    ///
    /// Reproduces the legacy behaviour where a configured `0` could not be
    /// told apart from "not configured".
    pub fn treat_zero_as_unset(mut self, enabled: bool) -> Self {
        self.zero_is_unset = enabled;
        self
    }

    /// Merge fragments (highest precedence first) and apply defaults.
    ///
    /// Scalars come from the first fragment that sets them. Lists and maps
    /// are taken whole from the first fragment with a non-empty value.
    /// Blank strings count as unset.
    pub fn merge(&self, fragments: &[&ConfigFragment]) -> ConfigFragment {
        let defaults = ConfigFragment::defaults();
        let text = |get: fn(&ConfigFragment) -> &Option<String>| first_text(fragments, get);
        let number_u32 = |get: fn(&ConfigFragment) -> Option<u32>| {
            first_number(fragments, get, self.zero_is_unset).or(get(&defaults))
        };
        let number_u64 = |get: fn(&ConfigFragment) -> Option<u64>| {
            first_number(fragments, get, self.zero_is_unset).or(get(&defaults))
        };

        let zone = text(|f| &f.zone).or_else(|| defaults.zone.clone());
        ConfigFragment {
            profile: text(|f| &f.profile),
            access_token: text(|f| &f.access_token),
            access_token_secret: text(|f| &f.access_token_secret),
            service_principal_id: text(|f| &f.service_principal_id),
            service_principal_key_id: text(|f| &f.service_principal_key_id),
            private_key: text(|f| &f.private_key),
            private_key_path: text(|f| &f.private_key_path),
            default_zone: text(|f| &f.default_zone).or_else(|| zone.clone()),
            zone,
            zones: fragments
                .iter()
                .find_map(|f| f.zones.as_ref().filter(|z| !z.is_empty()).cloned())
                .or_else(|| defaults.zones.clone()),
            api_root_url: text(|f| &f.api_root_url).or_else(|| defaults.api_root_url.clone()),
            accept_language: text(|f| &f.accept_language)
                .or_else(|| defaults.accept_language.clone()),
            retry_max: number_u32(|f| f.retry_max),
            retry_wait_min: number_u64(|f| f.retry_wait_min),
            retry_wait_max: number_u64(|f| f.retry_wait_max),
            api_request_timeout: number_u64(|f| f.api_request_timeout),
            api_request_rate_limit: number_u32(|f| f.api_request_rate_limit),
            trace: fragments.iter().find_map(|f| f.trace).or(defaults.trace),
            endpoints: fragments
                .iter()
                .find_map(|f| f.endpoints.as_ref().filter(|e| !e.is_empty()).cloned())
                .or_else(|| defaults.endpoints.clone()),
        }
    }

    /// Merge the three configuration sources and validate the result.
    pub fn resolve(
        &self,
        explicit: &ConfigFragment,
        environment: &ConfigFragment,
        profile: &ConfigFragment,
    ) -> Result<ResolvedConfig> {
        let merged = self.merge(&[explicit, environment, profile]);
        ResolvedConfig::from_merged(merged)
    }

    /// Resolve using the process environment and the profile store it points to.
    ///
    /// The profile is chosen by the explicit fragment, then
    /// `SAKURACLOUD_PROFILE`, then the store's current/default chain.
    pub fn resolve_from_environment(
        &self,
        explicit: &ConfigFragment,
        env: &Environment,
    ) -> Result<ResolvedConfig> {
        let store = ProfileStore::from_env(env)?;
        self.resolve_with_store(explicit, env, &store)
    }

    /// Like [`Resolver::resolve_from_environment`] with an explicit profile store.
    pub fn resolve_with_store(
        &self,
        explicit: &ConfigFragment,
        env: &Environment,
        store: &ProfileStore,
    ) -> Result<ResolvedConfig> {
        let environment = ConfigFragment::from_env(env)?;
        let name = first_text(&[explicit, &environment], |f| &f.profile);
        if let Some(name) = &name {
            debug!(profile = %name, "using profile");
        }
        let profile = store.load_profile(name.as_deref())?;
        self.resolve(explicit, &environment, &profile)
    }
}

fn first_text(
    fragments: &[&ConfigFragment],
    get: fn(&ConfigFragment) -> &Option<String>,
) -> Option<String> {
    fragments
        .iter()
        .filter_map(|f| get(f).as_deref())
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn first_number<T: Copy + Default + PartialEq>(
    fragments: &[&ConfigFragment],
    get: fn(&ConfigFragment) -> Option<T>,
    zero_is_unset: bool,
) -> Option<T> {
    fragments
        .iter()
        .filter_map(|f| get(f))
        .find(|v| !(zero_is_unset && *v == T::default()))
}
