//! Stored profile lookup.
//!
//! Profiles are JSON files shared with the `usacloud` CLI:
//!
//! ```text
//! <profile dir>/
//! ├── current              # name of the current profile
//! ├── default/config.json
//! └── staging/config.json
//! ```
//!
//! The directory is `$SAKURACLOUD_PROFILE_DIR` when set, `~/.usacloud`
//! otherwise.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{env_vars, ConfigFragment, Environment};
use crate::error::{ProviderError, Result};
use crate::types::{TraceMode, DEFAULT_PROFILE_NAME};

const CONFIG_FILE: &str = "config.json";
const CURRENT_FILE: &str = "current";

/// The attributes stored in a profile's `config.json`.
///
/// Unknown keys are ignored so profiles written by newer tools still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileValues {
    /// API access token.
    #[serde(rename = "AccessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// API access token secret.
    #[serde(rename = "AccessTokenSecret", default, skip_serializing_if = "Option::is_none")]
    pub access_token_secret: Option<String>,
    /// Service principal id.
    #[serde(rename = "ServicePrincipalID", default, skip_serializing_if = "Option::is_none")]
    pub service_principal_id: Option<String>,
    /// Service principal key id.
    #[serde(rename = "ServicePrincipalKeyID", default, skip_serializing_if = "Option::is_none")]
    pub service_principal_key_id: Option<String>,
    /// Inline PEM private key.
    #[serde(rename = "PrivateKey", default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Path to a PEM private key.
    #[serde(rename = "PrivateKeyPath", default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<String>,
    /// Default zone.
    #[serde(rename = "Zone", default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Available zones.
    #[serde(rename = "Zones", default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    /// Zone for global resources.
    #[serde(rename = "DefaultZone", default, skip_serializing_if = "Option::is_none")]
    pub default_zone: Option<String>,
    /// Raw trace setting, as accepted by [`TraceMode::parse`].
    #[serde(rename = "TraceMode", default, skip_serializing_if = "Option::is_none")]
    pub trace_mode: Option<String>,
    /// Accept-Language header value.
    #[serde(rename = "AcceptLanguage", default, skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    /// API root URL.
    #[serde(rename = "APIRootURL", default, skip_serializing_if = "Option::is_none")]
    pub api_root_url: Option<String>,
    /// Maximum API retries.
    #[serde(rename = "RetryMax", default, skip_serializing_if = "Option::is_none")]
    pub retry_max: Option<u32>,
    /// Minimum retry wait, in seconds.
    #[serde(rename = "RetryWaitMin", default, skip_serializing_if = "Option::is_none")]
    pub retry_wait_min: Option<u64>,
    /// Maximum retry wait, in seconds.
    #[serde(rename = "RetryWaitMax", default, skip_serializing_if = "Option::is_none")]
    pub retry_wait_max: Option<u64>,
    /// Per-request timeout, in seconds.
    #[serde(rename = "HTTPRequestTimeout", default, skip_serializing_if = "Option::is_none")]
    pub http_request_timeout: Option<u64>,
    /// API requests per second.
    #[serde(rename = "HTTPRequestRateLimit", default, skip_serializing_if = "Option::is_none")]
    pub http_request_rate_limit: Option<u32>,
    /// Per-service endpoint overrides.
    #[serde(rename = "Endpoints", default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<BTreeMap<String, String>>,
}

impl ProfileValues {
    /// Convert to a fragment tagged with the profile's name.
    pub fn into_fragment(self, name: &str) -> ConfigFragment {
        ConfigFragment {
            profile: Some(name.to_string()),
            access_token: self.access_token,
            access_token_secret: self.access_token_secret,
            service_principal_id: self.service_principal_id,
            service_principal_key_id: self.service_principal_key_id,
            private_key: self.private_key,
            private_key_path: self.private_key_path,
            zone: self.zone,
            zones: self.zones,
            default_zone: self.default_zone,
            api_root_url: self.api_root_url,
            accept_language: self.accept_language,
            retry_max: self.retry_max,
            retry_wait_min: self.retry_wait_min,
            retry_wait_max: self.retry_wait_max,
            api_request_timeout: self.http_request_timeout,
            api_request_rate_limit: self.http_request_rate_limit,
            trace: self
                .trace_mode
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(TraceMode::parse),
            endpoints: self.endpoints,
        }
    }
}

/// A directory of stored profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Use `dir` as the profile directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Locate the profile directory from the environment.
    pub fn from_env(env: &Environment) -> Result<Self> {
        if let Some(dir) = env.get_non_empty(env_vars::PROFILE_DIR) {
            return Ok(Self::new(dir));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            ProviderError::Configuration(format!(
                "cannot locate the home directory; set {}",
                env_vars::PROFILE_DIR
            ))
        })?;
        Ok(Self::new(home.join(".usacloud")))
    }

    /// The directory this store reads.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The profile marked current, if any.
    pub fn current_name(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.dir.join(CURRENT_FILE)) {
            Ok(content) => {
                let name = content.trim();
                Ok((!name.is_empty()).then(|| name.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns `true` if a profile with this name exists.
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.config_path(name).is_file()
    }

    /// Load a profile by name. A missing profile is an error.
    pub fn load(&self, name: &str) -> Result<ConfigFragment> {
        validate_name(name)?;
        let path = self.config_path(name);
        let content = fs::read_to_string(&path).map_err(|err| ProviderError::Profile {
            name: name.to_string(),
            reason: format!("failed to open {}: {}", path.display(), err),
        })?;
        let values: ProfileValues =
            serde_json::from_str(&content).map_err(|err| ProviderError::Profile {
                name: name.to_string(),
                reason: format!("invalid {}: {}", path.display(), err),
            })?;
        Ok(values.into_fragment(name))
    }

    /// Load the named profile, or the implicit one when no name is given.
    ///
    /// Without a name, the current profile is used; if none is marked
    /// current, the `default` profile; if that does not exist either, an
    /// empty fragment.
    pub fn load_profile(&self, name: Option<&str>) -> Result<ConfigFragment> {
        if let Some(name) = name {
            return self.load(name);
        }
        if let Some(current) = self.current_name()? {
            debug!(profile = %current, "using current profile");
            return self.load(&current);
        }
        if self.exists(DEFAULT_PROFILE_NAME) {
            return self.load(DEFAULT_PROFILE_NAME);
        }
        debug!(dir = %self.dir.display(), "no profile found, continuing without one");
        Ok(ConfigFragment::default())
    }

    /// Write a profile, creating its directory.
    pub fn save(&self, name: &str, values: &ProfileValues) -> Result<()> {
        validate_name(name)?;
        let path = self.config_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }

    /// Mark a profile as current.
    pub fn set_current(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(CURRENT_FILE), name)?;
        Ok(())
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.dir.join(name).join(CONFIG_FILE)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(ProviderError::Profile {
            name: name.to_string(),
            reason: "invalid profile name".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ProfileFixture;

    #[test]
    fn test_no_profiles_yields_empty_fragment() {
        let fixture = ProfileFixture::new();
        let fragment = fixture.store().load_profile(None).unwrap();
        assert_eq!(fragment, ConfigFragment::default());
    }

    #[test]
    fn test_default_profile_used_without_current() {
        let fixture =
            ProfileFixture::new().with_profile("default", ProfileFixture::values("token"));
        let fragment = fixture.store().load_profile(None).unwrap();
        assert_eq!(fragment.profile.as_deref(), Some("default"));
        assert_eq!(fragment.access_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_current_profile_preferred() {
        let fixture = ProfileFixture::new()
            .with_profile("default", ProfileFixture::values("default-token"))
            .with_profile("test", ProfileFixture::values("test-token"))
            .with_current("test");
        let fragment = fixture.store().load_profile(None).unwrap();
        assert_eq!(fragment.profile.as_deref(), Some("test"));
        assert_eq!(fragment.access_token.as_deref(), Some("test-token"));
    }

    #[test]
    fn test_named_profile_missing_is_error() {
        let fixture =
            ProfileFixture::new().with_profile("default", ProfileFixture::values("token"));
        let err = fixture.store().load_profile(Some("test")).unwrap_err();
        match err {
            ProviderError::Profile { name, reason } => {
                assert_eq!(name, "test");
                assert!(reason.contains("config.json"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_profile_name_rejected() {
        let fixture = ProfileFixture::new();
        assert!(fixture.store().load("../etc").is_err());
        assert!(fixture.store().load("a/b").is_err());
        assert!(!fixture.store().exists("../etc"));
    }

    #[test]
    fn test_profile_file_attributes() {
        let fixture = ProfileFixture::new();
        std::fs::create_dir_all(fixture.path().join("full")).unwrap();
        std::fs::write(
            fixture.path().join("full").join("config.json"),
            r#"{
                "AccessToken": "token",
                "AccessTokenSecret": "secret",
                "Zone": "dummy1",
                "Zones": ["dummy1", "dummy2"],
                "UserAgent": "ignored",
                "AcceptLanguage": "ja-JP",
                "RetryMax": 1,
                "RetryWaitMin": 2,
                "RetryWaitMax": 3,
                "HTTPRequestTimeout": 6,
                "HTTPRequestRateLimit": 7,
                "APIRootURL": "https://example.test",
                "TraceMode": "http",
                "FakeMode": true
            }"#,
        )
        .unwrap();

        let fragment = fixture.store().load("full").unwrap();
        assert_eq!(fragment.access_token.as_deref(), Some("token"));
        assert_eq!(
            fragment.zones,
            Some(vec!["dummy1".to_string(), "dummy2".to_string()])
        );
        assert_eq!(fragment.retry_max, Some(1));
        assert_eq!(fragment.retry_wait_min, Some(2));
        assert_eq!(fragment.retry_wait_max, Some(3));
        assert_eq!(fragment.api_request_timeout, Some(6));
        assert_eq!(fragment.api_request_rate_limit, Some(7));
        assert_eq!(fragment.trace, Some(TraceMode::Http));
    }

    #[test]
    fn test_malformed_profile_is_error() {
        let fixture = ProfileFixture::new();
        std::fs::create_dir_all(fixture.path().join("broken")).unwrap();
        std::fs::write(fixture.path().join("broken").join("config.json"), "{not json").unwrap();
        let err = fixture.store().load("broken").unwrap_err();
        assert!(matches!(err, ProviderError::Profile { .. }));
    }

    #[test]
    fn test_store_from_env_uses_profile_dir() {
        let env = Environment::empty().with(env_vars::PROFILE_DIR, "/tmp/profiles");
        let store = ProfileStore::from_env(&env).unwrap();
        assert_eq!(store.dir(), Path::new("/tmp/profiles"));
    }
}
