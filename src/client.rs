//! Service client construction.
//!
//! [`ClientFactory::build`] turns a [`ResolvedConfig`] into a
//! [`ClientBundle`]: one shared [`CallerOptions`], its native big-integer
//! variant, and one client per [`ServiceId`]. Every option-based client
//! holds a clone of the same `Arc`, so all services see identical settings.
//!
//! Services whose SDK has no options entry point are configured through a
//! list of `KEY=VALUE` strings instead; [`environ_for`] is the only place
//! that translation happens.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::{
    env_vars, is_http_url, Credentials, Environment, PrivateKey, ResolvedConfig, RetryPolicy,
};
use crate::error::{ProviderError, Result};
use crate::logging::{API_TARGET, HTTP_TARGET};
use crate::types::{
    ServiceId, TraceFlags, TraceMode, Transport, PROVIDER_NAME, PROVIDER_VERSION,
};
use crate::waiter::{DELETION_BUDGET, DELETION_POLL};

/// Header asking the API to encode large integer IDs as JSON numbers.
pub const BIGINT_HEADER: &str = "X-Sakura-Bigint-As-Int";

/// The tool that invokes the provider, as named in the user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTool {
    /// Product name.
    pub name: String,
    /// Product version.
    pub version: String,
    /// Product homepage.
    pub url: String,
}

impl HostTool {
    /// Terraform at the given version.
    pub fn terraform(version: impl Into<String>) -> Self {
        Self {
            name: "HashiCorp Terraform".to_string(),
            version: version.into(),
            url: "https://www.terraform.io".to_string(),
        }
    }
}

impl Default for HostTool {
    fn default() -> Self {
        Self::terraform("0.0.0")
    }
}

/// Compose the outbound user agent.
///
/// `<host>/<version> (+<url>) <provider>/v<version>`, followed by the
/// operator suffix and then the host tool's suffix when either is set.
pub fn user_agent(host: &HostTool, env: &Environment) -> String {
    let mut ua = format!(
        "{}/{} (+{}) {}/v{}",
        host.name, host.version, host.url, PROVIDER_NAME, PROVIDER_VERSION
    );
    for key in [env_vars::APPEND_USER_AGENT, env_vars::HOST_APPEND_USER_AGENT] {
        if let Some(suffix) = env.get_non_empty(key) {
            ua.push(' ');
            ua.push_str(suffix);
            debug!(user_agent = %ua, source = key, "using modified user agent");
        }
    }
    ua
}

/// HTTP and runtime settings shared by option-based clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerOptions {
    /// Credentials sent with every request.
    pub credentials: Credentials,
    /// Accept-Language header value.
    pub accept_language: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retry bounds for 423/503 responses.
    pub retry: RetryPolicy,
    /// Requests per second.
    pub rate_limit: u32,
    /// User-Agent header value.
    pub user_agent: String,
    /// Enabled tracing layers.
    pub trace: TraceFlags,
    /// API root URL.
    pub api_root_url: String,
    /// Zone used by the API for global resources.
    pub default_zone: String,
    /// Extra headers set on every request.
    pub request_headers: BTreeMap<String, String>,
}

impl CallerOptions {
    /// Build options from a resolved configuration.
    pub fn from_config(cfg: &ResolvedConfig, user_agent: impl Into<String>) -> Self {
        Self {
            credentials: cfg.credentials.clone(),
            accept_language: cfg.accept_language.clone(),
            request_timeout: cfg.request_timeout,
            retry: cfg.retry,
            rate_limit: cfg.rate_limit,
            user_agent: user_agent.into(),
            trace: cfg.trace.flags(),
            api_root_url: cfg.api_root_url.clone(),
            default_zone: cfg.default_zone.clone(),
            request_headers: BTreeMap::new(),
        }
    }

    /// Add a header to every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    /// The same options, asking for native integer IDs.
    pub fn native_bigint(&self) -> Self {
        self.clone().with_header(BIGINT_HEADER, "0")
    }
}

/// A constructed service client.
pub trait ServiceClient: fmt::Debug + Send + Sync + 'static {
    /// The service this client talks to.
    fn service(&self) -> ServiceId;

    /// Base URL requests are sent to.
    fn endpoint(&self) -> &str;

    /// Downcasting support for [`ClientBundle::client_as`].
    fn as_any(&self) -> &dyn Any;
}

/// A client configured from [`CallerOptions`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    service: ServiceId,
    endpoint: String,
    options: Arc<CallerOptions>,
}

impl ApiClient {
    /// Create a client, using `endpoint` when given and the API root otherwise.
    pub fn new(
        service: ServiceId,
        options: Arc<CallerOptions>,
        endpoint: Option<&str>,
    ) -> Result<Self> {
        let endpoint = endpoint.unwrap_or(&options.api_root_url).to_string();
        if !is_http_url(&endpoint) {
            return Err(ProviderError::Configuration(format!(
                "endpoint for {} must be an http(s) URL, got {:?}",
                service, endpoint
            )));
        }
        Ok(Self {
            service,
            endpoint,
            options,
        })
    }

    /// The options this client was built with.
    pub fn options(&self) -> &Arc<CallerOptions> {
        &self.options
    }
}

impl ServiceClient for ApiClient {
    fn service(&self) -> ServiceId {
        self.service
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A client configured from `KEY=VALUE` strings.
#[derive(Debug, Clone)]
pub struct EnvironClient {
    service: ServiceId,
    endpoint: String,
    vars: BTreeMap<String, String>,
}

impl EnvironClient {
    /// Parse `environ` and create the client.
    ///
    /// Every entry must contain `=`, and credentials must be present.
    pub fn from_environ(service: ServiceId, environ: &[String]) -> Result<Self> {
        let mut vars = BTreeMap::new();
        for entry in environ {
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                ProviderError::Configuration(format!("malformed environment entry {:?}", entry))
            })?;
            vars.insert(key.to_string(), value.to_string());
        }

        let has_token = vars.contains_key(env_vars::ACCESS_TOKEN)
            && vars.contains_key(env_vars::ACCESS_TOKEN_SECRET);
        let has_principal = vars.contains_key(env_vars::SERVICE_PRINCIPAL_ID)
            && vars.contains_key(env_vars::SERVICE_PRINCIPAL_KEY_ID);
        if !has_token && !has_principal {
            return Err(ProviderError::Configuration(
                "no credentials in client environment".to_string(),
            ));
        }

        let endpoint = vars
            .get(&endpoint_var(service))
            .or_else(|| vars.get(env_vars::API_ROOT_URL))
            .cloned()
            .ok_or_else(|| {
                ProviderError::Configuration(format!("no endpoint configured for {}", service))
            })?;
        if !is_http_url(&endpoint) {
            return Err(ProviderError::Configuration(format!(
                "endpoint for {} must be an http(s) URL, got {:?}",
                service, endpoint
            )));
        }

        Ok(Self {
            service,
            endpoint,
            vars,
        })
    }

    /// Look up one of the variables the client was built from.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl ServiceClient for EnvironClient {
    fn service(&self) -> ServiceId {
        self.service
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Name of the endpoint override variable for `service`.
pub fn endpoint_var(service: ServiceId) -> String {
    format!(
        "{}{}",
        env_vars::ENDPOINT_PREFIX,
        service.as_str().to_ascii_uppercase()
    )
}

/// Translate a resolved configuration into `KEY=VALUE` strings.
///
/// Endpoint override variables already present in `env` are passed
/// through; an override in `cfg` for `service` replaces its variable.
pub fn environ_for(service: ServiceId, cfg: &ResolvedConfig, env: &Environment) -> Vec<String> {
    let mut vars = BTreeMap::new();
    match &cfg.credentials {
        Credentials::Token {
            access_token,
            access_token_secret,
        } => {
            vars.insert(env_vars::ACCESS_TOKEN, access_token.clone());
            vars.insert(env_vars::ACCESS_TOKEN_SECRET, access_token_secret.clone());
        }
        Credentials::ServicePrincipal {
            principal_id,
            key_id,
            private_key,
        } => {
            vars.insert(env_vars::SERVICE_PRINCIPAL_ID, principal_id.clone());
            vars.insert(env_vars::SERVICE_PRINCIPAL_KEY_ID, key_id.clone());
            match private_key {
                Some(PrivateKey::Path(path)) => {
                    vars.insert(env_vars::PRIVATE_KEY_PATH, path.display().to_string());
                }
                Some(PrivateKey::Inline(pem)) => {
                    vars.insert(env_vars::PRIVATE_KEY, pem.clone());
                }
                None => {}
            }
        }
    }
    vars.insert(env_vars::ZONE, cfg.zone.clone());
    vars.insert(env_vars::DEFAULT_ZONE, cfg.default_zone.clone());
    vars.insert(env_vars::API_ROOT_URL, cfg.api_root_url.clone());
    vars.insert(env_vars::ACCEPT_LANGUAGE, cfg.accept_language.clone());
    vars.insert(env_vars::RETRY_MAX, cfg.retry.max.to_string());
    vars.insert(env_vars::RETRY_WAIT_MIN, cfg.retry.wait_min.as_secs().to_string());
    vars.insert(env_vars::RETRY_WAIT_MAX, cfg.retry.wait_max.as_secs().to_string());
    vars.insert(env_vars::API_REQUEST_TIMEOUT, cfg.request_timeout.as_secs().to_string());
    vars.insert(env_vars::RATE_LIMIT, cfg.rate_limit.to_string());
    if cfg.trace != TraceMode::Off {
        vars.insert(env_vars::TRACE, cfg.trace.to_string());
    }

    let mut environ: Vec<String> = vars
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    let own_var = endpoint_var(service);
    let own_override = cfg.endpoint_override(service.as_str());
    for (key, value) in env.with_prefix(env_vars::ENDPOINT_PREFIX) {
        if own_override.is_some() && key == own_var {
            continue;
        }
        environ.push(format!("{}={}", key, value));
    }
    if let Some(url) = own_override {
        environ.push(format!("{}={}", own_var, url));
    }
    environ
}

/// What a constructor receives for one service.
#[derive(Debug, Clone)]
pub enum ClientInput {
    /// Shared options, or their big-integer variant.
    Options {
        /// The options to build from.
        options: Arc<CallerOptions>,
        /// Endpoint override for this service, if configured.
        endpoint: Option<String>,
    },
    /// `KEY=VALUE` strings.
    Environ(Vec<String>),
}

/// Builds one service client.
pub type Constructor =
    Arc<dyn Fn(ServiceId, ClientInput) -> Result<Arc<dyn ServiceClient>> + Send + Sync>;

fn default_constructor(service: ServiceId, input: ClientInput) -> Result<Arc<dyn ServiceClient>> {
    let client: Arc<dyn ServiceClient> = match input {
        ClientInput::Options { options, endpoint } => {
            Arc::new(ApiClient::new(service, options, endpoint.as_deref())?)
        }
        ClientInput::Environ(environ) => Arc::new(EnvironClient::from_environ(service, &environ)?),
    };
    Ok(client)
}

/// Tick and timeout for "is this still referenced" checks before deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceCheck {
    /// Poll interval.
    pub tick: Duration,
    /// Give up after this long.
    pub timeout: Duration,
}

impl Default for ReferenceCheck {
    fn default() -> Self {
        Self {
            tick: DELETION_POLL,
            timeout: DELETION_BUDGET,
        }
    }
}

/// Builds a [`ClientBundle`] from a resolved configuration.
#[derive(Clone)]
pub struct ClientFactory {
    host: HostTool,
    constructors: BTreeMap<ServiceId, Constructor>,
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("host", &self.host)
            .field("custom", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self::new(HostTool::default())
    }
}

impl ClientFactory {
    /// Create a factory for the given host tool.
    pub fn new(host: HostTool) -> Self {
        Self {
            host,
            constructors: BTreeMap::new(),
        }
    }

    /// Replace the constructor used for `service`.
    pub fn register<F>(mut self, service: ServiceId, constructor: F) -> Self
    where
        F: Fn(ServiceId, ClientInput) -> Result<Arc<dyn ServiceClient>> + Send + Sync + 'static,
    {
        self.constructors.insert(service, Arc::new(constructor));
        self
    }

    /// Build every service client.
    ///
    /// Construction stops at the first failure, which is returned wrapped
    /// with the failing service.
    pub fn build(&self, cfg: &ResolvedConfig, env: &Environment) -> Result<ClientBundle> {
        let ua = user_agent(&self.host, env);
        let options = Arc::new(CallerOptions::from_config(cfg, ua));
        let bigint_options = Arc::new(options.native_bigint());
        if options.trace.http {
            trace!(
                target: HTTP_TARGET,
                user_agent = %options.user_agent,
                timeout = ?options.request_timeout,
                rate_limit = options.rate_limit,
                "caller options"
            );
        }

        let mut clients: BTreeMap<ServiceId, Arc<dyn ServiceClient>> = BTreeMap::new();
        for service in ServiceId::ALL {
            let endpoint = cfg.endpoint_override(service.as_str()).map(str::to_string);
            let input = match service.transport() {
                Transport::Shared => ClientInput::Options {
                    options: Arc::clone(&options),
                    endpoint,
                },
                Transport::NativeBigInt => ClientInput::Options {
                    options: Arc::clone(&bigint_options),
                    endpoint,
                },
                Transport::Environ => ClientInput::Environ(environ_for(service, cfg, env)),
            };

            let client = match self.constructors.get(&service) {
                Some(custom) => custom(service, input),
                None => default_constructor(service, input),
            }
            .map_err(|err| ProviderError::construction(service, err))?;

            if options.trace.api {
                debug!(target: API_TARGET, %service, endpoint = client.endpoint(), "client ready");
            }
            clients.insert(service, client);
        }
        debug!(count = clients.len(), "service clients built");

        Ok(ClientBundle {
            options,
            bigint_options,
            clients,
            zone: cfg.zone.clone(),
            zones: cfg.zones.clone(),
            default_zone: cfg.default_zone.clone(),
            reference_check: ReferenceCheck::default(),
        })
    }
}

/// Every service client, ready for the life of the process.
#[derive(Debug, Clone)]
pub struct ClientBundle {
    options: Arc<CallerOptions>,
    bigint_options: Arc<CallerOptions>,
    clients: BTreeMap<ServiceId, Arc<dyn ServiceClient>>,
    zone: String,
    zones: Vec<String>,
    default_zone: String,
    reference_check: ReferenceCheck,
}

impl ClientBundle {
    /// The shared option object.
    pub fn options(&self) -> &Arc<CallerOptions> {
        &self.options
    }

    /// The option object asking for native integer IDs.
    pub fn bigint_options(&self) -> &Arc<CallerOptions> {
        &self.bigint_options
    }

    /// The client for `service`.
    pub fn client(&self, service: ServiceId) -> Result<&Arc<dyn ServiceClient>> {
        self.clients.get(&service).ok_or_else(|| {
            ProviderError::Configuration(format!("no client built for {}", service))
        })
    }

    /// The client for `service` as its concrete type.
    pub fn client_as<T: ServiceClient>(&self, service: ServiceId) -> Result<&T> {
        self.client(service)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "client for {} is not a {}",
                    service,
                    std::any::type_name::<T>()
                ))
            })
    }

    /// Zone used when a resource does not name one.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Zones the provider may operate in.
    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    /// Zone used for global resources.
    pub fn default_zone(&self) -> &str {
        &self.default_zone
    }

    /// Poll settings for reference checks before deletion.
    pub fn reference_check(&self) -> ReferenceCheck {
        self.reference_check
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFragment, Resolver};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resolved(explicit: ConfigFragment) -> ResolvedConfig {
        Resolver::new()
            .resolve(
                &explicit,
                &ConfigFragment::default(),
                &ConfigFragment::default(),
            )
            .unwrap()
    }

    fn token_config() -> ResolvedConfig {
        resolved(ConfigFragment::default().with_token("token", "secret"))
    }

    #[test]
    fn test_user_agent_without_suffix() {
        let ua = user_agent(&HostTool::terraform("1.9.0"), &Environment::empty());
        assert_eq!(
            ua,
            format!(
                "HashiCorp Terraform/1.9.0 (+https://www.terraform.io) terraform-provider-sakura/v{}",
                PROVIDER_VERSION
            )
        );
    }

    #[test]
    fn test_user_agent_suffix_order() {
        let env = Environment::empty()
            .with(env_vars::HOST_APPEND_USER_AGENT, "  host-suffix ")
            .with(env_vars::APPEND_USER_AGENT, "operator-suffix");
        let ua = user_agent(&HostTool::terraform("1.9.0"), &env);
        assert!(ua.ends_with(&format!(
            "terraform-provider-sakura/v{} operator-suffix host-suffix",
            PROVIDER_VERSION
        )));

        let env = Environment::empty().with(env_vars::HOST_APPEND_USER_AGENT, "   ");
        let ua = user_agent(&HostTool::terraform("1.9.0"), &env);
        assert!(ua.ends_with(&format!("v{}", PROVIDER_VERSION)));
    }

    #[test]
    fn test_bundle_shares_one_option_object() {
        let bundle = ClientFactory::default()
            .build(&token_config(), &Environment::empty())
            .unwrap();

        for service in [ServiceId::Iaas, ServiceId::Kms, ServiceId::SecretManager] {
            let client = bundle.client_as::<ApiClient>(service).unwrap();
            assert!(Arc::ptr_eq(client.options(), bundle.options()));
        }

        let storage = bundle.client_as::<ApiClient>(ServiceId::ObjectStorage).unwrap();
        assert!(Arc::ptr_eq(storage.options(), bundle.bigint_options()));
        assert!(!Arc::ptr_eq(storage.options(), bundle.options()));
    }

    #[test]
    fn test_bigint_variant_differs_only_by_header() {
        let options = CallerOptions::from_config(&token_config(), "ua");
        let bigint = options.native_bigint();
        assert_eq!(
            bigint.request_headers.get(BIGINT_HEADER).map(String::as_str),
            Some("0")
        );
        assert!(options.request_headers.is_empty());

        let mut stripped = bigint.clone();
        stripped.request_headers.clear();
        assert_eq!(stripped, options);
    }

    #[test]
    fn test_trace_flags_in_options() {
        let cfg = resolved(
            ConfigFragment::default()
                .with_token("token", "secret")
                .with_trace(TraceMode::Http),
        );
        let bundle = ClientFactory::default().build(&cfg, &Environment::empty()).unwrap();
        assert!(bundle.options().trace.http);
        assert!(!bundle.options().trace.api);
    }

    #[test]
    fn test_environ_adapter() {
        let cfg = resolved(
            ConfigFragment::default()
                .with_token("token", "secret")
                .with_zone("tk1a")
                .with_endpoint("addon", "https://addon.override"),
        );
        let env = Environment::empty()
            .with("SAKURA_ENDPOINTS_ADDON", "https://addon.process")
            .with("SAKURA_ENDPOINTS_WORKFLOWS", "https://wf.process")
            .with("UNRELATED", "x");

        let environ = environ_for(ServiceId::Addon, &cfg, &env);
        assert!(environ.contains(&"SAKURACLOUD_ACCESS_TOKEN=token".to_string()));
        assert!(environ.contains(&"SAKURACLOUD_ACCESS_TOKEN_SECRET=secret".to_string()));
        assert!(environ.contains(&"SAKURACLOUD_ZONE=tk1a".to_string()));
        assert!(environ.contains(&"SAKURACLOUD_RETRY_MAX=10".to_string()));
        assert!(environ.contains(&"SAKURA_ENDPOINTS_WORKFLOWS=https://wf.process".to_string()));
        assert!(environ.contains(&"SAKURA_ENDPOINTS_ADDON=https://addon.override".to_string()));
        assert!(!environ.iter().any(|e| e.contains("addon.process")));
        assert!(!environ.iter().any(|e| e.starts_with("UNRELATED")));
        assert!(!environ.iter().any(|e| e.starts_with("SAKURACLOUD_TRACE")));
    }

    #[test]
    fn test_environ_client_uses_endpoint_override() {
        let env = Environment::empty().with("SAKURA_ENDPOINTS_WORKFLOWS", "https://wf.process");
        let bundle = ClientFactory::default().build(&token_config(), &env).unwrap();

        let workflows = bundle.client_as::<EnvironClient>(ServiceId::Workflows).unwrap();
        assert_eq!(workflows.endpoint(), "https://wf.process");
        assert_eq!(workflows.var(env_vars::ACCESS_TOKEN), Some("token"));

        let addon = bundle.client(ServiceId::Addon).unwrap();
        assert_eq!(addon.endpoint(), crate::types::DEFAULT_API_ROOT_URL);
    }

    #[test]
    fn test_environ_client_rejects_bad_input() {
        let err = EnvironClient::from_environ(ServiceId::Addon, &["NOEQUALS".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));

        let err = EnvironClient::from_environ(
            ServiceId::Addon,
            &["SAKURACLOUD_API_ROOT_URL=https://example".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn test_endpoint_override_applies_to_option_clients() {
        let cfg = resolved(
            ConfigFragment::default()
                .with_token("token", "secret")
                .with_endpoint("kms", "https://kms.example"),
        );
        let bundle = ClientFactory::default().build(&cfg, &Environment::empty()).unwrap();
        assert_eq!(
            bundle.client(ServiceId::Kms).unwrap().endpoint(),
            "https://kms.example"
        );
        assert_eq!(
            bundle.client(ServiceId::Iaas).unwrap().endpoint(),
            crate::types::DEFAULT_API_ROOT_URL
        );
    }

    #[test]
    fn test_invalid_endpoint_names_service() {
        let cfg = resolved(
            ConfigFragment::default()
                .with_token("token", "secret")
                .with_endpoint("event_bus", "not-a-url"),
        );
        let err = ClientFactory::default()
            .build(&cfg, &Environment::empty())
            .unwrap_err();
        match err {
            ProviderError::ClientConstruction { service, .. } => {
                assert_eq!(service, ServiceId::EventBus)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_first_failure_aborts_build() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later_calls);

        let factory = ClientFactory::default()
            .register(ServiceId::Kms, |_, _| {
                Err(ProviderError::Configuration("kms is down".to_string()))
            })
            .register(ServiceId::SecretManager, move |service, input| {
                counter.fetch_add(1, Ordering::SeqCst);
                default_constructor(service, input)
            });

        let err = factory
            .build(&token_config(), &Environment::empty())
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ClientConstruction {
                service: ServiceId::Kms,
                ..
            }
        ));
        assert!(err.to_string().contains("kms is down"));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bundle_accessors() {
        let cfg = resolved(
            ConfigFragment::default()
                .with_token("token", "secret")
                .with_zone("tk1a")
                .with_zones(["tk1a", "is1a"]),
        );
        let bundle = ClientFactory::default().build(&cfg, &Environment::empty()).unwrap();
        assert_eq!(bundle.zone(), "tk1a");
        assert_eq!(bundle.default_zone(), "tk1a");
        assert_eq!(bundle.zones(), ["tk1a".to_string(), "is1a".to_string()]);
        assert_eq!(
            bundle.reference_check(),
            ReferenceCheck {
                tick: Duration::from_secs(5),
                timeout: Duration::from_secs(30 * 60),
            }
        );
        assert!(bundle.client_as::<EnvironClient>(ServiceId::Kms).is_err());
    }
}
