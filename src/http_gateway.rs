//! A [`PaymentGateway`] and [`ConfigurationSource`] backed by a remote JSON API.
//!
//! [`HttpGateway`] talks to three endpoints relative to its base URL:
//! `GET ./configuration`, `POST ./authorization_contexts` and `POST ./tokenize`.
//! Requests carry a bearer authorization key when one is configured.
//!
//! ```rust
//! use payswitch::http_gateway::HttpGateway;
//!
//! let gateway = HttpGateway::try_from("https://api.sandbox.example/v1").unwrap();
//! assert_eq!(gateway.tokenize_url().as_str(), "https://api.sandbox.example/v1/tokenize");
//! ```

use http::{HeaderMap, StatusCode};
use payswitch_types::config::Configuration;
use payswitch_types::error::GatewayError;
use payswitch_types::gateway::{ConfigurationSource, PaymentGateway};
use payswitch_types::proto::{AccountPayload, AuthorizationContext, ContextRequest, TokenizedAccount};
use reqwest::Client;
use std::fmt::Display;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

#[derive(Clone, Debug)]
struct ConfigurationCacheState {
    configuration: Configuration,
    expires_at: Instant,
}

/// TTL cache for the remote [`Configuration`].
///
/// Each clone has an independent cache state.
#[derive(Debug)]
pub struct ConfigurationCache {
    ttl: Duration,
    state: RwLock<Option<ConfigurationCacheState>>,
}

impl ConfigurationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Returns the cached configuration if still fresh.
    pub async fn get(&self) -> Option<Configuration> {
        let guard = self.state.read().await;
        let cache = guard.as_ref()?;
        if Instant::now() < cache.expires_at {
            Some(cache.configuration.clone())
        } else {
            None
        }
    }

    pub async fn set(&self, configuration: Configuration) {
        let mut guard = self.state.write().await;
        *guard = Some(ConfigurationCacheState {
            configuration,
            expires_at: Instant::now() + self.ttl,
        });
    }
}

impl Clone for ConfigurationCache {
    fn clone(&self) -> Self {
        Self::new(self.ttl)
    }
}

/// Errors constructing an [`HttpGateway`].
#[derive(Debug, thiserror::Error)]
pub enum HttpGatewayError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// JSON-over-HTTP client for the payment gateway API.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    base_url: Url,
    configuration_url: Url,
    authorization_contexts_url: Url,
    tokenize_url: Url,
    client: Client,
    headers: HeaderMap,
    authorization: Option<String>,
    timeout: Option<Duration>,
    configuration_cache: ConfigurationCache,
}

impl HttpGateway {
    /// Default TTL for the cached remote configuration (10 minutes).
    pub const DEFAULT_CONFIGURATION_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn configuration_url(&self) -> &Url {
        &self.configuration_url
    }

    pub fn authorization_contexts_url(&self) -> &Url {
        &self.authorization_contexts_url
    }

    pub fn tokenize_url(&self) -> &Url {
        &self.tokenize_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn configuration_cache(&self) -> &ConfigurationCache {
        &self.configuration_cache
    }

    /// Constructs a gateway from a base URL, deriving endpoint URLs relative to it.
    pub fn try_new(base_url: Url) -> Result<Self, HttpGatewayError> {
        let join = |path: &str, context: &'static str| {
            base_url
                .join(path)
                .map_err(|source| HttpGatewayError::UrlParse { context, source })
        };
        let configuration_url = join("./configuration", "Failed to construct ./configuration URL")?;
        let authorization_contexts_url = join(
            "./authorization_contexts",
            "Failed to construct ./authorization_contexts URL",
        )?;
        let tokenize_url = join("./tokenize", "Failed to construct ./tokenize URL")?;
        Ok(Self {
            client: Client::new(),
            base_url,
            configuration_url,
            authorization_contexts_url,
            tokenize_url,
            headers: HeaderMap::new(),
            authorization: None,
            timeout: None,
            configuration_cache: ConfigurationCache::new(Self::DEFAULT_CONFIGURATION_CACHE_TTL),
        })
    }

    /// Attaches custom headers to all future requests.
    pub fn with_headers(&self, headers: HeaderMap) -> Self {
        let mut this = self.clone();
        this.headers = headers;
        this
    }

    /// Sends `key` as a bearer token with all future requests.
    pub fn with_authorization<S: Into<String>>(&self, key: S) -> Self {
        let mut this = self.clone();
        this.authorization = Some(key.into());
        this
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }

    /// Sets the TTL for the cached remote configuration. [`Duration::ZERO`] disables caching.
    pub fn with_configuration_cache_ttl(&self, ttl: Duration) -> Self {
        let mut this = self.clone();
        this.configuration_cache = ConfigurationCache::new(ttl);
        this
    }

    /// Fetches the remote configuration, bypassing the cache.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "payswitch.http_gateway.configuration", skip_all, err)
    )]
    async fn configuration_inner(&self) -> Result<Configuration, GatewayError> {
        self.send_json(
            self.client.get(self.configuration_url.clone()),
            "GET /configuration",
        )
        .await
    }

    /// Returns the remote configuration, served from the cache while fresh.
    pub async fn fetch_configuration(&self) -> Result<Configuration, GatewayError> {
        if let Some(configuration) = self.configuration_cache.get().await {
            return Ok(configuration);
        }
        tracing::debug!("configuration cache miss");
        let configuration = self.configuration_inner().await?;
        self.configuration_cache.set(configuration.clone()).await;
        Ok(configuration)
    }

    /// Sends a `POST /authorization_contexts` request.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "payswitch.http_gateway.create_authorization_context", skip_all, err)
    )]
    pub async fn create_context(
        &self,
        request: &ContextRequest,
    ) -> Result<AuthorizationContext, GatewayError> {
        self.send_json(
            self.client
                .post(self.authorization_contexts_url.clone())
                .json(request),
            "POST /authorization_contexts",
        )
        .await
    }

    /// Sends a `POST /tokenize` request.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "payswitch.http_gateway.tokenize", skip_all, err)
    )]
    pub async fn tokenize_account(
        &self,
        account: &AccountPayload,
    ) -> Result<TokenizedAccount, GatewayError> {
        self.send_json(
            self.client.post(self.tokenize_url.clone()).json(account),
            "POST /tokenize",
        )
        .await
    }

    /// Applies headers, authorization and timeout, sends the request and decodes a `200 OK` body.
    ///
    /// `context` identifies the endpoint in logs (e.g. `"POST /tokenize"`).
    async fn send_json<R>(
        &self,
        mut req: reqwest::RequestBuilder,
        context: &'static str,
    ) -> Result<R, GatewayError>
    where
        R: serde::de::DeserializeOwned,
    {
        for (key, value) in self.headers.iter() {
            req = req.header(key, value);
        }
        if let Some(key) = &self.authorization {
            req = req.bearer_auth(key);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let result = match req.send().await {
            Ok(http_response) if http_response.status() == StatusCode::OK => http_response
                .json::<R>()
                .await
                .map_err(|e| transport_error(e, |e| GatewayError::Decode(e.to_string()))),
            Ok(http_response) => {
                let status = http_response.status().as_u16();
                match http_response.text().await {
                    Ok(body) => Err(GatewayError::HttpStatus { status, body }),
                    Err(e) => Err(transport_error(e, |e| {
                        GatewayError::Transport(e.to_string())
                    })),
                }
            }
            Err(e) => Err(transport_error(e, |e| GatewayError::Transport(e.to_string()))),
        };
        if let Err(error) = &result {
            tracing::debug!(context, %error, "gateway request failed");
        }
        record_result_on_span(&result);
        result
    }
}

fn transport_error(
    e: reqwest::Error,
    otherwise: impl FnOnce(reqwest::Error) -> GatewayError,
) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        otherwise(e)
    }
}

impl ConfigurationSource for HttpGateway {
    fn configuration(&self) -> impl Future<Output = Result<Configuration, GatewayError>> + Send {
        self.fetch_configuration()
    }
}

impl PaymentGateway for HttpGateway {
    fn create_authorization_context(
        &self,
        request: &ContextRequest,
    ) -> impl Future<Output = Result<AuthorizationContext, GatewayError>> + Send {
        self.create_context(request)
    }

    fn tokenize(
        &self,
        account: &AccountPayload,
    ) -> impl Future<Output = Result<TokenizedAccount, GatewayError>> + Send {
        self.tokenize_account(account)
    }
}

impl TryFrom<&str> for HttpGateway {
    type Error = HttpGatewayError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Normalize to a single trailing slash so relative joins stay under the base path.
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| HttpGatewayError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        HttpGateway::try_new(url)
    }
}

impl TryFrom<String> for HttpGateway {
    type Error = HttpGatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HttpGateway::try_from(value.as_str())
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
