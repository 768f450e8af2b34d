//! HTTP client for the Zureo SDK.

mod fetch_all;
mod images;
mod session;

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tokio::sync::Mutex;

use vitrina_core::{AppConfig, ZureoCredentials};

use crate::error::ZureoError;
use crate::parse::parse_products_page;
use crate::types::ZureoProduct;

use session::CachedToken;

const DEFAULT_BASE_URL: &str = "https://api.zureo.com";
const USER_AGENT: &str = "vitrina/0.1 (catalog-sync)";

/// Maximum number of pages to fetch before returning an error.
/// Prevents infinite loops when Zureo cycles the same page.
pub(super) const MAX_PAGES: usize = 500;

/// Error bodies are cut to this many characters before being stored.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Pacing and retry knobs for [`ZureoClient`].
#[derive(Debug, Clone)]
pub struct ZureoSettings {
    pub request_timeout_secs: u64,
    pub page_size: u32,
    /// Delay before every page except the first.
    pub page_delay: Duration,
    /// Every N-th page waits [`Self::slow_page_delay`] instead. `0` disables.
    pub slow_page_every: u32,
    pub slow_page_delay: Duration,
    pub rate_limit_cooldown: Duration,
    pub max_rate_limit_retries: u32,
}

impl ZureoSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            request_timeout_secs: config.zureo_request_timeout_secs,
            page_size: config.zureo_page_size,
            page_delay: Duration::from_millis(config.zureo_page_delay_ms),
            slow_page_every: config.zureo_slow_page_every,
            slow_page_delay: Duration::from_millis(config.zureo_slow_page_delay_ms),
            rate_limit_cooldown: Duration::from_secs(config.zureo_rate_limit_cooldown_secs),
            max_rate_limit_retries: config.zureo_max_rate_limit_retries,
        }
    }

    /// No delays or cooldowns; for tests against a local mock server.
    #[must_use]
    pub fn immediate(page_size: u32, max_rate_limit_retries: u32) -> Self {
        Self {
            request_timeout_secs: 5,
            page_size,
            page_delay: Duration::ZERO,
            slow_page_every: 0,
            slow_page_delay: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
            max_rate_limit_retries,
        }
    }
}

/// Client for the Zureo SDK.
///
/// Owns the bearer token cache: logins happen lazily on the first data call
/// and again only when the token nears expiry or Zureo answers 401. Use
/// [`ZureoClient::new`] for production or [`ZureoClient::with_base_url`] to
/// point at a mock server in tests.
pub struct ZureoClient {
    client: Client,
    base_url: Url,
    credentials: ZureoCredentials,
    settings: ZureoSettings,
    token: Mutex<Option<CachedToken>>,
}

impl ZureoClient {
    /// Creates a client pointed at the production Zureo API.
    ///
    /// # Errors
    ///
    /// Returns [`ZureoError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(credentials: ZureoCredentials, settings: ZureoSettings) -> Result<Self, ZureoError> {
        Self::with_base_url(credentials, settings, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ZureoError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ZureoError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        credentials: ZureoCredentials,
        settings: ZureoSettings,
        base_url: &str,
    ) -> Result<Self, ZureoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        // Exactly one trailing slash, so `join("sdk/v1/...")` appends instead
        // of replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ZureoError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ZureoError::InvalidBaseUrl {
                base_url: normalised,
                reason: "URL cannot be used as a base".to_owned(),
            });
        }

        Ok(Self {
            client,
            base_url,
            credentials,
            settings,
            token: Mutex::new(None),
        })
    }

    /// Creates a client from application config. Credentials must already
    /// have been validated with [`AppConfig::zureo_credentials`].
    ///
    /// # Errors
    ///
    /// See [`ZureoClient::with_base_url`].
    pub fn from_app_config(
        config: &AppConfig,
        credentials: ZureoCredentials,
    ) -> Result<Self, ZureoError> {
        Self::with_base_url(
            credentials,
            ZureoSettings::from_app_config(config),
            &config.zureo_base_url,
        )
    }

    #[must_use]
    pub fn settings(&self) -> &ZureoSettings {
        &self.settings
    }

    /// Fetches one page of products starting at `offset`. A 429 surfaces as
    /// [`ZureoError::RateLimited`]; the caller decides whether to retry.
    ///
    /// # Errors
    ///
    /// - [`ZureoError::RateLimited`] on HTTP 429.
    /// - [`ZureoError::Authentication`] if login fails or a fresh token is rejected.
    /// - [`ZureoError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ZureoError::MalformedResponse`] if the body is not a product page.
    /// - [`ZureoError::Http`] on network failure.
    pub async fn fetch_products_page(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ZureoProduct>, ZureoError> {
        let url = self.endpoint(
            "sdk/v1/product/all",
            &[
                ("emp", self.credentials.company_id.clone()),
                ("from", offset.to_string()),
                ("qty", limit.to_string()),
            ],
        )?;
        let context = format!("product/all from={offset}");

        let response = self.get_authorized(&url).await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ZureoError::RateLimited { endpoint: context });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZureoError::UnexpectedStatus {
                status: status.as_u16(),
                context,
                body: truncate_body(&body),
            });
        }

        let body = response.text().await?;
        parse_products_page(&body, &context)
    }

    /// Sends an authenticated GET. On 401 the cached token is dropped and the
    /// request is retried once with a fresh login.
    async fn get_authorized(&self, url: &Url) -> Result<reqwest::Response, ZureoError> {
        let token = self.valid_token().await?;
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!(path = url.path(), "zureo rejected bearer token; logging in again");
        self.invalidate_token().await;

        let token = self.valid_token().await?;
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(ZureoError::Authentication {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(response)
    }

    /// Builds an endpoint URL with percent-encoded query parameters.
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ZureoError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ZureoError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_owned();
    }
    let mut cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
