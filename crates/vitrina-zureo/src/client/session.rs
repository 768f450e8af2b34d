//! Bearer-token session for `ZureoClient`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::error::ZureoError;
use crate::parse::parse_login_response;

use super::{truncate_body, ZureoClient};

/// A token is refreshed this long before Zureo says it expires.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub(crate) fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

impl ZureoClient {
    /// Returns a bearer token, logging in only when there is no cached token
    /// or the cached one is about to expire.
    ///
    /// # Errors
    ///
    /// - [`ZureoError::Authentication`] if Zureo rejects the credentials.
    /// - [`ZureoError::MalformedResponse`] if the login body lacks a token or expiry.
    /// - [`ZureoError::Http`] on network failure.
    pub async fn valid_token(&self) -> Result<String, ZureoError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh_at(Utc::now()) {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.login().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token so the next call logs in again.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn login(&self) -> Result<CachedToken, ZureoError> {
        let url = self.endpoint("sdk/v1/security/login", &[])?;

        // Zureo expects Basic base64(username:password:domain); reqwest joins
        // username and password with ':' so the domain rides in the password.
        let composite_password = format!(
            "{}:{}",
            self.credentials.password, self.credentials.domain
        );

        let response = self
            .client
            .post(url)
            .basic_auth(&self.credentials.username, Some(composite_password))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                username = %self.credentials.username,
                "zureo login rejected"
            );
            return Err(ZureoError::Authentication {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let (token, expires_at) = parse_login_response(&body)?;
        tracing::info!(%expires_at, "zureo login succeeded");

        Ok(CachedToken { token, expires_at })
    }
}
