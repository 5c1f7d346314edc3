//! Hosted auth provider
//!
//! [`AuthProvider`] is the only outbound seam of the callback flow. The
//! production implementation talks to a GoTrue-compatible auth service
//! (the API behind the hosted backend the portal uses).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::session::{Session, SessionUser};
use crate::config::ProviderConfig;
use crate::error::Error;
use crate::Result;

/// Outbound auth operations used by the callback flow
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange an authorization code (and its verifier) for a session
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> Result<Session>;

    /// Adopt tokens that arrived directly in the redirect
    async fn set_session(&self, access_token: &str, refresh_token: Option<&str>) -> Result<Session>;

    /// Whether [`exchange_code`](Self::exchange_code) accepts a missing verifier
    fn supports_verifierless_exchange(&self) -> bool {
        false
    }
}

/// PKCE token request
#[derive(Debug, Serialize)]
struct PkceExchangeRequest<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

/// OTP / magic link request
#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
    code_challenge: &'a str,
    code_challenge_method: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for SessionUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Error bodies come in two shapes depending on the endpoint
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// GoTrue-compatible hosted auth service client
#[derive(Clone)]
pub struct GoTrueProvider {
    base_url: String,
    anon_key: String,
    timeout: Duration,
    http_client: Client,
}

impl GoTrueProvider {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid auth provider URL {:?}: {}", base_url, e)))?;

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            anon_key: anon_key.to_string(),
            timeout,
            http_client,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Config(
                "Auth provider URL is not set. Run 'scope-auth init' or set SCOPE_AUTH_URL.".to_string(),
            ));
        }
        Self::new(&config.url, &config.anon_key, Duration::from_secs(config.timeout_secs))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    /// Ask the service to email a magic link that redirects to `redirect_to`
    pub async fn send_magic_link(&self, email: &str, redirect_to: &str, code_challenge: &str) -> Result<()> {
        let mut url = Url::parse(&self.endpoint("/otp"))?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);

        let request = OtpRequest {
            email,
            create_user: true,
            code_challenge,
            code_challenge_method: super::pkce::CHALLENGE_METHOD,
        };

        let response = self.http_client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        tracing::info!("Magic link requested for {}", super::preview(email));
        Ok(())
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Http(err)
        }
    }
}

#[async_trait]
impl AuthProvider for GoTrueProvider {
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> Result<Session> {
        let code_verifier = code_verifier
            .ok_or_else(|| Error::Auth("PKCE exchange requires a code verifier".to_string()))?;

        let request = PkceExchangeRequest {
            auth_code: code,
            code_verifier,
        };

        let response = self.http_client
            .post(self.endpoint("/token"))
            .query(&[("grant_type", "pkce")])
            .header("apikey", &self.anon_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let token: TokenResponse = decode_body(response).await?;
        let mut session = Session::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            token.user.map(SessionUser::from),
        );
        if let Some(token_type) = token.token_type {
            session.token_type = token_type;
        }
        Ok(session)
    }

    async fn set_session(&self, access_token: &str, refresh_token: Option<&str>) -> Result<Session> {
        let response = self.http_client
            .get(self.endpoint("/user"))
            .bearer_auth(access_token)
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let user: UserResponse = decode_body(response).await?;
        Ok(Session::new(
            access_token.to_string(),
            refresh_token.map(str::to_string),
            None,
            Some(user.into()),
        ))
    }
}

/// Decode a success body.
///
/// The provider has already acted on the request (a code is spent), so an
/// unreadable body is a provider error rather than a transport error.
async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let invalid = |message: String| Error::Provider {
        status,
        error_code: Some("invalid_response".to_string()),
        message,
    };

    let body = response
        .bytes()
        .await
        .map_err(|e| invalid(format!("Failed to read response body: {}", e)))?;
    serde_json::from_slice(&body).map_err(|e| invalid(format!("Unexpected response body: {}", e)))
}

async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    let message = body.msg
        .or(body.error_description)
        .or(body.message)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text.clone()
            }
        });

    tracing::warn!("Auth provider returned {}: {}", status, message);

    Error::Provider {
        status: status.as_u16(),
        error_code: body.error_code.or(body.error),
        message,
    }
}
