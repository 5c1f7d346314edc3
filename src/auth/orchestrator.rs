//! Callback orchestration
//!
//! Turns one callback URL into one terminal outcome:
//!
//! ```text
//! Start -> ErrorReported                                   (no provider call)
//!       -> Malformed                                       (no provider call)
//!       -> TokenFlow        -> ExchangeSucceeded | ExchangeFailed
//!       -> CodeFlowReady    -> ExchangeSucceeded | ExchangeFailed
//!       -> CodeFlowDegraded -> ExchangeSucceeded | ExchangeFailed
//! ```
//!
//! At most one provider call is made per callback. Authorization codes are
//! single-use, so a failed exchange is reported, never retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use super::bridge::{persist_url_verifier, BridgeOutcome};
use super::failure::{CallbackError, ErrorCategory};
use super::locator::{locate_artifact, PkceArtifact, VerifierKeys};
use super::pages;
use super::provider::AuthProvider;
use super::session::Session;
use super::storage::{RequestStores, VerifierStore};
use super::url_params::extract_param;
use crate::config::{Config, SessionCookieConfig};
use crate::error::Error;

/// States of the callback state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    ErrorReported,
    Malformed,
    TokenFlow,
    CodeFlowReady,
    CodeFlowDegraded,
    ExchangeSucceeded,
    ExchangeFailed,
}

/// What to send back to the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResponse {
    Redirect { location: String },
    Page { status: u16, html: String },
}

/// Result of handling one callback
#[derive(Debug)]
pub struct CallbackOutcome {
    /// State entered from `Start`
    pub branch: FlowState,
    /// Final state
    pub terminal: FlowState,
    pub session: Option<Session>,
    pub error: Option<CallbackError>,
    pub bridge: BridgeOutcome,
    pub response: CallbackResponse,
}

impl CallbackOutcome {
    pub fn is_success(&self) -> bool {
        self.terminal == FlowState::ExchangeSucceeded
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.error.as_ref().map(CallbackError::category)
    }
}

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct CallbackSettings {
    pub success_path: String,
    pub login_path: String,
    pub exchange_timeout: Duration,
    pub keys: VerifierKeys,
    pub verifier_max_age: Duration,
    pub session_cookies: SessionCookieConfig,
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for CallbackSettings {
    fn from(config: &Config) -> Self {
        Self {
            success_path: config.callback.success_path.clone(),
            login_path: config.callback.login_path.clone(),
            exchange_timeout: config.callback.exchange_timeout(),
            keys: VerifierKeys::from(&config.verifier),
            verifier_max_age: config.verifier.max_age(),
            session_cookies: config.session.clone(),
        }
    }
}

/// Handles auth callbacks against one provider
pub struct CallbackHandler<P: ?Sized> {
    provider: Arc<P>,
    settings: CallbackSettings,
}

impl<P: AuthProvider + ?Sized> CallbackHandler<P> {
    pub fn new(provider: Arc<P>, settings: CallbackSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &CallbackSettings {
        &self.settings
    }

    /// Pick the branch out of `Start` for an artifact
    pub fn classify(artifact: &PkceArtifact) -> FlowState {
        if artifact.error.is_some() {
            FlowState::ErrorReported
        } else if artifact.code.is_some() {
            if artifact.code_verifier.is_some() {
                FlowState::CodeFlowReady
            } else {
                FlowState::CodeFlowDegraded
            }
        } else if artifact.token.is_some() {
            FlowState::TokenFlow
        } else {
            FlowState::Malformed
        }
    }

    /// Process one callback URL with the stores of its execution context
    pub async fn handle(&self, url: &str, stores: &RequestStores) -> CallbackOutcome {
        let span = tracing::info_span!("callback", request_id = %Uuid::new_v4());
        self.run(url, stores).instrument(span).await
    }

    async fn run(&self, url: &str, stores: &RequestStores) -> CallbackOutcome {
        tracing::info!(
            "Processing callback {} ({:?} context)",
            super::preview_url(url),
            stores.context()
        );

        let artifact = locate_artifact(url, &stores.cookies, stores.storage.as_ref(), &self.settings.keys);
        let next = safe_redirect_path(extract_param(url, "redirect"));
        let branch = Self::classify(&artifact);
        tracing::info!("Start -> {:?}", branch);

        let mut bridge = BridgeOutcome::NotApplicable;

        let result = match branch {
            FlowState::ErrorReported => {
                let error = artifact.error.clone().map(CallbackError::Provider);
                Err(error.unwrap_or(CallbackError::NoCode))
            }
            FlowState::TokenFlow => match artifact.token.as_deref() {
                Some(token) => {
                    self.call_provider(self.provider.set_session(token, artifact.refresh_token.as_deref()))
                        .await
                }
                None => Err(CallbackError::NoCode),
            },
            FlowState::CodeFlowReady | FlowState::CodeFlowDegraded => {
                bridge = persist_url_verifier(
                    &artifact,
                    &stores.cookies,
                    &self.settings.keys,
                    self.settings.verifier_max_age,
                );
                self.exchange(&artifact).await
            }
            _ => Err(CallbackError::NoCode),
        };

        let called_provider = matches!(&result, Ok(_) | Err(CallbackError::ExchangeFailed { .. }) | Err(CallbackError::Transport { .. }));
        let terminal = match &result {
            Ok(_) => FlowState::ExchangeSucceeded,
            Err(_) if called_provider => FlowState::ExchangeFailed,
            Err(_) => branch,
        };
        tracing::info!("{:?} -> {:?}", branch, terminal);

        match result {
            Ok(session) => {
                self.clear_verifiers(&artifact, stores);
                self.issue_session_cookies(&session, stores);
                let location = next.unwrap_or_else(|| self.settings.success_path.clone());
                tracing::info!("Signed in {}, redirecting to {}", session.email().unwrap_or("user"), location);
                CallbackOutcome {
                    branch,
                    terminal,
                    session: Some(session),
                    error: None,
                    bridge,
                    response: CallbackResponse::Redirect { location },
                }
            }
            Err(error) => {
                tracing::error!("Callback failed [{}]: {}", error.category().as_str(), error);
                let response = self.failure_response(&error, next.as_deref());
                CallbackOutcome {
                    branch,
                    terminal,
                    session: None,
                    error: Some(error),
                    bridge,
                    response,
                }
            }
        }
    }

    async fn exchange(&self, artifact: &PkceArtifact) -> Result<Session, CallbackError> {
        let Some(code) = artifact.code.as_deref() else {
            return Err(CallbackError::NoCode);
        };

        match artifact.code_verifier.as_deref() {
            Some(verifier) => {
                tracing::debug!("Exchanging code with verifier from {:?}", artifact.verifier_source);
                self.call_provider(self.provider.exchange_code(code, Some(verifier))).await
            }
            None if self.provider.supports_verifierless_exchange() => {
                tracing::warn!("No verifier found, attempting verifier-less exchange");
                self.call_provider(self.provider.exchange_code(code, None)).await
            }
            None => Err(CallbackError::MissingVerifier {
                code: code.to_string(),
            }),
        }
    }

    async fn call_provider<F>(&self, call: F) -> Result<Session, CallbackError>
    where
        F: Future<Output = crate::Result<Session>>,
    {
        match tokio::time::timeout(self.settings.exchange_timeout, call).await {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(e)) => Err(CallbackError::from_provider(e)),
            Err(_) => Err(CallbackError::from_provider(Error::Timeout(self.settings.exchange_timeout))),
        }
    }

    /// Drop every persisted copy of the verifier once the flow is done
    fn clear_verifiers(&self, artifact: &PkceArtifact, stores: &RequestStores) {
        let keys = &self.settings.keys;

        if stores.cookies.is_writable() {
            let mut names = vec![keys.cookie_name.clone()];
            if let Some(code) = artifact.code.as_deref() {
                names.push(keys.code_cookie(code));
            }
            for name in names {
                if let Err(e) = stores.cookies.remove(&name) {
                    tracing::warn!("Failed to clear cookie {}: {}", name, e);
                }
            }
        }

        if stores.storage.is_writable() {
            if let Err(e) = stores.storage.remove(&keys.storage_key) {
                tracing::warn!("Failed to clear stored verifier: {}", e);
            }
        }
    }

    /// Hand a fresh session to the browser through response cookies
    fn issue_session_cookies(&self, session: &Session, stores: &RequestStores) {
        if !stores.cookies.is_writable() {
            return;
        }
        let names = &self.settings.session_cookies;

        let access_max_age = session
            .expires_at
            .map(|at| (at - Utc::now()).num_seconds().max(0) as u64)
            .unwrap_or(names.access_max_age_secs);

        // (name, value, max-age, http-only)
        let mut cookies = vec![(
            names.access_cookie.as_str(),
            session.access_token.as_str(),
            access_max_age,
            true,
        )];
        if let Some(refresh) = session.refresh_token.as_deref() {
            cookies.push((names.refresh_cookie.as_str(), refresh, names.refresh_max_age_secs, true));
        }
        if let Some(email) = session.email() {
            cookies.push((names.email_cookie.as_str(), email, names.email_max_age_secs, false));
        }

        for (name, value, max_age, http_only) in cookies {
            let max_age = Duration::from_secs(max_age);
            let queued = if http_only {
                stores.cookies.set_http_only(name, value, max_age)
            } else {
                stores.cookies.set(name, value, max_age)
            };
            if let Err(e) = queued {
                tracing::warn!("Failed to set cookie {}: {}", name, e);
            }
        }
    }

    fn failure_response(&self, error: &CallbackError, next: Option<&str>) -> CallbackResponse {
        let login_url = self.login_url(error, next);

        match error {
            CallbackError::MissingVerifier { code } => CallbackResponse::Page {
                status: 400,
                html: pages::missing_verifier_page(code, &login_url, &self.settings.keys.storage_key),
            },
            _ => CallbackResponse::Redirect { location: login_url },
        }
    }

    /// `<login_path>?error=<category>&message=<text>[&redirect=<path>]`
    pub fn login_url(&self, error: &CallbackError, next: Option<&str>) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("error", error.category().as_str())
            .append_pair("message", &error.user_message());
        if let Some(next) = next {
            query.append_pair("redirect", next);
        }
        format!("{}?{}", self.settings.login_path, query.finish())
    }
}

/// Accept only same-site absolute paths as post-login destinations
pub fn safe_redirect_path(candidate: Option<String>) -> Option<String> {
    let path = candidate?;
    let safe = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control);
    if safe {
        Some(path)
    } else {
        tracing::warn!("Ignoring unsafe redirect target {:?}", path);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionUser;
    use crate::auth::storage::{BrowserLocalStore, VerifierStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Accepts exactly one code/verifier pair and one access token
    struct StubProvider {
        code: &'static str,
        verifier: &'static str,
        verifierless: bool,
        delay: Duration,
        exchange_calls: AtomicUsize,
        set_session_calls: AtomicUsize,
    }

    impl StubProvider {
        fn new() -> Self {
            Self {
                code: "abc123",
                verifier: "def456",
                verifierless: false,
                delay: Duration::ZERO,
                exchange_calls: AtomicUsize::new(0),
                set_session_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.exchange_calls.load(Ordering::SeqCst) + self.set_session_calls.load(Ordering::SeqCst)
        }
    }

    fn session(token: &str) -> Session {
        Session::new(
            token.to_string(),
            None,
            Some(3600),
            Some(SessionUser {
                id: "user-1".to_string(),
                email: Some("staff@shinhan.com".to_string()),
            }),
        )
    }

    #[async_trait]
    impl AuthProvider for StubProvider {
        async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> crate::Result<Session> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;

            if code == "stale" {
                return Err(Error::Provider {
                    status: 403,
                    error_code: Some("flow_state_expired".to_string()),
                    message: "Flow state has expired".to_string(),
                });
            }
            let verifier_ok = code_verifier.map(|v| v == self.verifier).unwrap_or(self.verifierless);
            if code == self.code && verifier_ok {
                Ok(session("access"))
            } else {
                Err(Error::Provider {
                    status: 404,
                    error_code: Some("flow_state_not_found".to_string()),
                    message: "invalid flow state, no valid flow state found".to_string(),
                })
            }
        }

        async fn set_session(&self, access_token: &str, _refresh_token: Option<&str>) -> crate::Result<Session> {
            self.set_session_calls.fetch_add(1, Ordering::SeqCst);
            if access_token == "good-token" {
                Ok(session(access_token))
            } else {
                Err(Error::Provider {
                    status: 401,
                    error_code: Some("bad_jwt".to_string()),
                    message: "invalid JWT".to_string(),
                })
            }
        }

        fn supports_verifierless_exchange(&self) -> bool {
            self.verifierless
        }
    }

    fn handler(provider: StubProvider) -> (CallbackHandler<StubProvider>, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        (CallbackHandler::new(provider.clone(), CallbackSettings::default()), provider)
    }

    fn set_cookie_names(stores: &RequestStores) -> Vec<(String, u64)> {
        stores
            .cookies
            .take_set_cookies()
            .into_iter()
            .map(|c| (c.name, c.max_age.as_secs()))
            .collect()
    }

    #[tokio::test]
    async fn test_standard_flow_succeeds() {
        let (handler, provider) = handler(StubProvider::new());
        let stores = RequestStores::server(Some("code_verifier_abc123=def456"), false);

        let outcome = handler.handle("https://x/callback?code=abc123", &stores).await;

        assert_eq!(outcome.branch, FlowState::CodeFlowReady);
        assert_eq!(outcome.terminal, FlowState::ExchangeSucceeded);
        assert!(outcome.is_success());
        assert_eq!(outcome.response, CallbackResponse::Redirect { location: "/".to_string() });
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 1);

        let cleared = set_cookie_names(&stores);
        assert!(cleared.contains(&("scope_pkce_verifier".to_string(), 0)));
        assert!(cleared.contains(&("code_verifier_abc123".to_string(), 0)));
    }

    #[tokio::test]
    async fn test_success_issues_session_cookies() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(Some("code_verifier_abc123=def456"), false);

        handler.handle("https://x/callback?code=abc123", &stores).await;

        let cookies = stores.cookies.take_set_cookies();
        let access = cookies.iter().find(|c| c.name == "scope_access_token").unwrap();
        assert_eq!(access.value, "access");
        assert!(access.http_only);
        assert!(access.max_age > Duration::from_secs(3500) && access.max_age <= Duration::from_secs(3600));

        let email = cookies.iter().find(|c| c.name == "verify_email").unwrap();
        assert_eq!(email.value, "staff@shinhan.com");
        assert_eq!(email.max_age, Duration::from_secs(900));
        assert!(!email.http_only);

        // The stub issues no refresh token
        assert!(cookies.iter().all(|c| c.name != "scope_refresh_token"));
    }

    #[tokio::test]
    async fn test_failure_issues_no_session_cookies() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(Some("code_verifier_stale=def456"), false);

        handler.handle("https://x/callback?code=stale", &stores).await;

        let cookies = stores.cookies.take_set_cookies();
        assert!(cookies.iter().all(|c| c.name != "scope_access_token" && c.name != "verify_email"));
    }

    #[tokio::test]
    async fn test_scanner_rewritten_flow_bridges_verifier() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        let outcome = handler
            .handle("https://x/callback#code=abc123&code_verifier=def456", &stores)
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.bridge, BridgeOutcome::Persisted);
    }

    #[tokio::test]
    async fn test_consumed_code_keeps_recovery_cookie() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        // The scanner already spent this code; the user's click will bring a new one
        let outcome = handler
            .handle("https://x/callback#code=used999&code_verifier=def456", &stores)
            .await;

        assert_eq!(outcome.terminal, FlowState::ExchangeFailed);
        assert_eq!(outcome.bridge, BridgeOutcome::Persisted);
        assert_eq!(outcome.category(), Some(ErrorCategory::ProviderError));

        let cookies = stores.cookies.take_set_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "scope_pkce_verifier");
        assert_eq!(cookies[0].value, "def456");
    }

    #[tokio::test]
    async fn test_degraded_flow_reports_missing_verifier() {
        let (handler, provider) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        let outcome = handler.handle("https://x/callback?code=abc123", &stores).await;

        assert_eq!(outcome.branch, FlowState::CodeFlowDegraded);
        assert_eq!(outcome.terminal, FlowState::CodeFlowDegraded);
        assert_eq!(outcome.category(), Some(ErrorCategory::MissingVerifier));
        assert_eq!(provider.calls(), 0);
        match outcome.response {
            CallbackResponse::Page { status, html } => {
                assert_eq!(status, 400);
                assert!(html.contains("/login?error=missing_verifier"));
            }
            other => panic!("expected diagnostic page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_degraded_flow_with_verifierless_provider() {
        let mut stub = StubProvider::new();
        stub.verifierless = true;
        let (handler, provider) = handler(stub);
        let stores = RequestStores::server(None, false);

        let outcome = handler.handle("https://x/callback?code=abc123", &stores).await;

        assert_eq!(outcome.branch, FlowState::CodeFlowDegraded);
        assert!(outcome.is_success());
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_error_in_fragment_is_terminal() {
        let (handler, provider) = handler(StubProvider::new());
        let stores = RequestStores::server(Some("code_verifier_abc123=def456"), false);

        let outcome = handler
            .handle("https://x/callback#error=access_denied&error_code=otp_expired", &stores)
            .await;

        assert_eq!(outcome.branch, FlowState::ErrorReported);
        assert_eq!(outcome.terminal, FlowState::ErrorReported);
        assert_eq!(outcome.category(), Some(ErrorCategory::Expired));
        assert_eq!(provider.calls(), 0);
        match outcome.response {
            CallbackResponse::Redirect { location } => {
                assert!(location.starts_with("/login?error=expired&message="));
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generic_provider_error() {
        let (handler, provider) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        let outcome = handler
            .handle("https://x/callback?code=abc123#error=server_error&error_description=Database+down", &stores)
            .await;

        assert_eq!(outcome.category(), Some(ErrorCategory::ProviderError));
        assert_eq!(provider.calls(), 0);
        assert_eq!(outcome.error.unwrap().user_message(), "Database down");
    }

    #[tokio::test]
    async fn test_empty_callback_is_malformed() {
        let (handler, provider) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        let outcome = handler.handle("https://x/callback?relayed=1", &stores).await;

        assert_eq!(outcome.branch, FlowState::Malformed);
        assert_eq!(outcome.category(), Some(ErrorCategory::MalformedRequest));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_token_flow_sets_session() {
        let (handler, provider) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        let outcome = handler
            .handle("https://x/callback#access_token=good-token&refresh_token=r", &stores)
            .await;

        assert_eq!(outcome.branch, FlowState::TokenFlow);
        assert!(outcome.is_success());
        assert_eq!(provider.set_session_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        let outcome = handler.handle("https://x/callback#access_token=bad", &stores).await;

        assert_eq!(outcome.terminal, FlowState::ExchangeFailed);
        assert_eq!(outcome.category(), Some(ErrorCategory::ProviderError));
    }

    #[tokio::test]
    async fn test_expired_exchange() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(Some("code_verifier_stale=def456"), false);

        let outcome = handler.handle("https://x/callback?code=stale", &stores).await;

        assert_eq!(outcome.terminal, FlowState::ExchangeFailed);
        assert_eq!(outcome.category(), Some(ErrorCategory::Expired));
    }

    #[tokio::test]
    async fn test_slow_exchange_is_transport_error() {
        let mut stub = StubProvider::new();
        stub.delay = Duration::from_secs(2);
        let provider = Arc::new(stub);
        let settings = CallbackSettings {
            exchange_timeout: Duration::from_millis(50),
            ..CallbackSettings::default()
        };
        let handler = CallbackHandler::new(provider.clone(), settings);
        let stores = RequestStores::server(Some("code_verifier_abc123=def456"), false);

        let outcome = handler.handle("https://x/callback?code=abc123", &stores).await;

        assert_eq!(outcome.terminal, FlowState::ExchangeFailed);
        assert_eq!(outcome.category(), Some(ErrorCategory::TransportError));
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_redirect_param_honoured() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(Some("code_verifier_abc123=def456"), false);

        let outcome = handler
            .handle("https://x/callback?code=abc123&redirect=%2Fdashboard%3Ftab%3Dnews", &stores)
            .await;

        assert_eq!(
            outcome.response,
            CallbackResponse::Redirect { location: "/dashboard?tab=news".to_string() }
        );
    }

    #[tokio::test]
    async fn test_failure_carries_redirect_param() {
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::server(None, false);

        let outcome = handler
            .handle("https://x/callback?redirect=%2Fdashboard&relayed=1", &stores)
            .await;

        match outcome.response {
            CallbackResponse::Redirect { location } => assert!(location.ends_with("&redirect=%2Fdashboard")),
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_browser_context_uses_and_clears_local_storage() {
        let dir = TempDir::new().unwrap();
        let (handler, _) = handler(StubProvider::new());
        let stores = RequestStores::browser(dir.path().join("local.json"));
        stores
            .storage
            .set("scope.auth.pkce.code_verifier", "def456", Duration::from_secs(600))
            .unwrap();

        let outcome = handler.handle("https://x/callback?code=abc123", &stores).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.bridge, BridgeOutcome::NotApplicable);
        let reopened = BrowserLocalStore::new(dir.path().join("local.json"));
        assert_eq!(reopened.get("scope.auth.pkce.code_verifier"), None);
    }

    #[test]
    fn test_safe_redirect_path() {
        assert_eq!(safe_redirect_path(Some("/news".into())).as_deref(), Some("/news"));
        assert_eq!(safe_redirect_path(Some("//evil.com".into())), None);
        assert_eq!(safe_redirect_path(Some("https://evil.com".into())), None);
        assert_eq!(safe_redirect_path(Some("/\\evil.com".into())), None);
        assert_eq!(safe_redirect_path(None), None);
    }
}
