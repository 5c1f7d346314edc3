//! PKCE artifact recovery
//!
//! The same magic link can be opened by the user's own browser, by a mail
//! security scanner prefetching it from somewhere else, or by the user on a
//! different device. Each of those leaves the code verifier in a different
//! place, so the locator searches them in a fixed priority order.

use serde::Serialize;

use super::storage::VerifierStore;
use super::url_params::{extract_param, fragment_param};
use crate::config::VerifierConfig;

/// Names under which a code verifier may be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierKeys {
    /// Prefix of the per-code cookie, e.g. `code_verifier_<code>`
    pub code_cookie_prefix: String,
    /// Code-independent recovery cookie written by the bridge
    pub cookie_name: String,
    /// Local storage key written when the magic link was requested
    pub storage_key: String,
}

impl VerifierKeys {
    pub fn code_cookie(&self, code: &str) -> String {
        format!("{}{}", self.code_cookie_prefix, code)
    }
}

impl Default for VerifierKeys {
    fn default() -> Self {
        Self::from(&VerifierConfig::default())
    }
}

impl From<&VerifierConfig> for VerifierKeys {
    fn from(config: &VerifierConfig) -> Self {
        Self {
            code_cookie_prefix: config.code_cookie_prefix.clone(),
            cookie_name: config.cookie_name.clone(),
            storage_key: config.storage_key.clone(),
        }
    }
}

/// Where a code verifier was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierSource {
    /// Embedded in the callback URL itself (rewritten links)
    Url,
    /// The conventional `code_verifier_<code>` cookie
    CodeCookie,
    /// The code-independent recovery cookie
    RecoveryCookie,
    /// Local storage on the user's device
    LocalStorage,
}

/// Error reported by the auth provider in the redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectError {
    pub error: String,
    pub error_code: Option<String>,
    pub description: Option<String>,
}

impl RedirectError {
    /// Whether the provider is telling us the link has expired
    pub fn is_expiry(&self) -> bool {
        let mentions_expiry = |s: &str| s.to_ascii_lowercase().contains("expired");
        mentions_expiry(&self.error)
            || self.error_code.as_deref().is_some_and(mentions_expiry)
            || self.description.as_deref().is_some_and(mentions_expiry)
    }
}

/// Everything recovered from one callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PkceArtifact {
    pub code: Option<String>,
    pub code_verifier: Option<String>,
    pub verifier_source: Option<VerifierSource>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub error: Option<RedirectError>,
}

impl PkceArtifact {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.token.is_none() && self.error.is_none()
    }
}

/// Recover the PKCE artifact for `url`.
///
/// Never fails: anything that cannot be found is left as `None` and the
/// orchestrator decides what that means.
pub fn locate_artifact(
    url: &str,
    cookies: &dyn VerifierStore,
    storage: &dyn VerifierStore,
    keys: &VerifierKeys,
) -> PkceArtifact {
    let code = extract_param(url, "code");

    // A provider-reported error is definitive
    if let Some(error) = extract_param(url, "error") {
        tracing::debug!("Callback carries provider error: {}", error);
        return PkceArtifact {
            error: Some(RedirectError {
                error,
                error_code: extract_param(url, "error_code"),
                description: extract_param(url, "error_description"),
            }),
            ..Default::default()
        };
    }

    let Some(code) = code else {
        let token = fragment_param(url, "access_token");
        if token.is_some() {
            tracing::debug!("Callback carries a bare access token (implicit flow)");
        }
        return PkceArtifact {
            refresh_token: token.as_ref().and_then(|_| fragment_param(url, "refresh_token")),
            token,
            ..Default::default()
        };
    };

    let (code_verifier, verifier_source) = match resolve_verifier(url, &code, cookies, storage, keys) {
        Some((verifier, source)) => (Some(verifier), Some(source)),
        None => {
            tracing::debug!("No code verifier found for code {}", super::preview(&code));
            (None, None)
        }
    };

    PkceArtifact {
        code: Some(code),
        code_verifier,
        verifier_source,
        ..Default::default()
    }
}

fn resolve_verifier(
    url: &str,
    code: &str,
    cookies: &dyn VerifierStore,
    storage: &dyn VerifierStore,
    keys: &VerifierKeys,
) -> Option<(String, VerifierSource)> {
    if let Some(verifier) = extract_param(url, "code_verifier") {
        tracing::debug!("Code verifier embedded in callback URL");
        return Some((verifier, VerifierSource::Url));
    }

    if let Some(verifier) = cookies.get(&keys.code_cookie(code)) {
        tracing::debug!("Code verifier found in per-code cookie");
        return Some((verifier, VerifierSource::CodeCookie));
    }

    if let Some(verifier) = cookies.get(&keys.cookie_name) {
        tracing::debug!("Code verifier found in recovery cookie");
        return Some((verifier, VerifierSource::RecoveryCookie));
    }

    if let Some(verifier) = storage.get(&keys.storage_key) {
        tracing::debug!("Code verifier found in {:?} storage", storage.kind());
        return Some((verifier, VerifierSource::LocalStorage));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{BrowserLocalStore, CookieStore, ServerNullStore};
    use std::time::Duration;
    use tempfile::TempDir;

    fn locate(url: &str, cookie_header: Option<&str>) -> PkceArtifact {
        let cookies = CookieStore::from_request(cookie_header);
        locate_artifact(url, &cookies, &ServerNullStore, &VerifierKeys::default())
    }

    #[test]
    fn test_standard_flow_uses_code_cookie() {
        let artifact = locate(
            "https://x/callback?code=abc123",
            Some("code_verifier_abc123=def456"),
        );
        assert_eq!(artifact.code.as_deref(), Some("abc123"));
        assert_eq!(artifact.code_verifier.as_deref(), Some("def456"));
        assert_eq!(artifact.verifier_source, Some(VerifierSource::CodeCookie));
    }

    #[test]
    fn test_scanner_rewritten_flow_uses_fragment() {
        let artifact = locate("https://x/callback#code=abc123&code_verifier=def456", None);
        assert_eq!(artifact.code.as_deref(), Some("abc123"));
        assert_eq!(artifact.code_verifier.as_deref(), Some("def456"));
        assert_eq!(artifact.verifier_source, Some(VerifierSource::Url));
    }

    #[test]
    fn test_url_verifier_beats_conflicting_cookie() {
        let artifact = locate(
            "https://x/callback#code=abc123&code_verifier=from_url",
            Some("code_verifier_abc123=from_cookie; scope_pkce_verifier=from_recovery"),
        );
        assert_eq!(artifact.code_verifier.as_deref(), Some("from_url"));
        assert_eq!(artifact.verifier_source, Some(VerifierSource::Url));
    }

    #[test]
    fn test_code_cookie_beats_recovery_cookie() {
        let artifact = locate(
            "https://x/callback?code=abc123",
            Some("scope_pkce_verifier=recovery; code_verifier_abc123=per_code"),
        );
        assert_eq!(artifact.code_verifier.as_deref(), Some("per_code"));
    }

    #[test]
    fn test_recovery_cookie_fallback() {
        let artifact = locate(
            "https://x/callback?code=abc123",
            Some("scope_pkce_verifier=recovered"),
        );
        assert_eq!(artifact.code_verifier.as_deref(), Some("recovered"));
        assert_eq!(artifact.verifier_source, Some(VerifierSource::RecoveryCookie));
    }

    #[test]
    fn test_local_storage_fallback() {
        let dir = TempDir::new().unwrap();
        let storage = BrowserLocalStore::new(dir.path().join("local.json"));
        let keys = VerifierKeys::default();
        storage
            .set(&keys.storage_key, "stored", Duration::from_secs(60))
            .unwrap();

        let artifact = locate_artifact(
            "https://x/callback?code=abc123",
            &CookieStore::detached(),
            &storage,
            &keys,
        );
        assert_eq!(artifact.code_verifier.as_deref(), Some("stored"));
        assert_eq!(artifact.verifier_source, Some(VerifierSource::LocalStorage));
    }

    #[test]
    fn test_degraded_flow_has_no_verifier() {
        let artifact = locate("https://x/callback?code=abc123", None);
        assert_eq!(artifact.code.as_deref(), Some("abc123"));
        assert_eq!(artifact.code_verifier, None);
        assert_eq!(artifact.verifier_source, None);
    }

    #[test]
    fn test_error_short_circuits() {
        let artifact = locate(
            "https://x/callback?code=abc123#error=access_denied&error_code=otp_expired&error_description=Email+link+is+invalid+or+has+expired",
            Some("code_verifier_abc123=def456"),
        );
        let error = artifact.error.as_ref().unwrap();
        assert_eq!(error.error, "access_denied");
        assert_eq!(error.error_code.as_deref(), Some("otp_expired"));
        assert!(error.is_expiry());
        assert_eq!(artifact.code, None);
        assert_eq!(artifact.code_verifier, None);
    }

    #[test]
    fn test_non_expiry_error() {
        let artifact = locate("https://x/callback#error=server_error", None);
        assert!(!artifact.error.unwrap().is_expiry());
    }

    #[test]
    fn test_implicit_flow_token() {
        let artifact = locate(
            "https://x/callback#access_token=tok&refresh_token=ref&token_type=bearer",
            None,
        );
        assert_eq!(artifact.token.as_deref(), Some("tok"));
        assert_eq!(artifact.refresh_token.as_deref(), Some("ref"));
        assert_eq!(artifact.code, None);
    }

    #[test]
    fn test_token_in_query_is_ignored() {
        let artifact = locate("https://x/callback?access_token=tok", None);
        assert!(artifact.is_empty());
    }

    #[test]
    fn test_empty_callback() {
        assert!(locate("https://x/callback", None).is_empty());
        assert!(locate("garbage", None).is_empty());
    }
}
