//! Magic-link authentication callback handling
//!
//! This module provides:
//! - URL parameter extraction across query string and fragment
//! - PKCE artifact recovery from URL, cookies and local storage
//! - A bridge that persists URL-embedded verifiers for later recovery
//! - The callback orchestrator and its HTTP server
//! - Magic-link requests and session persistence for the CLI

mod bridge;
mod callback_server;
mod cookie;
mod failure;
mod locator;
mod magic_link;
mod orchestrator;
mod pages;
mod pkce;
mod provider;
mod session;
mod storage;
mod url_params;

pub use bridge::{persist_url_verifier, BridgeOutcome};
pub use callback_server::{CallbackServer, ServerOptions};
pub use cookie::{parse_cookie_header, SetCookie};
pub use failure::{CallbackError, ErrorCategory, ExchangeFailure};
pub use locator::{locate_artifact, PkceArtifact, RedirectError, VerifierKeys, VerifierSource};
pub use magic_link::{request_magic_link, validate_email};
pub use orchestrator::{
    safe_redirect_path, CallbackHandler, CallbackOutcome, CallbackResponse, CallbackSettings, FlowState,
};
pub use pkce::{challenge_for, PkcePair};
pub use provider::{AuthProvider, GoTrueProvider};
pub use session::{delete_session, load_session, save_session, session_path, Session, SessionUser};
pub use storage::{
    BrowserLocalStore, CookieStore, ExecutionContext, RequestStores, ServerNullStore, StoreKind, VerifierStore,
};
pub use url_params::{extract_param, fragment_param, query_param};

/// Short, log-safe preview of a secret
pub fn preview(value: &str) -> String {
    const SHOWN: usize = 8;
    if value.chars().count() <= SHOWN {
        value.to_string()
    } else {
        let head: String = value.chars().take(SHOWN).collect();
        format!("{}...", head)
    }
}

/// Callback URL with parameter values stripped, for logging
pub(crate) fn preview_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return preview(url);
    };

    let keys = |pairs: url::form_urlencoded::Parse<'_>| {
        pairs.map(|(k, _)| k.into_owned()).collect::<Vec<_>>().join(",")
    };

    let mut out = format!("{}{}", parsed.origin().ascii_serialization(), parsed.path());
    if let Some(query) = parsed.query() {
        out.push_str(&format!(" query=[{}]", keys(url::form_urlencoded::parse(query.as_bytes()))));
    }
    if let Some(fragment) = parsed.fragment() {
        out.push_str(&format!(" fragment=[{}]", keys(url::form_urlencoded::parse(fragment.as_bytes()))));
    }
    out
}
