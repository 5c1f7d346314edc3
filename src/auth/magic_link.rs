//! Magic-link sign-in requests
//!
//! Generates the PKCE pair, keeps the verifier in local storage where the
//! callback can find it, and asks the auth service to email the link.

use regex::Regex;

use super::pkce::PkcePair;
use super::provider::GoTrueProvider;
use super::storage::VerifierStore;
use crate::config::Config;
use crate::error::Error;
use crate::Result;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Check the address shape and the configured domain allowlist
pub fn validate_email(email: &str, config: &Config) -> Result<()> {
    let re = Regex::new(EMAIL_PATTERN)
        .map_err(|e| Error::Other(format!("Invalid email pattern: {}", e)))?;

    if !re.is_match(email) {
        return Err(Error::Auth(format!("{:?} is not a valid email address", email)));
    }

    if !config.allows_email_domain(email) {
        return Err(Error::Auth(format!(
            "Sign-in is limited to: {}",
            config.allowed_email_domains.join(", ")
        )));
    }

    Ok(())
}

/// Request a magic link for `email`, storing the verifier in `storage`
pub async fn request_magic_link(
    provider: &GoTrueProvider,
    config: &Config,
    email: &str,
    storage: &dyn VerifierStore,
) -> Result<()> {
    let email = email.trim();
    validate_email(email, config)?;

    let pkce = PkcePair::generate();
    let key = &config.verifier.storage_key;
    storage.set(key, &pkce.verifier, config.verifier.max_age())?;
    tracing::debug!("Stored code verifier under {} in {:?} storage", key, storage.kind());

    let redirect_to = config.callback.redirect_url();
    if let Err(e) = provider.send_magic_link(email, &redirect_to, &pkce.challenge).await {
        if let Err(cleanup) = storage.remove(key) {
            tracing::warn!("Failed to remove unused verifier: {}", cleanup);
        }
        return Err(e);
    }

    Ok(())
}
