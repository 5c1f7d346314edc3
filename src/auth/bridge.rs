//! Verifier persistence bridge
//!
//! When a verifier arrives embedded in the URL, copy it into the recovery
//! cookie. If this attempt fails because a scanner already consumed the
//! code, the user's own click can still find the verifier.

use std::time::Duration;

use super::locator::{PkceArtifact, VerifierKeys, VerifierSource};
use super::storage::VerifierStore;

/// What the bridge did with an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// The verifier was written to the recovery cookie
    Persisted,
    /// Nothing to do: the verifier did not come from the URL
    NotApplicable,
    /// No cookie-capable environment
    Skipped,
    /// The write failed; the exchange goes ahead anyway
    Failed,
}

/// Persist a URL-embedded verifier into `cookies` under the recovery name.
pub fn persist_url_verifier(
    artifact: &PkceArtifact,
    cookies: &dyn VerifierStore,
    keys: &VerifierKeys,
    max_age: Duration,
) -> BridgeOutcome {
    let verifier = match (&artifact.verifier_source, &artifact.code_verifier) {
        (Some(VerifierSource::Url), Some(verifier)) => verifier,
        _ => return BridgeOutcome::NotApplicable,
    };

    if !cookies.is_writable() {
        tracing::debug!("No cookie jar available, not persisting URL verifier");
        return BridgeOutcome::Skipped;
    }

    match cookies.set(&keys.cookie_name, verifier, max_age) {
        Ok(()) => {
            tracing::info!("Persisted URL-embedded code verifier to recovery cookie");
            BridgeOutcome::Persisted
        }
        Err(e) => {
            tracing::warn!("Failed to persist code verifier: {}", e);
            BridgeOutcome::Failed
        }
    }
}
