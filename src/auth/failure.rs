//! Callback failure taxonomy
//!
//! Every way a callback can fail ends up as exactly one [`CallbackError`].
//! Only these reach the user; raw provider errors are folded in here.

use thiserror::Error;

use super::locator::RedirectError;
use crate::error::Error;

/// Machine-readable failure category carried to the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Expired,
    MissingVerifier,
    ProviderError,
    MalformedRequest,
    TransportError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Expired => "expired",
            ErrorCategory::MissingVerifier => "missing_verifier",
            ErrorCategory::ProviderError => "provider_error",
            ErrorCategory::MalformedRequest => "malformed_request",
            ErrorCategory::TransportError => "transport_error",
        }
    }
}

/// Why the provider refused an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeFailure {
    /// Expired link or code; the fix is a new link
    Expired,
    /// Already used, mismatched verifier, or any other refusal
    Rejected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Auth provider reported {}", .0.error)]
    Provider(RedirectError),

    #[error("Callback carried no code, token or error")]
    NoCode,

    #[error("No code verifier found for code")]
    MissingVerifier { code: String },

    #[error("Code exchange failed: {message}")]
    ExchangeFailed { kind: ExchangeFailure, message: String },

    #[error("Could not reach auth provider: {message}")]
    Transport { message: String, timed_out: bool },
}

impl CallbackError {
    /// Classify an error returned by the provider call
    pub fn from_provider(err: Error) -> Self {
        match err {
            Error::Provider {
                error_code,
                message,
                ..
            } => {
                let expired = error_code
                    .as_deref()
                    .map(|code| code.contains("expired"))
                    .unwrap_or(false)
                    || message.to_ascii_lowercase().contains("expired");
                CallbackError::ExchangeFailed {
                    kind: if expired {
                        ExchangeFailure::Expired
                    } else {
                        ExchangeFailure::Rejected
                    },
                    message,
                }
            }
            Error::Timeout(limit) => CallbackError::Transport {
                message: format!("no answer within {}ms", limit.as_millis()),
                timed_out: true,
            },
            Error::Http(e) => CallbackError::Transport {
                timed_out: e.is_timeout(),
                message: e.to_string(),
            },
            other => CallbackError::ExchangeFailed {
                kind: ExchangeFailure::Rejected,
                message: other.to_string(),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CallbackError::Provider(redirect) if redirect.is_expiry() => ErrorCategory::Expired,
            CallbackError::Provider(_) => ErrorCategory::ProviderError,
            CallbackError::NoCode => ErrorCategory::MalformedRequest,
            CallbackError::MissingVerifier { .. } => ErrorCategory::MissingVerifier,
            CallbackError::ExchangeFailed {
                kind: ExchangeFailure::Expired,
                ..
            } => ErrorCategory::Expired,
            CallbackError::ExchangeFailed { .. } => ErrorCategory::ProviderError,
            CallbackError::Transport { .. } => ErrorCategory::TransportError,
        }
    }

    /// Message shown to the user on the login page
    pub fn user_message(&self) -> String {
        match self {
            CallbackError::Provider(redirect) => redirect
                .description
                .clone()
                .unwrap_or_else(|| format!("Sign-in failed: {}", redirect.error)),
            CallbackError::NoCode => {
                "The sign-in link is incomplete. Please request a new link.".to_string()
            }
            CallbackError::MissingVerifier { .. } => {
                "This sign-in link could not be verified. Open the link right after it arrives, \
                 in the browser you requested it from."
                    .to_string()
            }
            CallbackError::ExchangeFailed {
                kind: ExchangeFailure::Expired,
                ..
            } => "This sign-in link has expired. Please request a new link.".to_string(),
            CallbackError::ExchangeFailed { .. } => {
                "This sign-in link was already used or is no longer valid. \
                 Each link works once; please request a new link."
                    .to_string()
            }
            CallbackError::Transport { .. } => {
                "The sign-in service could not be reached. Please request a new link and try again."
                    .to_string()
            }
        }
    }
}
