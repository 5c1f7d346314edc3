//! Sessions issued by the auth provider
//!
//! The callback server hands sessions to the browser as cookies. The CLI
//! keeps the one it obtained in `~/.scope/session.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::Result;

/// Authenticated user as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        user: Option<SessionUser>,
    ) -> Self {
        // Lifetimes beyond the representable range count as no expiry
        let expires_at = expires_in_secs
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Self {
            access_token,
            refresh_token,
            token_type: default_token_type(),
            expires_at,
            user,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires| Utc::now() >= expires)
            .unwrap_or(false)
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.email.as_deref())
    }
}

pub fn session_path() -> PathBuf {
    crate::config::config_dir().join("session.json")
}

/// Load the stored session, if any
pub fn load_session() -> Result<Option<Session>> {
    let path = session_path();

    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)?;
    let session: Session = serde_json::from_str(&content)?;
    Ok(Some(session))
}

/// Save a session with owner-only permissions
pub fn save_session(session: &Session) -> Result<()> {
    let path = session_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(session)?;
    std::fs::write(&path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)?;
    }

    Ok(())
}

pub fn delete_session() -> Result<()> {
    let path = session_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}
