//! Verifier stores
//!
//! The same lookups run against three very different backends:
//! - [`CookieStore`]: the request's cookies, with writes queued as `Set-Cookie` headers
//! - [`BrowserLocalStore`]: a persistent key/value file on the user's device
//! - [`ServerNullStore`]: nothing, for contexts with no client-side storage
//!
//! Which backends a request gets is decided up front by its [`ExecutionContext`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cookie::{parse_cookie_header, SetCookie};
use crate::error::Error;
use crate::Result;

/// Which backend a store is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Cookie,
    BrowserLocal,
    ServerNull,
}

/// Key/value store that may hold a PKCE code verifier
pub trait VerifierStore: Send + Sync {
    /// Backend kind, for logging and source attribution
    fn kind(&self) -> StoreKind;

    /// Read a value. Failures are logged and reported as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value that expires after `max_age`
    fn set(&self, key: &str, value: &str, max_age: Duration) -> Result<()>;

    /// Delete a value
    fn remove(&self, key: &str) -> Result<()>;

    /// Whether writes reach anything that outlives the current request
    fn is_writable(&self) -> bool {
        true
    }
}

/// Where the callback is being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// The HTTP callback endpoint: request cookies in, `Set-Cookie` out, no local storage
    Server,
    /// The user's own device: local storage available, no cookie jar
    Browser,
}

/// Stores available to a single callback invocation
pub struct RequestStores {
    pub cookies: CookieStore,
    pub storage: Box<dyn VerifierStore>,
}

impl RequestStores {
    /// Server context: cookies from the request header, no local storage
    pub fn server(cookie_header: Option<&str>, secure_cookies: bool) -> Self {
        Self {
            cookies: CookieStore::from_request(cookie_header).with_secure(secure_cookies),
            storage: Box::new(ServerNullStore),
        }
    }

    /// Browser context: local storage at `storage_path`, no cookie jar
    pub fn browser(storage_path: PathBuf) -> Self {
        Self {
            cookies: CookieStore::detached(),
            storage: Box::new(BrowserLocalStore::new(storage_path)),
        }
    }

    pub fn context(&self) -> ExecutionContext {
        match self.storage.kind() {
            StoreKind::BrowserLocal => ExecutionContext::Browser,
            _ => ExecutionContext::Server,
        }
    }
}

/// Request cookies plus the `Set-Cookie` headers queued for the response
pub struct CookieStore {
    incoming: HashMap<String, String>,
    outgoing: Option<Mutex<Vec<SetCookie>>>,
    secure: bool,
}

impl CookieStore {
    /// Cookies sent with an HTTP request; writes become response headers
    pub fn from_request(header: Option<&str>) -> Self {
        Self {
            incoming: header.map(parse_cookie_header).unwrap_or_default(),
            outgoing: Some(Mutex::new(Vec::new())),
            secure: false,
        }
    }

    /// No cookie jar at all: reads find nothing, writes are refused
    pub fn detached() -> Self {
        Self {
            incoming: HashMap::new(),
            outgoing: None,
            secure: false,
        }
    }

    /// Mark queued cookies `Secure` (set when the site is served over https)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Drain the `Set-Cookie` headers queued so far
    pub fn take_set_cookies(&self) -> Vec<SetCookie> {
        match &self.outgoing {
            Some(queue) => match queue.lock() {
                Ok(mut pending) => std::mem::take(&mut *pending),
                Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
            },
            None => Vec::new(),
        }
    }

    /// Queue an `HttpOnly` cookie that is not part of verifier storage
    pub fn set_http_only(&self, name: &str, value: &str, max_age: Duration) -> Result<()> {
        let cookie = SetCookie::new(name, value, max_age)?
            .with_secure(self.secure)
            .http_only();
        self.queue(cookie)
    }

    fn queue(&self, cookie: SetCookie) -> Result<()> {
        let queue = self
            .outgoing
            .as_ref()
            .ok_or_else(|| Error::Storage("No cookie jar in this context".to_string()))?;
        let mut pending = queue
            .lock()
            .map_err(|_| Error::Storage("Cookie queue poisoned".to_string()))?;
        pending.retain(|c| c.name != cookie.name);
        pending.push(cookie);
        Ok(())
    }
}

impl VerifierStore for CookieStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Cookie
    }

    fn get(&self, key: &str) -> Option<String> {
        self.incoming.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn set(&self, key: &str, value: &str, max_age: Duration) -> Result<()> {
        let cookie = SetCookie::new(key, value, max_age)?.with_secure(self.secure);
        self.queue(cookie)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.queue(SetCookie::expired(key).with_secure(self.secure))
    }

    fn is_writable(&self) -> bool {
        self.outgoing.is_some()
    }
}

/// Stored entry in the local store file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocalEntry {
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl LocalEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Utc::now() >= at).unwrap_or(false)
    }
}

/// Persistent key/value storage on the user's device (`~/.scope/local_storage.json`)
pub struct BrowserLocalStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl BrowserLocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default location under the config directory
    pub fn default_path() -> PathBuf {
        crate::config::config_dir().join("local_storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, LocalEntry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, entries: &HashMap<String, LocalEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, LocalEntry>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::Storage("Local store lock poisoned".to_string()))?;
        let mut entries = self.read_all()?;
        entries.retain(|_, entry| !entry.is_expired());
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl VerifierStore for BrowserLocalStore {
    fn kind(&self) -> StoreKind {
        StoreKind::BrowserLocal
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(entries) => entries
                .get(key)
                .filter(|entry| !entry.is_expired() && !entry.value.is_empty())
                .map(|entry| entry.value.clone()),
            Err(e) => {
                tracing::warn!("Failed to read local store {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str, max_age: Duration) -> Result<()> {
        let expires_at = chrono::Duration::from_std(max_age)
            .ok()
            .map(|age| Utc::now() + age);
        let entry = LocalEntry {
            value: value.to_string(),
            expires_at,
        };
        self.update(|entries| {
            entries.insert(key.to_string(), entry);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Storage for contexts that have none
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerNullStore;

impl VerifierStore for ServerNullStore {
    fn kind(&self) -> StoreKind {
        StoreKind::ServerNull
    }

    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str, _max_age: Duration) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn is_writable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(86400);

    #[test]
    fn test_cookie_store_reads_request_cookies() {
        let store = CookieStore::from_request(Some("code_verifier_abc123=def456; other=1"));
        assert_eq!(store.get("code_verifier_abc123").as_deref(), Some("def456"));
        assert_eq!(store.get("missing"), None);
        assert!(store.is_writable());
    }

    #[test]
    fn test_http_only_cookies() {
        let store = CookieStore::from_request(None).with_secure(true);
        store.set_http_only("scope_access_token", "jwt.part.sig", DAY).unwrap();
        let queued = store.take_set_cookies();
        assert_eq!(queued.len(), 1);
        assert!(queued[0].http_only);
        assert!(queued[0].secure);

        assert!(CookieStore::detached().set_http_only("scope_access_token", "x", DAY).is_err());
    }

    #[test]
    fn test_cookie_store_queues_writes() {
        let store = CookieStore::from_request(None).with_secure(true);
        store.set("scope_pkce_verifier", "v1", DAY).unwrap();
        store.set("scope_pkce_verifier", "v2", DAY).unwrap();
        store.remove("code_verifier_abc").unwrap();

        let cookies = store.take_set_cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].value, "v2");
        assert!(cookies[0].secure);
        assert_eq!(cookies[1].max_age, Duration::ZERO);
        assert!(store.take_set_cookies().is_empty());
    }

    #[test]
    fn test_detached_cookie_store() {
        let store = CookieStore::detached();
        assert!(!store.is_writable());
        assert_eq!(store.get("anything"), None);
        assert!(store.set("k", "v", DAY).is_err());
        assert!(store.take_set_cookies().is_empty());
    }

    #[test]
    fn test_local_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = BrowserLocalStore::new(dir.path().join("nested").join("local.json"));

        assert_eq!(store.get("key"), None);
        store.set("key", "value", DAY).unwrap();
        assert_eq!(store.get("key").as_deref(), Some("value"));

        let reopened = BrowserLocalStore::new(store.path().to_path_buf());
        assert_eq!(reopened.get("key").as_deref(), Some("value"));

        reopened.remove("key").unwrap();
        assert_eq!(store.get("key"), None);
    }

    #[test]
    fn test_local_store_expiry() {
        let dir = TempDir::new().unwrap();
        let store = BrowserLocalStore::new(dir.path().join("local.json"));
        store.set("short", "gone", Duration::ZERO).unwrap();
        assert_eq!(store.get("short"), None);
    }

    #[test]
    fn test_local_store_corrupt_file_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = BrowserLocalStore::new(path);
        assert_eq!(store.get("key"), None);
    }

    #[test]
    fn test_null_store() {
        let store = ServerNullStore;
        assert!(store.set("k", "v", DAY).is_ok());
        assert_eq!(store.get("k"), None);
        assert!(!store.is_writable());
    }

    #[test]
    fn test_request_stores_context() {
        let dir = TempDir::new().unwrap();
        let server = RequestStores::server(Some("a=b"), false);
        assert_eq!(server.context(), ExecutionContext::Server);
        assert_eq!(server.storage.kind(), StoreKind::ServerNull);

        let browser = RequestStores::browser(dir.path().join("local.json"));
        assert_eq!(browser.context(), ExecutionContext::Browser);
        assert!(!browser.cookies.is_writable());
    }
}
