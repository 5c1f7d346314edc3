//! Minimal cookie handling for the callback endpoint
//!
//! Parses the request `Cookie` header and renders `Set-Cookie` lines. Only
//! the attributes the verifier and session cookies need are supported, and
//! every cookie is `SameSite=Lax` so it survives the redirect from the
//! email link.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::Error;
use crate::Result;

/// Browsers drop cookies larger than this
const MAX_COOKIE_BYTES: usize = 4096;

/// A cookie to be sent back in a `Set-Cookie` response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: Duration,
    pub secure: bool,
    pub http_only: bool,
}

impl SetCookie {
    /// Create a cookie scoped to `/` with `SameSite=Lax`
    pub fn new(name: &str, value: &str, max_age: Duration) -> Result<Self> {
        validate_name(name)?;
        validate_value(value)?;

        if name.len() + value.len() > MAX_COOKIE_BYTES {
            return Err(Error::Storage(format!(
                "Cookie {} exceeds {} bytes",
                name, MAX_COOKIE_BYTES
            )));
        }

        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            max_age,
            secure: false,
            http_only: false,
        })
    }

    /// A cookie that tells the browser to drop `name` immediately
    pub fn expired(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            path: "/".to_string(),
            max_age: Duration::ZERO,
            secure: false,
            http_only: false,
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Hide the cookie from page scripts
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Max-Age={}; Path={}; SameSite=Lax",
            self.name,
            self.value,
            self.max_age.as_secs(),
            self.path
        )?;
        if self.secure {
            write!(f, "; Secure")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

/// Parse a request `Cookie` header into name/value pairs.
///
/// Malformed pairs are skipped. When a name repeats, the first occurrence
/// wins, matching how browsers order more specific paths first.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"');
        cookies
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }

    cookies
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b));
    if valid {
        Ok(())
    } else {
        Err(Error::Storage(format!("Invalid cookie name: {:?}", name)))
    }
}

fn validate_value(value: &str) -> Result<()> {
    let valid = value
        .bytes()
        .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\'));
    if valid {
        Ok(())
    } else {
        Err(Error::Storage("Cookie value contains forbidden characters".to_string()))
    }
}
