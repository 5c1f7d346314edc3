//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::Result;
use crate::error::Error;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted auth service
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Callback endpoint and redirect targets
    #[serde(default)]
    pub callback: CallbackConfig,

    /// Verifier cookie and storage names
    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Cookies that carry a new session to the browser
    #[serde(default)]
    pub session: SessionCookieConfig,

    /// Email domains allowed to request a magic link (empty allows all)
    #[serde(default)]
    pub allowed_email_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the auth service, e.g. `https://<project>.supabase.co`
    #[serde(default)]
    pub url: String,

    /// Public (anon) API key
    #[serde(default)]
    pub anon_key: String,

    /// HTTP timeout for every provider call
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the magic link redirects to
    #[serde(default = "default_callback_path")]
    pub path: String,

    /// Public origin of the portal, used to build redirect URLs
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Where users land after signing in
    #[serde(default = "default_success_path")]
    pub success_path: String,

    /// Where failed callbacks are sent
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Upper bound on the code exchange round-trip
    #[serde(default = "default_exchange_timeout")]
    pub exchange_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Recovery cookie, independent of the code
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Prefix of the per-code cookie
    #[serde(default = "default_code_cookie_prefix")]
    pub code_cookie_prefix: String,

    /// Local storage key written when the link is requested
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookieConfig {
    #[serde(default = "default_access_cookie")]
    pub access_cookie: String,

    #[serde(default = "default_refresh_cookie")]
    pub refresh_cookie: String,

    /// Short-lived, script-readable cookie with the signed-in address
    #[serde(default = "default_email_cookie")]
    pub email_cookie: String,

    /// Access cookie lifetime when the provider reports no expiry
    #[serde(default = "default_access_max_age")]
    pub access_max_age_secs: u64,

    #[serde(default = "default_refresh_max_age")]
    pub refresh_max_age_secs: u64,

    #[serde(default = "default_email_max_age")]
    pub email_max_age_secs: u64,
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_callback_path() -> String {
    "/auth/callback".to_string()
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_success_path() -> String {
    "/".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_exchange_timeout() -> u64 {
    5
}

fn default_cookie_name() -> String {
    "scope_pkce_verifier".to_string()
}

fn default_code_cookie_prefix() -> String {
    "code_verifier_".to_string()
}

fn default_storage_key() -> String {
    "scope.auth.pkce.code_verifier".to_string()
}

fn default_max_age() -> u64 {
    24 * 60 * 60
}

fn default_access_cookie() -> String {
    "scope_access_token".to_string()
}

fn default_refresh_cookie() -> String {
    "scope_refresh_token".to_string()
}

fn default_email_cookie() -> String {
    "verify_email".to_string()
}

fn default_access_max_age() -> u64 {
    60 * 60
}

fn default_refresh_max_age() -> u64 {
    30 * 24 * 60 * 60
}

fn default_email_max_age() -> u64 {
    15 * 60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_callback_path(),
            site_url: default_site_url(),
            success_path: default_success_path(),
            login_path: default_login_path(),
            exchange_timeout_secs: default_exchange_timeout(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            code_cookie_prefix: default_code_cookie_prefix(),
            storage_key: default_storage_key(),
            max_age_secs: default_max_age(),
        }
    }
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            access_cookie: default_access_cookie(),
            refresh_cookie: default_refresh_cookie(),
            email_cookie: default_email_cookie(),
            access_max_age_secs: default_access_max_age(),
            refresh_max_age_secs: default_refresh_max_age(),
            email_max_age_secs: default_email_max_age(),
        }
    }
}

impl CallbackConfig {
    /// Full URL the magic link should redirect to
    pub fn redirect_url(&self) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), self.path)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }

    /// Cookies get `Secure` when the site is served over https
    pub fn secure_cookies(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

impl VerifierConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Config {
    /// Apply `SCOPE_AUTH_URL`, `SCOPE_AUTH_ANON_KEY` and `SCOPE_SITE_URL`
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SCOPE_AUTH_URL") {
            if !url.is_empty() {
                tracing::debug!("Using SCOPE_AUTH_URL: {}", url);
                self.provider.url = url;
            }
        }
        if let Ok(key) = std::env::var("SCOPE_AUTH_ANON_KEY") {
            if !key.is_empty() {
                self.provider.anon_key = key;
            }
        }
        if let Ok(site) = std::env::var("SCOPE_SITE_URL") {
            if !site.is_empty() {
                self.callback.site_url = site;
            }
        }
    }

    /// Whether `email` belongs to an allowed domain
    pub fn allows_email_domain(&self, email: &str) -> bool {
        if self.allowed_email_domains.is_empty() {
            return true;
        }
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        self.allowed_email_domains
            .iter()
            .any(|allowed| allowed.trim_start_matches('@').eq_ignore_ascii_case(domain))
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scope")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from file, then apply environment overrides
pub fn load() -> Result<Config> {
    let path = config_path();

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config not found at {:?}. Run 'scope-auth init' first.",
            path
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let mut config: Config = serde_json::from_str(&content)?;
    config.apply_env();
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    let path = config_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

/// Interactive setup wizard
pub fn init() -> Result<()> {
    use crate::ui;
    use inquire::{Confirm, Text};

    ui::print_header("Setup");

    let mut config = Config::default();

    config.provider.url = Text::new("Auth service URL:")
        .with_help_message("e.g. https://<project>.supabase.co")
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    config.provider.anon_key = Text::new("Anon (public) API key:")
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    config.callback.site_url = Text::new("Public site URL:")
        .with_default(&default_site_url())
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    let restrict = Confirm::new("Restrict sign-in to specific email domains?")
        .with_default(false)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    if restrict {
        let domains = Text::new("Allowed domains (comma separated):")
            .prompt()
            .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
        config.allowed_email_domains = domains
            .split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
    }

    ui::print_thinking("Saving configuration");
    save(&config)?;

    ui::print_success(&format!("Configuration written to {:?}", config_path()));
    ui::print_step(&format!("Magic links will redirect to {}", config.callback.redirect_url()));

    Ok(())
}
