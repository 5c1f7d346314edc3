//! scope-auth CLI entry point

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scope_auth::auth::{
    self, locate_artifact, AuthProvider, BrowserLocalStore, CallbackHandler, CallbackServer, CallbackSettings,
    CookieStore, GoTrueProvider, RequestStores, ServerOptions, VerifierKeys,
};
use scope_auth::{config, ui};

#[derive(Parser)]
#[command(name = "scope-auth")]
#[command(about = "SCOPE magic-link sign-in and callback server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create ~/.scope/config.json interactively
    Init,

    /// Run the auth callback server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Email a magic sign-in link
    Login {
        /// Address to send the link to
        #[arg(short, long)]
        email: String,
    },

    /// Finish signing in from the URL the magic link redirected to
    Complete {
        /// Full callback URL, including any fragment
        url: String,
    },

    /// Show what a callback URL carries without contacting the auth service
    Inspect {
        /// Callback URL
        url: String,

        /// Raw Cookie header sent with the callback
        #[arg(long)]
        cookie: Option<String>,
    },

    /// Remove the stored session
    Logout,

    /// Show configuration and session state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            config::init()?;
            println!("\nNext steps:");
            println!("  1. Start the callback server: scope-auth serve");
            println!("  2. Request a link: scope-auth login --email you@example.com");
        }

        Commands::Serve { port } => {
            run_server(port).await?;
        }

        Commands::Login { email } => {
            run_login(&email).await?;
        }

        Commands::Complete { url } => {
            run_complete(&url).await?;
        }

        Commands::Inspect { url, cookie } => {
            run_inspect(&url, cookie.as_deref());
        }

        Commands::Logout => {
            auth::delete_session()?;
            ui::print_success("Logged out");
        }

        Commands::Status => {
            let config = config::load()?;
            ui::print_header("Status");
            ui::print_field(
                "Auth service",
                if config.provider.url.is_empty() { "not set" } else { config.provider.url.as_str() },
            );
            ui::print_field("Callback", &config.callback.redirect_url());
            ui::print_field(
                "Allowed domains",
                &if config.allowed_email_domains.is_empty() {
                    "any".to_string()
                } else {
                    config.allowed_email_domains.join(", ")
                },
            );

            match auth::load_session()? {
                Some(session) => {
                    ui::print_field("Signed in as", session.email().unwrap_or("unknown user"));
                    if let Some(expires_at) = session.expires_at {
                        ui::print_field("Expires", &expires_at.to_rfc3339());
                    }
                    if session.is_expired() {
                        ui::print_warning("Session has expired, run 'scope-auth login' again");
                    }
                }
                None => ui::print_field("Session", "not signed in"),
            }
        }
    }

    Ok(())
}

fn callback_handler(config: &config::Config) -> Result<CallbackHandler<GoTrueProvider>> {
    let provider = Arc::new(GoTrueProvider::from_config(&config.provider)?);
    Ok(CallbackHandler::new(provider, CallbackSettings::from(config)))
}

async fn run_server(port: Option<u16>) -> Result<()> {
    let config = config::load()?;

    let mut options = ServerOptions::from(&config);
    if let Some(port) = port {
        options.port = port;
    }

    ui::print_header("Callback server");
    ui::print_field(
        "Listening",
        &format!("http://{}:{}{}", options.host, options.port, options.callback_path),
    );
    ui::print_field("Public URL", &config.callback.redirect_url());
    ui::print_step("Press Ctrl+C to stop");

    let server = CallbackServer::new(callback_handler(&config)?, options);
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    ui::print_success("Server stopped");
    Ok(())
}

async fn run_login(email: &str) -> Result<()> {
    let config = config::load()?;
    let provider = GoTrueProvider::from_config(&config.provider)?;
    let storage = BrowserLocalStore::new(BrowserLocalStore::default_path());

    ui::print_thinking(&format!("Requesting a sign-in link for {}", email.trim()));

    match auth::request_magic_link(&provider, &config, email, &storage).await {
        Ok(()) => {
            ui::print_success("Sign-in link sent. Open it as soon as it arrives.");
            ui::print_step("If it opens in a browser without the server running, pass the final URL to:");
            println!("      scope-auth complete '<url>'");
            Ok(())
        }
        Err(e) => {
            ui::print_error(&format!("Could not send the link: {}", e));
            Err(e.into())
        }
    }
}

async fn run_complete(url: &str) -> Result<()> {
    let config = config::load()?;
    let handler = callback_handler(&config)?;
    let stores = RequestStores::browser(BrowserLocalStore::default_path());

    ui::print_thinking("Completing sign-in");
    let outcome = handler.handle(url, &stores).await;

    match (outcome.session, outcome.error) {
        (Some(session), _) => {
            auth::save_session(&session)?;
            ui::print_success(&format!("Signed in as {}", session.email().unwrap_or("unknown user")));
            ui::print_field("Session", &auth::session_path().display().to_string());
            Ok(())
        }
        (None, Some(error)) => {
            ui::print_error(&format!("[{}] {}", error.category().as_str(), error.user_message()));
            Err(error.into())
        }
        (None, None) => anyhow::bail!("Sign-in did not complete"),
    }
}

fn run_inspect(url: &str, cookie: Option<&str>) {
    // Works without a config file; defaults name the same cookies and keys
    let config = config::load().unwrap_or_default();
    let keys = VerifierKeys::from(&config.verifier);
    let cookies = CookieStore::from_request(cookie);
    let storage = BrowserLocalStore::new(BrowserLocalStore::default_path());

    let artifact = locate_artifact(url, &cookies, &storage, &keys);
    let state = CallbackHandler::<dyn AuthProvider>::classify(&artifact);

    let masked = |value: &Option<String>| value.as_deref().map(auth::preview).unwrap_or_else(|| "-".to_string());

    ui::print_header("Inspect");
    ui::print_field("Code", &masked(&artifact.code));
    ui::print_field("Verifier", &masked(&artifact.code_verifier));
    ui::print_field(
        "Verifier source",
        &artifact
            .verifier_source
            .as_ref()
            .map(|source| format!("{:?}", source))
            .unwrap_or_else(|| "-".to_string()),
    );
    ui::print_field("Access token", &masked(&artifact.token));
    ui::print_field("Refresh token", &masked(&artifact.refresh_token));
    if let Some(error) = &artifact.error {
        ui::print_field("Provider error", &error.error);
        if let Some(code) = &error.error_code {
            ui::print_field("Error code", code);
        }
        if let Some(description) = &error.description {
            ui::print_field("Description", description);
        }
    }
    ui::print_field("Next state", &format!("{:?}", state));
}
