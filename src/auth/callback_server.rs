//! Callback HTTP server
//!
//! A small HTTP/1.1 listener that serves the magic-link callback path.
//! Each connection carries one request and is handled on its own task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::orchestrator::{CallbackHandler, CallbackResponse};
use super::pages;
use super::provider::AuthProvider;
use super::storage::RequestStores;
use super::url_params::query_param;
use crate::config::Config;
use crate::error::Error;
use crate::Result;

/// Upper bound on request line plus headers
const MAX_REQUEST_BYTES: usize = 16 * 1024;

/// Time a client gets to send its request head
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Query parameters that mean the callback data already reached the server
const CALLBACK_SIGNALS: &[&str] = &["code", "error", "access_token"];

/// Listener settings
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub callback_path: String,
    pub site_url: String,
    pub secure_cookies: bool,
}

impl From<&Config> for ServerOptions {
    fn from(config: &Config) -> Self {
        Self {
            host: config.callback.host.clone(),
            port: config.callback.port,
            callback_path: config.callback.path.clone(),
            site_url: config.callback.site_url.trim_end_matches('/').to_string(),
            secure_cookies: config.callback.secure_cookies(),
        }
    }
}

/// Parsed request head
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestHead {
    method: String,
    target: String,
    cookie_header: Option<String>,
}

/// Response ready to be written
#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl HttpResponse {
    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "text/html; charset=utf-8".to_string())],
            body,
        }
    }

    fn redirect(location: String) -> Self {
        Self {
            status: 302,
            headers: vec![("Location", location)],
            body: String::new(),
        }
    }

    fn header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.body.len(),
            self.body
        ));
        out.into_bytes()
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

/// Serves the callback path with a shared [`CallbackHandler`]
pub struct CallbackServer<P: ?Sized> {
    handler: Arc<CallbackHandler<P>>,
    options: ServerOptions,
}

impl<P: AuthProvider + ?Sized + 'static> CallbackServer<P> {
    pub fn new(handler: CallbackHandler<P>, options: ServerOptions) -> Self {
        Self {
            handler: Arc::new(handler),
            options,
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = format!("{}:{}", self.options.host, self.options.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to start callback server on {}: {}", addr, e)))?;

        tracing::info!(
            "Callback server listening on http://{}{}",
            addr,
            self.options.callback_path
        );

        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Callback server shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        tracing::debug!("Connection from {}", peer);
                        let handler = self.handler.clone();
                        let options = self.options.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(socket, &handler, &options).await {
                                tracing::warn!("Connection from {} failed: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => tracing::warn!("Failed to accept connection: {}", e),
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection<P>(
    mut socket: TcpStream,
    handler: &CallbackHandler<P>,
    options: &ServerOptions,
) -> Result<()>
where
    P: AuthProvider + ?Sized,
{
    let raw = tokio::time::timeout(READ_TIMEOUT, read_request_head(&mut socket))
        .await
        .map_err(|_| Error::Timeout(READ_TIMEOUT))??;

    let response = match parse_request(&raw) {
        Ok(head) => respond(handler, options, &head).await,
        Err(e) => {
            tracing::warn!("Rejecting request: {}", e);
            HttpResponse::html(400, pages::error_page("Bad request", "The request could not be read.", "/"))
        }
    };

    socket.write_all(&response.to_bytes()).await?;
    let _ = socket.shutdown().await;
    Ok(())
}

async fn read_request_head(socket: &mut TcpStream) -> Result<String> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buffer.len() > MAX_REQUEST_BYTES {
            return Err(Error::Other(format!("Request head exceeds {} bytes", MAX_REQUEST_BYTES)));
        }
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Parse `GET /auth/callback?code=xxx HTTP/1.1` plus the `Cookie` header
fn parse_request(request: &str) -> Result<RequestHead> {
    let mut lines = request.split("\r\n");

    let first_line = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| Error::Other("Empty request".to_string()))?;

    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() != 3 || !parts[2].starts_with("HTTP/") {
        return Err(Error::Other(format!("Invalid request line: {:?}", first_line)));
    }
    if !parts[1].starts_with('/') {
        return Err(Error::Other("Only origin-form request targets are supported".to_string()));
    }

    let mut cookies: Vec<&str> = Vec::new();
    for line in lines.take_while(|line| !line.is_empty()) {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("cookie") {
                cookies.push(value.trim());
            }
        }
    }

    Ok(RequestHead {
        method: parts[0].to_string(),
        target: parts[1].to_string(),
        cookie_header: if cookies.is_empty() {
            None
        } else {
            Some(cookies.join("; "))
        },
    })
}

async fn respond<P>(handler: &CallbackHandler<P>, options: &ServerOptions, head: &RequestHead) -> HttpResponse
where
    P: AuthProvider + ?Sized,
{
    let path = head.target.split('?').next().unwrap_or_default();
    let on_callback_path = path == options.callback_path
        || path.trim_end_matches('/') == options.callback_path.trim_end_matches('/');

    if !on_callback_path {
        return HttpResponse::html(404, pages::error_page("Not found", "There is nothing here.", "/"));
    }

    if head.method != "GET" {
        return HttpResponse::html(
            405,
            pages::error_page("Method not allowed", "The sign-in callback only accepts GET.", "/"),
        )
        .header("Allow", "GET".to_string());
    }

    let url = format!("{}{}", options.site_url, head.target);

    if needs_fragment_relay(&url) {
        tracing::debug!("No callback data in query, serving fragment relay");
        return HttpResponse::html(200, pages::fragment_relay_page())
            .header("Cache-Control", "no-store".to_string())
            .header("Referrer-Policy", "no-referrer".to_string());
    }

    let stores = RequestStores::server(head.cookie_header.as_deref(), options.secure_cookies);
    let outcome = handler.handle(&url, &stores).await;

    let mut response = match outcome.response {
        CallbackResponse::Redirect { location } => HttpResponse::redirect(location),
        CallbackResponse::Page { status, html } => HttpResponse::html(status, html),
    };
    for cookie in stores.cookies.take_set_cookies() {
        response = response.header("Set-Cookie", cookie.to_string());
    }
    response
        .header("Cache-Control", "no-store".to_string())
        .header("Referrer-Policy", "no-referrer".to_string())
}

/// Fragments never reach the server; relay them unless the query already has data
fn needs_fragment_relay(url: &str) -> bool {
    query_param(url, "relayed").is_none()
        && CALLBACK_SIGNALS
            .iter()
            .all(|name| query_param(url, name).is_none())
}
