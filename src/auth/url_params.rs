//! Callback URL parameter extraction
//!
//! Auth redirects put their data either in the query string or in the
//! fragment. Mail scanners and webmail clients sometimes move it from one
//! to the other, so every lookup checks both: query first, fragment second.

use url::Url;

/// Look up `name` in the query string, then in the fragment.
///
/// Returns `None` for malformed URLs (logged, never propagated) and for
/// parameters that are present but empty.
pub fn extract_param(url: &str, name: &str) -> Option<String> {
    let parsed = parse_callback_url(url)?;
    query_value(&parsed, name).or_else(|| fragment_value(&parsed, name))
}

/// Look up `name` in the query string only.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = parse_callback_url(url)?;
    query_value(&parsed, name)
}

/// Look up `name` in the fragment only.
pub fn fragment_param(url: &str, name: &str) -> Option<String> {
    let parsed = parse_callback_url(url)?;
    fragment_value(&parsed, name)
}

fn parse_callback_url(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Ignoring malformed callback URL ({}): {}", e, super::preview(url));
            None
        }
    }
}

fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

fn fragment_value(url: &Url, name: &str) -> Option<String> {
    let fragment = url.fragment()?;

    // Only the first '#'-delimited segment is a parameter list
    let first = fragment.split('#').next().unwrap_or_default();
    if first.len() != fragment.len() {
        tracing::debug!("Fragment has extra '#' segments, ignoring everything after the first");
    }

    url::form_urlencoded::parse(first.as_bytes())
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}
