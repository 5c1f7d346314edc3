//! Self-contained HTML pages served by the callback endpoint

/// Shared page chrome; `{{TITLE}}`, `{{ACCENT}}` and `{{BODY}}` are filled in
const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>SCOPE | {{TITLE}}</title>
    <style>
        :root {
            --accent: {{ACCENT}};
            --text: #333;
            --info: #4299e1;
        }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            color: var(--text);
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }
        h1 {
            color: var(--accent);
            margin-top: 40px;
        }
        .error-box {
            background-color: #fff5f5;
            border-left: 4px solid var(--accent);
            padding: 16px;
            margin-bottom: 20px;
            border-radius: 4px;
        }
        .info-box {
            background-color: #ebf8ff;
            border-left: 4px solid var(--info);
            padding: 16px;
            margin-bottom: 20px;
            border-radius: 4px;
        }
        .debug-box {
            background-color: #f7fafc;
            border-left: 4px solid #a0aec0;
            padding: 16px;
            font-family: monospace;
            font-size: 14px;
            white-space: pre-wrap;
        }
        a.button {
            display: inline-block;
            background-color: var(--info);
            color: white;
            padding: 8px 16px;
            border-radius: 4px;
            text-decoration: none;
            margin-bottom: 20px;
        }
    </style>
</head>
<body>
{{BODY}}
</body>
</html>"#;

const MISSING_VERIFIER_BODY: &str = r#"    <h1>Sign-in could not be completed</h1>
    <div class="error-box">
        <p><strong>Error:</strong> the verification key for this sign-in link was not found. The link may have been opened or rewritten by your email provider's link scanner.</p>
    </div>
    <div class="info-box">
        <p><strong>What to do:</strong></p>
        <ol>
            <li>Request a new sign-in link.</li>
            <li>Open the link as soon as it arrives, in the same browser you requested it from.</li>
            <li>If your mail client scans or rewrites links, ask IT to exempt this site.</li>
        </ol>
    </div>
    <a class="button" href="{{RETRY_HREF}}">Request a new link</a>
    <div class="debug-box">Code: {{CODE}}
<span id="pkce-info"></span></div>
    <script>
        {{RELAY_FUNCTION}}
        (function () {
            // A verifier may still be waiting in the fragment of a rewritten link
            if (window.location.hash.length > 1 && relayFragment()) {
                return;
            }
            var el = document.getElementById('pkce-info');
            try {
                var stored = window.localStorage.getItem('{{STORAGE_KEY}}');
                el.textContent = 'Local verifier: ' + (stored ? stored.substring(0, 8) + '...' : 'none');
            } catch (e) {
                el.textContent = 'Local storage unavailable: ' + e.message;
            }
        })();
    </script>"#;

const ERROR_BODY: &str = r#"    <h1>{{TITLE}}</h1>
    <div class="error-box">
        <p>{{MESSAGE}}</p>
    </div>
    <a class="button" href="{{HOME_HREF}}">Back to SCOPE</a>"#;

/// Moves fragment parameters into the query so the server can see them.
/// Returns false once a request has already been relayed.
const RELAY_FUNCTION: &str = r#"function relayFragment() {
            var params = new URLSearchParams(window.location.search);
            if (params.has('relayed')) { return false; }
            var hash = window.location.hash.replace(/^#/, '').split('#')[0];
            new URLSearchParams(hash).forEach(function (value, key) {
                if (!params.has(key)) { params.set(key, value); }
            });
            params.set('relayed', '1');
            window.location.replace(window.location.pathname + '?' + params.toString());
            return true;
        }"#;

const FRAGMENT_RELAY_BODY: &str = r#"    <h1>Signing you in...</h1>
    <noscript><div class="error-box"><p>JavaScript is required to finish signing in.</p></div></noscript>
    <script>
        {{RELAY_FUNCTION}}
        relayFragment();
    </script>"#;

const RED: &str = "#e53e3e";
const BLUE: &str = "#4299e1";

fn layout(title: &str, accent: &str, body: &str) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{ACCENT}}", accent)
        .replace("{{BODY}}", body)
}

/// Diagnostic page for a code whose verifier could not be found
pub fn missing_verifier_page(code: &str, retry_href: &str, storage_key: &str) -> String {
    let body = MISSING_VERIFIER_BODY
        .replace("{{RETRY_HREF}}", &escape_html(retry_href))
        .replace("{{CODE}}", &escape_html(&super::preview(code)))
        .replace("{{STORAGE_KEY}}", &escape_js_string(storage_key))
        .replace("{{RELAY_FUNCTION}}", RELAY_FUNCTION);
    layout("Sign-in error", RED, &body)
}

/// Generic error page
pub fn error_page(title: &str, message: &str, home_href: &str) -> String {
    let body = ERROR_BODY
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{MESSAGE}}", &escape_html(message))
        .replace("{{HOME_HREF}}", &escape_html(home_href));
    layout(title, RED, &body)
}

/// Page that re-requests the callback with fragment parameters in the query
pub fn fragment_relay_page() -> String {
    layout(
        "Signing in",
        BLUE,
        &FRAGMENT_RELAY_BODY.replace("{{RELAY_FUNCTION}}", RELAY_FUNCTION),
    )
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_js_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "._-:".contains(*c))
        .collect()
}
