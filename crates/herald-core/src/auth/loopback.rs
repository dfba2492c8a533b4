//! Loopback listener that catches the OAuth redirect for CLI logins.
//!
//! Blocking (tiny_http); async callers should run it on `spawn_blocking`.

use std::collections::HashMap;
use std::time::Duration;
use tiny_http::{Header, Response, Server};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{HeraldError, Result};
use crate::types::CallbackParams;

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Herald - Account Connected</title>
    <style>
        body { font-family: sans-serif; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; }
        .container { text-align: center; border: 1px solid #1d9bf0; padding: 40px; border-radius: 8px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>&#x2713; Authorization received</h1>
        <p>You can close this window and return to the terminal.</p>
    </div>
</body>
</html>
"#;

/// Bind address (`127.0.0.1:<port>`) and path for a loopback redirect URI
fn listen_target(redirect_uri: &str) -> Result<(String, String)> {
    let parsed = Url::parse(redirect_uri)
        .map_err(|e| HeraldError::Config(format!("Invalid redirect URI '{}': {}", redirect_uri, e)))?;

    match parsed.host_str() {
        Some("localhost") | Some("127.0.0.1") => {}
        _ => {
            return Err(HeraldError::Config(format!(
                "Redirect URI must point at localhost for CLI login: {}",
                redirect_uri
            )))
        }
    }

    let port = parsed.port_or_known_default().unwrap_or(80);
    Ok((format!("127.0.0.1:{}", port), parsed.path().to_string()))
}

/// Parse the query of a request line such as `/callback?code=..&state=..`
fn parse_callback(request_url: &str) -> Result<CallbackParams> {
    let full_url = format!("http://localhost{}", request_url);
    let parsed = Url::parse(&full_url)
        .map_err(|e| HeraldError::Validation(format!("Failed to parse callback URL: {}", e)))?;

    let mut params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
    Ok(CallbackParams {
        code: params.remove("code"),
        state: params.remove("state"),
        error: params.remove("error"),
        error_description: params.remove("error_description"),
    })
}

/// Start a local server and wait for the provider's redirect.
/// Blocks until a request hits the callback path or `timeout` passes.
pub fn wait_for_callback(redirect_uri: &str, timeout: Duration) -> Result<CallbackParams> {
    let (addr, callback_path) = listen_target(redirect_uri)?;
    let server = Server::http(&addr)
        .map_err(|e| HeraldError::Config(format!("Failed to start callback server on {}: {}", addr, e)))?;

    info!("Waiting for OAuth callback on {}{}", addr, callback_path);
    let deadline = std::time::Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        let request = server
            .recv_timeout(remaining)
            .map_err(|e| HeraldError::Config(format!("Callback server error: {}", e)))?
            .ok_or_else(|| HeraldError::Validation("Timed out waiting for OAuth callback".to_string()))?;

        let url = request.url().to_string();
        if !url.starts_with(&callback_path) {
            // Browsers also ask for /favicon.ico and the like
            debug!("Ignoring request to {}", url);
            let _ = request.respond(Response::empty(404));
            continue;
        }

        debug!("Received callback request");
        let mut response = Response::from_string(SUCCESS_PAGE);
        match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
            Ok(header) => response = response.with_header(header),
            Err(_) => warn!("Could not build Content-Type header"),
        }
        let _ = request.respond(response);

        return parse_callback(&url);
    }
}
