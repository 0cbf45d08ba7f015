//! Google OAuth for installed apps: consent in the browser, redirect to a
//! loopback callback server, PKCE code exchange.

use axum::{extract::Query, response::Html, routing::get, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

const OAUTH_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const OAUTH_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// How long to wait for the browser redirect.
const CALLBACK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors that can occur during Google sign-in
#[derive(Debug)]
pub enum OAuthError {
    /// I/O error (callback server, token file)
    Io(io::Error),
    /// HTTP request error
    Http(String),
    /// Google rejected the request
    Denied(String),
    /// The redirect carried a different state than we sent
    StateMismatch,
    /// Timeout waiting for callback
    Timeout,
    /// Token file could not be parsed or written
    Token(String),
}

impl std::fmt::Display for OAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OAuthError::Io(e) => write!(f, "I/O error: {}", e),
            OAuthError::Http(e) => write!(f, "HTTP error: {}", e),
            OAuthError::Denied(e) => write!(f, "Authorization denied: {}", e),
            OAuthError::StateMismatch => write!(f, "OAuth state mismatch, sign-in aborted"),
            OAuthError::Timeout => write!(f, "Timed out waiting for Google sign-in"),
            OAuthError::Token(e) => write!(f, "Token error: {}", e),
        }
    }
}

impl std::error::Error for OAuthError {}

impl From<io::Error> for OAuthError {
    fn from(e: io::Error) -> Self {
        OAuthError::Io(e)
    }
}

/// Token cached between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

impl StoredToken {
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now + EXPIRY_MARGIN_SECS
    }

    /// Returns `Ok(None)` if no token has been saved.
    pub fn load(path: &Path) -> Result<Option<Self>, OAuthError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| OAuthError::Token(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), OAuthError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| OAuthError::Token(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Query parameters Google appends to the redirect
#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
}

impl OAuthClient {
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret,
        }
    }

    /// Interactive sign-in. Prints the consent URL and waits for the
    /// browser to come back to the loopback server.
    pub async fn authorize(&self) -> Result<StoredToken, OAuthError> {
        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let local_port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/callback", local_port);

        let server_handle = tokio::spawn(async move {
            let app = Router::new().route(
                "/callback",
                get(move |Query(params): Query<CallbackParams>| {
                    let tx = tx.clone();
                    async move {
                        let taken = tx
                            .lock()
                            .unwrap_or_else(std::sync::PoisonError::into_inner)
                            .take();
                        if let Some(tx) = taken {
                            let _ = tx.send(params);
                        }

                        Html(
                            r#"<!DOCTYPE html>
<html>
<head><title>Fit Journal - Google Sheets</title></head>
<body>
<h1>Sign-in complete</h1>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#,
                        )
                    }
                }),
            );

            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("OAuth callback server stopped: {}", e);
            }
        });

        let state = random_string(32);
        let verifier = random_string(64);
        let auth_url = build_auth_url(
            &self.client_id,
            &redirect_uri,
            &state,
            &code_challenge(&verifier),
        );

        println!("Open this URL in your browser to connect Google Sheets:");
        println!();
        println!("  {}", auth_url);
        println!();
        println!("Waiting for sign-in (timeout: 5 minutes)...");

        let result = tokio::time::timeout(CALLBACK_TIMEOUT, rx).await;
        server_handle.abort();

        let params = match result {
            Ok(Ok(params)) => params,
            Ok(Err(_)) | Err(_) => return Err(OAuthError::Timeout),
        };
        if let Some(error) = params.error {
            return Err(OAuthError::Denied(error));
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(OAuthError::StateMismatch);
        }
        let code = params
            .code
            .ok_or_else(|| OAuthError::Denied("no authorization code returned".to_string()))?;

        self.exchange_code(&code, &verifier, &redirect_uri).await
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<StoredToken, OAuthError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let token = self.token_request(&form).await?;
        Ok(StoredToken {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: expires_at(token.expires_in),
        })
    }

    /// Exchanges a refresh token for a new access token. Google may omit
    /// the refresh token in the response, in which case the old one is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, OAuthError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let token = self.token_request(&form).await?;
        Ok(StoredToken {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expires_at(token.expires_in),
        })
    }

    pub async fn revoke(&self, token: &str) -> Result<(), OAuthError> {
        let response = self
            .http
            .post(OAUTH_REVOKE_URL)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| OAuthError::Http(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(OAuthError::Denied(format_oauth_error(status, &body)))
        }
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, OAuthError> {
        let response = self
            .http
            .post(OAUTH_TOKEN_URL)
            .form(form)
            .send()
            .await
            .map_err(|e| OAuthError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Denied(format_oauth_error(status, &body)));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::Http(e.to_string()))
    }
}

/// Consent screen URL for the Sheets scope with a PKCE S256 challenge.
pub fn build_auth_url(client_id: &str, redirect_uri: &str, state: &str, challenge: &str) -> String {
    let params = [
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", SHEETS_SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("state", state),
        ("code_challenge", challenge),
        ("code_challenge_method", "S256"),
    ];
    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    format!("{}?{}", OAUTH_AUTH_URL, query.join("&"))
}

/// PKCE S256 challenge for `verifier`.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn expires_at(expires_in: i64) -> i64 {
    (Utc::now() + Duration::seconds(expires_in)).timestamp()
}

fn format_oauth_error(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {}", status);
    }

    let summary = match serde_json::from_str::<TokenErrorResponse>(trimmed) {
        Ok(err) => match err.error_description {
            Some(desc) => format!("{} ({})", desc, err.error),
            None => err.error,
        },
        Err(_) => trimmed.replace(['\n', '\r'], " "),
    };
    format!("HTTP {}: {}", status, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_code_challenge_matches_rfc_7636() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_build_auth_url() {
        let url = build_auth_url(
            "client.apps.googleusercontent.com",
            "http://127.0.0.1:8123/callback",
            "state123",
            "challenge",
        );
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8123%2Fcallback"));
        assert!(url.contains(
            "scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fspreadsheets"
        ));
        assert!(url.contains("state=state123"));
        assert!(url.contains("code_challenge_method=S256"));
    }

    #[test]
    fn test_random_string() {
        let a = random_string(64);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_string(64));
    }

    #[test]
    fn test_token_freshness() {
        let token = StoredToken {
            access_token: "at".to_string(),
            refresh_token: None,
            expires_at: 1_000,
        };
        assert!(token.is_fresh(900));
        assert!(!token.is_fresh(950));
    }

    #[test]
    fn test_token_file_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested/sheets_token.json");
        assert_eq!(StoredToken::load(&path).unwrap(), None);

        let token = StoredToken {
            access_token: "ya29.token".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at: 1_700_000_000,
        };
        token.save(&path).unwrap();
        assert_eq!(StoredToken::load(&path).unwrap(), Some(token));
    }

    #[test]
    fn test_format_oauth_error() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert_eq!(
            format_oauth_error(
                status,
                r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#
            ),
            "HTTP 400 Bad Request: Token has been expired or revoked. (invalid_grant)"
        );
        assert_eq!(format_oauth_error(status, ""), "HTTP 400 Bad Request");
    }
}
