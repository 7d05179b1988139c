//! GitHub OAuth client.
//!
//! This module provides an HTTP client for the two provider-facing pieces of
//! the flow: building the authorize URL the popup is redirected to, and
//! exchanging the authorization code returned to the callback endpoint for an
//! access token.

use crate::error::{provider_error, DomainErrorKind, Error, ExternalErrorKind};
use log::*;
use serde::{Deserialize, Serialize};

/// OAuth scopes requested for the editor's token. Decap-style CMS admins need
/// repository contents and user identity.
pub const OAUTH_SCOPE: &str = "repo,user";

/// OAuth token response from GitHub
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

/// Request to exchange authorization code for a token
#[derive(Debug, Serialize)]
struct TokenExchangeRequest {
    client_id: String,
    client_secret: String,
    code: String,
    redirect_uri: String,
}

/// Configuration for GitHub OAuth URLs
#[derive(Debug, Clone)]
pub struct GithubOAuthUrls {
    pub authorize_url: String,
    pub token_url: String,
}

/// GitHub OAuth client for handling the editor sign-in flow
pub struct GithubOAuthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    urls: GithubOAuthUrls,
}

impl GithubOAuthClient {
    /// Create a new GitHub OAuth client with configurable URLs
    pub fn new(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        urls: GithubOAuthUrls,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            urls,
        })
    }

    /// Generate the OAuth authorization URL for user consent
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?\
            client_id={}&\
            redirect_uri={}&\
            scope={}&\
            state={}",
            self.urls.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPE),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The exchange is single-use: GitHub invalidates the code on first use,
    /// so a failure here is surfaced to the caller rather than retried. GitHub
    /// also reports exchange failures (e.g. `bad_verification_code`) inside a
    /// 200 body, so the response is inspected for an `error` field before the
    /// token is read.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let request = TokenExchangeRequest {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            code: code.to_string(),
            redirect_uri: self.redirect_uri.clone(),
        };

        debug!("Exchanging GitHub OAuth code for a token");

        let response = self
            .client
            .post(&self.urls.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to exchange GitHub OAuth code: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!("Failed to read GitHub token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Unreadable response from GitHub OAuth".to_string(),
                )),
            }
        })?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse GitHub token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Invalid response from GitHub OAuth".to_string(),
                )),
            }
        })?;

        if value.get("error").is_some() {
            warn!("GitHub OAuth error: {}", body);
            return Err(provider_error(body.trim()));
        }

        if !status.is_success() {
            warn!("GitHub OAuth returned status {}: {}", status, body);
            return Err(provider_error(body.trim()));
        }

        let tokens: TokenResponse = serde_json::from_value(value).map_err(|e| {
            warn!("GitHub token response missing access_token: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Invalid response from GitHub OAuth".to_string(),
                )),
            }
        })?;

        info!("Successfully exchanged GitHub OAuth code for a token");
        Ok(tokens)
    }
}
