//! Controller for the GitHub OAuth popup flow.
//!
//! Both endpoints are driven by browser redirects in a popup window, so they
//! cannot rely on custom headers, and the callback communicates failures
//! in-page rather than through HTTP statuses — a popup showing a bare error
//! status would be a dead end for the editor.

use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_SECURITY_POLICY, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};

use domain::authorization;
use domain::handshake::page;
use serde::Deserialize;

/// Query parameters for the OAuth callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    /// Echoed by GitHub. Accepted but not verified against a stored value:
    /// the gateway keeps no per-request state between the two endpoints.
    #[allow(dead_code)]
    pub state: Option<String>,
}

/// GET /auth
///
/// Starts the sign-in flow by redirecting the popup to GitHub's authorize
/// endpoint.
#[utoipa::path(
    get,
    path = "/auth",
    responses(
        (status = 302, description = "Redirect to the GitHub authorize URL"),
        (status = 500, description = "Client ID or site origin not configured", body = String),
    )
)]
pub async fn authorize(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Error> {
    let site_url = site_url_from(&app_state, &headers);
    let url = authorization::github_authorize_url(&app_state.config, site_url.as_deref())?;

    Ok((StatusCode::FOUND, [(LOCATION, url)]))
}

/// GET /callback
///
/// Receives the authorization code from GitHub, exchanges it for a token and
/// renders the popup page that relays the outcome to the admin window.
#[utoipa::path(
    get,
    path = "/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from GitHub"),
        ("state" = Option<String>, Query, description = "Anti-forgery token echoed by GitHub"),
    ),
    responses(
        (status = 200, description = "Handoff page; success and failure are both communicated in-page", body = String),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let site_url = site_url_from(&app_state, &headers);
    let result = authorization::exchange_code(
        &app_state.config,
        site_url.as_deref(),
        params.code.as_deref(),
    )
    .await;

    (
        [(CONTENT_SECURITY_POLICY, page::CONTENT_SECURITY_POLICY)],
        Html(page::render(&result)),
    )
}

fn site_url_from(app_state: &AppState, headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    // Scheme defaults to http when no proxy header is present (direct local
    // serving); the host has no sane default.
    let proto = header("x-forwarded-proto").unwrap_or("http");
    let host = header("x-forwarded-host").or_else(|| header("host"));

    authorization::resolve_site_url(&app_state.config, Some(proto), host)
}
