//! Authorization flow orchestration for the start and callback endpoints.
//!
//! The start side builds the GitHub authorize redirect; the callback side
//! runs the code-for-token exchange and folds every outcome into an
//! [`ExchangeResult`] for in-page rendering. Configuration is read per
//! invocation from the passed [`Config`]; there are no ambient globals.

use crate::error::{config_error, DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use crate::gateway::github_oauth::{GithubOAuthClient, GithubOAuthUrls};
use crate::handshake::message::ExchangeResult;
use log::*;
use rand::Rng;
use service::config::Config;

/// Path of the callback endpoint, appended to the site origin to form the
/// redirect URI registered with the OAuth App.
pub const CALLBACK_PATH: &str = "/callback";

/// Resolve the externally visible site origin for one request: the configured
/// `SITE_URL` wins, otherwise the origin is derived from the forwarding
/// headers set by the hosting proxy.
pub fn resolve_site_url(
    config: &Config,
    forwarded_proto: Option<&str>,
    forwarded_host: Option<&str>,
) -> Option<String> {
    config.site_url().or_else(|| {
        let proto = forwarded_proto?;
        let host = forwarded_host?;
        Some(format!("{proto}://{host}"))
    })
}

/// The exact redirect URI the OAuth App must be registered with.
pub fn callback_url(site_url: &str) -> String {
    format!("{}{}", site_url.trim_end_matches('/'), CALLBACK_PATH)
}

/// Generate the opaque anti-forgery `state` token: 128 bits, hex-encoded.
///
/// NOTE: the token is generated and sent to GitHub but not verified when the
/// provider echoes it back on the callback. Closing that loop would need the
/// value held across the redirect, and this gateway deliberately keeps no
/// server-side per-request state.
fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(random_bytes)
}

fn oauth_urls(config: &Config) -> GithubOAuthUrls {
    GithubOAuthUrls {
        authorize_url: config.github_authorize_url().to_string(),
        token_url: config.github_token_url().to_string(),
    }
}

/// Build the GitHub authorize URL for the start endpoint.
pub fn github_authorize_url(config: &Config, site_url: Option<&str>) -> Result<String, Error> {
    let client_id = config.github_client_id().ok_or_else(|| {
        config_error(
            "GITHUB_CLIENT_ID is not set. Configure the GitHub OAuth App client ID \
             in the environment serving this endpoint.",
        )
    })?;

    let site_url = site_url.ok_or_else(|| {
        config_error(
            "Site origin unavailable. Set SITE_URL, or serve this endpoint behind a \
             proxy that sets x-forwarded-proto and x-forwarded-host.",
        )
    })?;

    let redirect_uri = callback_url(site_url);
    // The secret plays no part in the authorize redirect.
    let client = GithubOAuthClient::new(&client_id, "", &redirect_uri, oauth_urls(config))?;
    let state = generate_state();

    info!("Redirecting editor sign-in to GitHub");
    Ok(client.authorization_url(&state))
}

/// Run the callback side of the flow.
///
/// Never fails at the HTTP level: preconditions are checked in order and
/// every outcome, including transport failures, becomes an [`ExchangeResult`]
/// the popup page can render. The exchange itself is never retried here — the
/// code is single-use, so recovery is a fresh authorization cycle started
/// from the admin window.
pub async fn exchange_code(
    config: &Config,
    site_url: Option<&str>,
    code: Option<&str>,
) -> ExchangeResult {
    let expected_callback = site_url
        .map(callback_url)
        .unwrap_or_else(|| format!("<site origin>{CALLBACK_PATH}"));

    let Some(code) = code else {
        warn!("GitHub callback arrived without an authorization code");
        return ExchangeResult::failure(
            "missing code",
            format!(
                "GitHub did not return an authorization code. Check that the OAuth App's \
                 callback URL is exactly {expected_callback}"
            ),
        );
    };

    let Some(client_id) = config.github_client_id() else {
        warn!("GitHub callback received but GITHUB_CLIENT_ID is not configured");
        return ExchangeResult::failure(
            "missing configuration",
            "GITHUB_CLIENT_ID is not visible to the runtime serving the callback. \
             Scope it to this environment, not only to the build.",
        );
    };

    let Some(client_secret) = config.github_client_secret() else {
        warn!("GitHub callback received but GITHUB_CLIENT_SECRET is not configured");
        return ExchangeResult::failure(
            "missing configuration",
            "GITHUB_CLIENT_SECRET is not visible to the runtime serving the callback. \
             Scope it to this environment, not only to the build.",
        );
    };

    let Some(site_url) = site_url else {
        return ExchangeResult::failure(
            "missing configuration",
            "Site origin unavailable. Set SITE_URL, or serve this endpoint behind a \
             proxy that sets x-forwarded-proto and x-forwarded-host.",
        );
    };

    let client = match GithubOAuthClient::new(
        &client_id,
        &client_secret,
        &callback_url(site_url),
        oauth_urls(config),
    ) {
        Ok(client) => client,
        Err(err) => return failure_from(err),
    };

    match client.exchange_code(code).await {
        Ok(tokens) => {
            info!("GitHub sign-in completed; handing the token to the popup");
            ExchangeResult::success(tokens.access_token)
        }
        Err(err) => failure_from(err),
    }
}

/// Fold a domain error into the failure shape the popup renders. The provider
/// detail rides along verbatim; everything downstream escapes it before it
/// touches markup.
fn failure_from(err: Error) -> ExchangeResult {
    let source_text = err
        .source
        .as_ref()
        .map(|source| source.to_string())
        .unwrap_or_default();

    match err.error_kind {
        DomainErrorKind::External(ExternalErrorKind::Network) => {
            ExchangeResult::failure("network error", source_text)
        }
        DomainErrorKind::External(ExternalErrorKind::Provider(raw)) => {
            ExchangeResult::failure("provider error", raw)
        }
        DomainErrorKind::External(ExternalErrorKind::Other(message)) => {
            ExchangeResult::failure("invalid provider response", message)
        }
        DomainErrorKind::Internal(InternalErrorKind::Config(message)) => {
            ExchangeResult::failure("missing configuration", message)
        }
        DomainErrorKind::Internal(InternalErrorKind::Other(message)) => {
            ExchangeResult::failure("internal error", message)
        }
    }
}
