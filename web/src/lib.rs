//! Axum surface of the CMS auth gateway: two public OAuth endpoints, a
//! health probe, and the OpenAPI/RapiDoc documents.

use log::*;
use service::config::Config;

pub(crate) mod controller;
pub(crate) mod error;
pub mod router;

pub use error::{Error, Result};
pub use service::AppState;

pub async fn init_server(config: Config) -> std::io::Result<()> {
    let host = config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = config.port;

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    info!("Listening for connections on http://{host}:{port}");

    let app_state = AppState::new(config);
    axum::serve(listener, router::define_routes(app_state)).await
}
