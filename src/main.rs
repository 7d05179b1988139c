use log::*;
use service::config::Config;
use service::logging::Logger;

#[tokio::main]
async fn main() {
    let config = Config::new();

    Logger::init_logger(&config);

    info!(
        "Starting CMS auth gateway in {} mode",
        config.runtime_env()
    );

    if let Err(err) = web::init_server(config).await {
        error!("Server failed to start: {err}");
        std::process::exit(1);
    }
}
