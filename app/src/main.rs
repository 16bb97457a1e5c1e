use kit::{Config, Server};
use tracing_subscriber::EnvFilter;

mod config;
mod controllers;
mod routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let env = Config::init(std::path::Path::new("."));
    config::register_all();
    tracing::info!(environment = %env, "starting app");

    Server::from_config(routes::register()).run().await
}
