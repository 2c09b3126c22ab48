use axum::serve;
use form_post_rust::build_state;
use form_post_rust::config::AppConfig;
use form_post_rust::routes::create_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::{Builder, Env};
    use log::LevelFilter;

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("hyper", LevelFilter::Warn)
        .init();

    log::info!("Form post service starting");

    // Load configuration
    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}, max_property_length={}, extract_on_new_version={}",
        config.server.host,
        config.server.port,
        config.repository.max_property_length,
        config.extraction.extract_on_new_version
    );

    let app = create_router().with_state(build_state(&config));

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Form post service running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
