use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use factsheet_service::{
    api::{router, AppState},
    ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = ServiceConfig::from_env()?;
    let addr = config.bind_addr;
    info!(
        max_upload_bytes = config.max_upload_bytes,
        profile = ?config.default_profile,
        "loaded configuration"
    );

    let app = router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Factsheet Service starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
