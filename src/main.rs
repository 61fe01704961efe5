mod assets;
mod code;
mod config;
mod error;
mod flow;
mod participants;
mod pdf;
mod routes;
mod state;
mod templates;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marathon_certificates=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    let font = match pdf::load_font(config.font_path.as_deref()) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!("Certificates cannot be generated until a font is available: {}", e);
            None
        }
    };

    let state = Arc::new(state::AppState::new(&config, font)?);
    tracing::info!("Participant API: {}", config.api_base_url);

    // Warm the background cache without holding up startup.
    let prefetch_state = state.clone();
    tokio::spawn(async move {
        prefetch_state.background.prefetch().await;
    });

    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Certificate desk listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
