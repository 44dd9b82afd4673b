use anyhow::Context;
use disease_risk_api::advice::AdvisoryTable;
use disease_risk_api::app;
use disease_risk_api::config::Config;
use disease_risk_api::handlers::AppState;
use disease_risk_api::registry::ModelRegistry;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing and configuration, loads every model artifact (any
/// failure aborts startup before the port is bound), then serves the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "disease_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load all five classifiers; a partial registry never serves traffic
    let registry = ModelRegistry::load(&config.model_dir).with_context(|| {
        format!(
            "could not load models from {}",
            config.model_dir.display()
        )
    })?;
    tracing::info!("Model registry ready");

    let advice = AdvisoryTable::builtin();

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        registry,
        advice,
    });

    let app = app::router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "Server listening on {} (input mode: {})",
        addr,
        config.input_mode
    );

    axum::serve(listener, app).await?;

    Ok(())
}
