use anyhow::Context;
use flight_delay_api::{config::Config, routes, ModelBundle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "flight_delay_api=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let bundle = ModelBundle::load(&config.model_path)
        .with_context(|| format!("failed to load model bundle {}", config.model_path.display()))?;

    let model = bundle.model();
    tracing::info!(
        "loaded model from {}; trees={} leaves={} features={}",
        config.model_path.display(),
        model.num_trees(),
        model.num_leaves(),
        model.num_features()
    );
    for (field, n) in bundle.encoder().table_sizes() {
        tracing::info!("categories {}: {}", field, n);
    }

    let state = routes::AppState::new(bundle, &config);
    let app = routes::router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
