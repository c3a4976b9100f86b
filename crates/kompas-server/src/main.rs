mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use kompas_core::Geocoder;
use kompas_geocode::NominatimClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, reload_place_index, ApiSettings, AppState},
    middleware::AdminGate,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(kompas_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = kompas_db::PoolConfig::from_app_config(&config);
    let pool = kompas_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = kompas_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimClient::from_config(&config)?);
    let state = AppState::new(pool, geocoder, ApiSettings::from_app_config(&config));

    if let Err(e) = reload_place_index(&state).await {
        tracing::warn!(error = %e, "initial place index load failed; starting empty");
    }

    let _scheduler = scheduler::build_scheduler(state.clone(), &config.places_refresh_cron).await?;

    let app = build_app(state, AdminGate::from_app_config(&config));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "kompas-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
