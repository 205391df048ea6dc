//! Pulse Analytics Service - 分析服务入口

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tracing::info;

use analytics::api::routes::build_router;
use analytics::api::state::AppState;
use analytics::infrastructure::persistence::{
    PostgresMetricStore, PostgresNotificationRepository,
};
use analytics::scheduler::{spawn_alert_loop, ShutdownController};
use pulse_adapter_postgres::{check_connection, create_pool, PostgresConfig};
use pulse_config::AppConfig;
use pulse_telemetry::{init_metrics, init_tracing, init_tracing_json};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load("config")?;
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }
    let prometheus = init_metrics();

    info!(app = %config.app_name, env = %config.app_env, "Starting analytics service");

    let pool = create_pool(
        &PostgresConfig::new(config.database.url.expose_secret().as_str())
            .with_max_connections(config.database.max_connections),
    )
    .await?;
    check_connection(&pool).await?;

    let store = Arc::new(PostgresMetricStore::new(pool.clone()));
    let notifications = Arc::new(PostgresNotificationRepository::new(pool));
    let state = AppState::new(store, notifications, prometheus);

    let shutdown = ShutdownController::new();
    let alert_loop = spawn_alert_loop(
        state.evaluator.clone(),
        config.alerting.clone(),
        shutdown.clone(),
    );

    let app = build_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = server_shutdown.wait() => {}
            }
        })
        .await?;

    shutdown.shutdown();
    alert_loop.await?;
    info!("Analytics service stopped");
    Ok(())
}
