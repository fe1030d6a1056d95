use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use arcana_core::tracing::init_tracing;
use arcana_session::config::SessionConfig;
use arcana_session::router::build_router;
use arcana_session::state::AppState;
use arcana_session::usecase::credential::CredentialIssuer;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = SessionConfig::from_env();
    info!(?config, "session service configuration loaded");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let state = AppState {
        db,
        redis,
        issuer: Arc::new(CredentialIssuer::new(config.credential_settings())),
        code_ttl: config.code_ttl(),
        quota_policy: config.quota_policy(),
        store_timeout: config.store_timeout(),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.session_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("session service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
