use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use axum_table_editor::{DatabaseProvider, TableEditorLayer};
use serde_json::json;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

mod auth;
mod config;
mod database;
mod logging;

use auth::StaticTokenAuthenticator;
use config::ServerConfig;

/// Optional config file path, also read from this variable
const ENV_CONFIG: &str = "TABLE_EDITOR_CONFIG";

#[derive(Clone)]
enum ApplicationState {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl ApplicationState {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        match self {
            ApplicationState::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            ApplicationState::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        }
    }

    async fn close(&self) {
        match self {
            ApplicationState::Sqlite(pool) => pool.close().await,
            ApplicationState::Postgres(pool) => pool.close().await,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(ENV_CONFIG).ok())
        .map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())?;
    logging::init_logging(&config.logging)?;

    let (application_state, editor_router) = if config.database.is_postgres() {
        let pool = connect_postgres(&config).await?;
        let layer = TableEditorLayer::postgres(
            config.server.base_path.clone(),
            pool.clone(),
            config.database.schema.clone(),
        );
        (ApplicationState::Postgres(pool), build_editor_router(layer, &config))
    } else {
        let pool = connect_sqlite(&config).await?;
        if config.database.seed_sample_data {
            database::setup(&pool)
                .await
                .context("Failed to set up sample database")?;
        }
        let layer = TableEditorLayer::sqlite(config.server.base_path.clone(), pool.clone());
        (ApplicationState::Sqlite(pool), build_editor_router(layer, &config))
    };

    // The editor router is stateless and brings its own CORS layer, so it is
    // merged after with_state()
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .with_state(application_state.clone())
        .merge(editor_router);

    let address = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    tracing::info!(%address, "server running");
    tracing::info!(
        "table API available at http://{}{}/api/tables",
        address,
        config.server.base_path.trim_end_matches('/')
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    application_state.close().await;
    tracing::info!("database pool closed, bye");
    Ok(())
}

/// Apply the browser and auth settings to a layer
fn build_editor_router<DB: DatabaseProvider>(layer: TableEditorLayer<DB>, config: &ServerConfig) -> Router {
    let mut layer = layer
        .hidden_table_prefix(config.browser.hidden_prefix())
        .export_limit(config.browser.export_limit);

    if config.auth.is_enabled() {
        layer = layer.access_control(
            Arc::new(StaticTokenAuthenticator::new(&config.auth.tokens)),
            config.auth.rules(),
        );
    }
    layer.into_router()
}

async fn connect_sqlite(config: &ServerConfig) -> anyhow::Result<SqlitePool> {
    let settings = &config.database;
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("Invalid SQLite url '{}'", settings.url))?
        .create_if_missing(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(Some(settings.idle_timeout()))
        .connect_with(options)
        .await
        .context("Failed to connect to SQLite database")?;

    tracing::info!(url = %settings.url, "connected to SQLite");
    Ok(pool)
}

async fn connect_postgres(config: &ServerConfig) -> anyhow::Result<PgPool> {
    let settings = &config.database;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(Some(settings.idle_timeout()))
        .connect(&settings.url)
        .await
        .context("Failed to connect to PostgreSQL database")?;

    tracing::info!(schema = %settings.schema, "connected to PostgreSQL");
    Ok(pool)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

async fn root_handler() -> &'static str {
    "Welcome to the axum-table-editor example server"
}

async fn health_handler(State(state): State<ApplicationState>) -> impl IntoResponse {
    match state.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(error) => {
            tracing::warn!(%error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
