use skillport::config::Config;
use skillport::db::{self, MemoryStore, PgStore, SubmissionStore};
use skillport::routes;
use skillport::state::AppState;
use std::sync::Arc;

/// Connects to Postgres and migrates; falls back to an in-memory store so the
/// API stays usable when the database is down.
async fn open_store(config: &Config) -> Arc<dyn SubmissionStore> {
    let pool = match db::create_pool(&config.database_url, config.db_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Database connection failed ({}), starting with in-memory storage", e);
            return Arc::new(MemoryStore::new());
        }
    };

    if let Err(e) = db::run_migrations(pool.as_ref()).await {
        tracing::warn!("Migrations failed ({}), starting with in-memory storage", e);
        return Arc::new(MemoryStore::new());
    }

    tracing::info!("Database connected");
    Arc::new(PgStore::new(pool))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillport=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    let store = open_store(&config).await;
    let state = Arc::new(AppState::new(store, config.clone()));

    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("SkillPort listening on http://{} ({})", addr, config.app_env);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
