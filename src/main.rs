// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use assessment_backend::{
    attempt::HttpOpenEndedGrader,
    config::Config,
    generation::HttpAssessmentGenerator,
    routes,
    state::AppState,
    store::{DynStore, MemoryStore, PgStore},
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DB_CONNECT_RETRIES: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: DynStore = match &config.database_url {
        Some(url) => {
            let pool = connect_with_retry(url).await?;
            tracing::info!("Database connected...");

            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations applied successfully.");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let mut state = AppState::new(store, config.clone());

    match &config.grader_url {
        Some(url) => {
            tracing::info!("Open-ended answers graded by {}", url);
            state = state.with_grader(Arc::new(HttpOpenEndedGrader::new(url.clone())?));
        }
        None => tracing::info!("No GRADER_URL, open-ended answers stay ungraded"),
    }

    match &config.generator_url {
        Some(url) => {
            tracing::info!("Assessments generated by {}", url);
            state = state.with_generator(Arc::new(HttpAssessmentGenerator::new(url.clone())?));
        }
        None => tracing::info!("No GENERATOR_URL, assessment generation disabled"),
    }

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn connect_with_retry(url: &str) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if retry_count < DB_CONNECT_RETRIES => {
                retry_count += 1;
                tracing::warn!(
                    "Database not ready ({}), retrying in 2s... (Attempt {})",
                    e,
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database after {} retries",
                    DB_CONNECT_RETRIES
                );
                return Err(e);
            }
        }
    }
}
