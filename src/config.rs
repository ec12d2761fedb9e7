// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use url::Url;

/// A learner passes a unit once their best score reaches this percentage.
pub const PASSING_SCORE_PERCENTAGE: i64 = 60;

/// Upper bound on questions the generator may be asked for, per variant.
pub const MAX_GENERATED_PER_KIND: u32 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    /// Endpoint of the external open-ended grading service.
    pub grader_url: Option<Url>,
    /// Endpoint of the external assessment generation service.
    pub generator_url: Option<Url>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            cors_origins,
            grader_url: optional_url("GRADER_URL"),
            generator_url: optional_url("GENERATOR_URL"),
        }
    }

    /// Configuration used by tests: in-memory store, no collaborators.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cors_origins: Vec::new(),
            grader_url: None,
            generator_url: None,
        }
    }
}

fn optional_url(key: &str) -> Option<Url> {
    let raw = env::var(key).ok().filter(|v| !v.is_empty())?;
    match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Ignoring {}: not a valid URL ({})", key, e);
            None
        }
    }
}
