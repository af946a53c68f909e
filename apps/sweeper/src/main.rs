//! Clavis expiry sweeper runtime.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clavis_application::SweeperService;
use clavis_core::{AppError, AppResult};
use clavis_infrastructure::PostgresRbacRepository;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct SweeperConfig {
    database_url: String,
    sweep_interval_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SweeperConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to run migrations: {error}")))?;

    let sweeper = SweeperService::new(Arc::new(PostgresRbacRepository::new(pool)));

    info!(
        sweep_interval_seconds = config.sweep_interval_seconds,
        "clavis-sweeper started"
    );

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.sweep_interval_seconds));

    loop {
        interval.tick().await;

        match sweeper.sweep(Utc::now()).await {
            Ok(outcome) => {
                if outcome.total() > 0 {
                    info!(
                        assignments = outcome.assignments_deactivated,
                        grants = outcome.grants_deactivated,
                        "sweep pass finished"
                    );
                }
            }
            Err(error) => {
                warn!(error = %error, "sweep pass failed");
            }
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Storage(format!("failed to connect to database: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

impl SweeperConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let sweep_interval_seconds = parse_env_u64("SWEEP_INTERVAL_SECONDS", 60)?;

        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            sweep_interval_seconds,
        })
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
