#[macro_use]
extern crate rocket;

pub mod analytics;
pub mod api;
pub mod auth;
pub mod cors;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use std::str::FromStr;

use rocket::{Build, Rocket, tokio};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info};

use crate::db::clean_expired_sessions;
use crate::env::AppConfig;
use crate::error::Error;
use crate::telemetry::TelemetryFairing;

const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Opens the pool (creating the database file if needed) and applies the
/// embedded migrations.
pub async fn connect_database(database_url: &str) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    Ok(pool)
}

/// Hourly removal of expired owner sessions. Admin sessions expire lazily on
/// verification instead.
pub fn spawn_session_sweeper(pool: SqlitePool) {
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS)).await;
        }
    });
}

pub fn init_rocket(pool: SqlitePool, config: AppConfig) -> Rocket<Build> {
    info!(environment = config.deployment_environment(), "Starting TestimonialPro");

    rocket::build()
        .manage(pool)
        .manage(config)
        .mount("/api", api::routes())
        .register("/api", api::catchers())
        .register("/", api::catchers())
        .attach(TelemetryFairing)
}
