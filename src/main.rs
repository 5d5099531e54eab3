use testimonial_pro::env::{AppConfig, load_environment};
use testimonial_pro::error::Error;
use testimonial_pro::telemetry::init_tracing;
use testimonial_pro::{connect_database, init_rocket, spawn_session_sweeper};
use tracing::warn;

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_error = load_environment().err().map(|e| e.to_string());

    let config = AppConfig::from_env();
    init_tracing(&config);

    if let Some(e) = env_error {
        warn!("Failed to load environment files: {}", e);
    }

    let pool = connect_database(&config.database_url).await?;
    spawn_session_sweeper(pool.clone());

    let _rocket = init_rocket(pool, config).launch().await?;

    Ok(())
}
